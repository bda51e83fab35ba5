use actix_web::{web, HttpResponse, Scope};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::Review;
use crate::error::AppError;
use crate::serializers::{ReviewInput, WriteMode};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewFilter {
    /// Only reviews of this listing.
    pub listing: Option<Uuid>,
}

async fn load(state: &AppState, id: Uuid) -> Result<Review, AppError> {
    state
        .repo
        .get_review(id)
        .await?
        .ok_or_else(|| AppError::not_found("Review"))
}

#[utoipa::path(
    get,
    path = "/api/reviews",
    operation_id = "list_reviews",
    params(ReviewFilter),
    responses((status = 200, description = "Reviews, newest first", body = [Review])),
    tag = "reviews"
)]
pub async fn list(
    filter: web::Query<ReviewFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let reviews = state.repo.list_reviews(filter.listing).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    operation_id = "retrieve_review",
    params(("id" = Uuid, Path, description = "Review id")),
    responses(
        (status = 200, description = "The review", body = Review),
        (status = 404, description = "Unknown review")
    ),
    tag = "reviews"
)]
pub async fn retrieve(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let review = load(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(review))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    operation_id = "create_review",
    request_body = ReviewInput,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 400, description = "Invalid review"),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn create(
    user: AuthUser,
    body: web::Json<ReviewInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let review = body
        .into_inner()
        .into_new(state.repo.as_ref(), user.id())
        .await?;
    let review = state.repo.insert_review(&review).await?;
    info!("Review {} posted on listing {}", review.review_id, review.listing_id);
    Ok(HttpResponse::Created().json(review))
}

async fn write(
    user: AuthUser,
    id: Uuid,
    input: ReviewInput,
    mode: WriteMode,
    state: &AppState,
) -> Result<HttpResponse, AppError> {
    let review = load(state, id).await?;
    user.ensure_can_modify(review.user_id)?;

    let review = input.apply(state.repo.as_ref(), review, mode).await?;
    let review = state.repo.update_review(&review).await?;
    Ok(HttpResponse::Ok().json(review))
}

#[utoipa::path(
    put,
    path = "/api/reviews/{id}",
    operation_id = "update_review",
    params(("id" = Uuid, Path, description = "Review id")),
    request_body = ReviewInput,
    responses(
        (status = 200, description = "Review replaced", body = Review),
        (status = 400, description = "Invalid review"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Unknown review")
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn update(
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ReviewInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    write(user, path.into_inner(), body.into_inner(), WriteMode::Replace, &state).await
}

#[utoipa::path(
    patch,
    path = "/api/reviews/{id}",
    operation_id = "partial_update_review",
    params(("id" = Uuid, Path, description = "Review id")),
    request_body = ReviewInput,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 400, description = "Invalid review"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Unknown review")
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn partial_update(
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ReviewInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    write(user, path.into_inner(), body.into_inner(), WriteMode::Partial, &state).await
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    operation_id = "destroy_review",
    params(("id" = Uuid, Path, description = "Review id")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Unknown review")
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn destroy(
    user: AuthUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let review = load(&state, path.into_inner()).await?;
    user.ensure_can_modify(review.user_id)?;

    if !state.repo.delete_review(review.review_id).await? {
        return Err(AppError::not_found("Review"));
    }
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes() -> Scope {
    web::scope("/reviews")
        .route("", web::get().to(list))
        .route("", web::post().to(create))
        .route("/{id}", web::get().to(retrieve))
        .route("/{id}", web::put().to(update))
        .route("/{id}", web::patch().to(partial_update))
        .route("/{id}", web::delete().to(destroy))
}
