use actix_web::{web, HttpResponse, Scope};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::{Listing, ListingRemoval};
use crate::error::AppError;
use crate::serializers::{ListingInput, WriteMode};
use crate::AppState;

async fn load(state: &AppState, id: Uuid) -> Result<Listing, AppError> {
    state
        .repo
        .get_listing(id)
        .await?
        .ok_or_else(|| AppError::not_found("Listing"))
}

#[utoipa::path(
    get,
    path = "/api/listings",
    operation_id = "list_listings",
    responses((status = 200, description = "All listings, newest first", body = [Listing])),
    tag = "listings"
)]
pub async fn list(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let listings = state.repo.list_listings().await?;
    Ok(HttpResponse::Ok().json(listings))
}

#[utoipa::path(
    get,
    path = "/api/listings/{id}",
    operation_id = "retrieve_listing",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "The listing", body = Listing),
        (status = 404, description = "Unknown listing")
    ),
    tag = "listings"
)]
pub async fn retrieve(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let listing = load(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(listing))
}

#[utoipa::path(
    post,
    path = "/api/listings",
    operation_id = "create_listing",
    request_body = ListingInput,
    responses(
        (status = 201, description = "Listing created", body = Listing),
        (status = 400, description = "Invalid listing"),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = [])),
    tag = "listings"
)]
pub async fn create(
    user: AuthUser,
    body: web::Json<ListingInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let listing = body.into_inner().into_new(user.id())?;
    let listing = state.repo.insert_listing(&listing).await?;
    info!("Listing {} created by {}", listing.listing_id, user.id());
    Ok(HttpResponse::Created().json(listing))
}

async fn write(
    user: AuthUser,
    id: Uuid,
    input: ListingInput,
    mode: WriteMode,
    state: &AppState,
) -> Result<HttpResponse, AppError> {
    let listing = load(state, id).await?;
    user.ensure_can_modify(listing.host_id)?;

    let listing = input.apply(listing, mode)?;
    let listing = state.repo.update_listing(&listing).await?;
    Ok(HttpResponse::Ok().json(listing))
}

#[utoipa::path(
    put,
    path = "/api/listings/{id}",
    operation_id = "update_listing",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body = ListingInput,
    responses(
        (status = 200, description = "Listing replaced", body = Listing),
        (status = 400, description = "Invalid listing"),
        (status = 403, description = "Not the host"),
        (status = 404, description = "Unknown listing")
    ),
    security(("bearer_auth" = [])),
    tag = "listings"
)]
pub async fn update(
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ListingInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    write(user, path.into_inner(), body.into_inner(), WriteMode::Replace, &state).await
}

#[utoipa::path(
    patch,
    path = "/api/listings/{id}",
    operation_id = "partial_update_listing",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body = ListingInput,
    responses(
        (status = 200, description = "Listing updated", body = Listing),
        (status = 400, description = "Invalid listing"),
        (status = 403, description = "Not the host"),
        (status = 404, description = "Unknown listing")
    ),
    security(("bearer_auth" = [])),
    tag = "listings"
)]
pub async fn partial_update(
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ListingInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    write(user, path.into_inner(), body.into_inner(), WriteMode::Partial, &state).await
}

/// Refuses with 409 while pending or confirmed bookings hold the listing.
#[utoipa::path(
    delete,
    path = "/api/listings/{id}",
    operation_id = "destroy_listing",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 403, description = "Not the host"),
        (status = 404, description = "Unknown listing"),
        (status = 409, description = "Listing has active bookings")
    ),
    security(("bearer_auth" = [])),
    tag = "listings"
)]
pub async fn destroy(
    user: AuthUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let listing = load(&state, path.into_inner()).await?;
    user.ensure_can_modify(listing.host_id)?;

    match state.repo.delete_listing_if_idle(listing.listing_id).await? {
        ListingRemoval::Deleted => {}
        ListingRemoval::Blocked { active_bookings } => {
            warn!(
                "Refusing to delete listing {} with {} active bookings",
                listing.listing_id, active_bookings
            );
            return Err(AppError::Conflict(format!(
                "Listing has {} active booking(s)",
                active_bookings
            )));
        }
        ListingRemoval::Missing => return Err(AppError::not_found("Listing")),
    }
    info!("Listing {} deleted by {}", listing.listing_id, user.id());
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes() -> Scope {
    web::scope("/listings")
        .route("", web::get().to(list))
        .route("", web::post().to(create))
        .route("/{id}", web::get().to(retrieve))
        .route("/{id}", web::put().to(update))
        .route("/{id}", web::patch().to(partial_update))
        .route("/{id}", web::delete().to(destroy))
}
