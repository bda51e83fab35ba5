use actix_web::{web, HttpResponse, Scope};
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::Booking;
use crate::error::AppError;
use crate::serializers::{BookingInput, WriteMode};
use crate::tasks::{enqueue, Task};
use crate::AppState;

/// Loads a booking the caller may see. Other users' bookings are reported as
/// missing rather than forbidden.
async fn load_visible(state: &AppState, user: &AuthUser, id: Uuid) -> Result<Booking, AppError> {
    match state.repo.get_booking(id).await? {
        Some(booking) if user.can_modify(booking.user_id) => Ok(booking),
        _ => Err(AppError::not_found("Booking")),
    }
}

/// Queues the confirmation email. Failures are logged and never reach the caller.
pub(crate) async fn notify_booking(state: &AppState, booking_id: Uuid) {
    match enqueue(state.queue.as_ref(), Task::SendBookingConfirmation { booking_id }).await {
        Ok(task_id) => info!("Queued confirmation {} for booking {}", task_id, booking_id),
        Err(e) => error!("Failed to queue confirmation for booking {}: {}", booking_id, e),
    }
}

#[utoipa::path(
    get,
    path = "/api/bookings",
    operation_id = "list_bookings",
    responses(
        (status = 200, description = "The caller's bookings (all bookings for staff)", body = [Booking]),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn list(user: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let owner = if user.user().is_staff {
        None
    } else {
        Some(user.id())
    };
    let bookings = state.repo.list_bookings(owner).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    operation_id = "retrieve_booking",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "The booking", body = Booking),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Unknown booking")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn retrieve(
    user: AuthUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let booking = load_visible(&state, &user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(booking))
}

#[utoipa::path(
    post,
    path = "/api/bookings",
    operation_id = "create_booking",
    request_body = BookingInput,
    responses(
        (status = 201, description = "Booking created and confirmation queued", body = Booking),
        (status = 400, description = "Invalid booking"),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn create(
    user: AuthUser,
    body: web::Json<BookingInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let booking = body
        .into_inner()
        .into_new(state.repo.as_ref(), user.id())
        .await?;
    let booking = state.repo.insert_booking(&booking).await?;
    info!(
        "Booking {} created for listing {} by {}",
        booking.booking_id, booking.listing_id, booking.user_id
    );

    notify_booking(&state, booking.booking_id).await;
    Ok(HttpResponse::Created().json(booking))
}

async fn write(
    user: AuthUser,
    id: Uuid,
    input: BookingInput,
    mode: WriteMode,
    state: &AppState,
) -> Result<HttpResponse, AppError> {
    let booking = load_visible(state, &user, id).await?;
    let booking = input
        .apply(state.repo.as_ref(), booking, mode, user.user().is_staff)
        .await?;
    let booking = state.repo.update_booking(&booking).await?;
    Ok(HttpResponse::Ok().json(booking))
}

#[utoipa::path(
    put,
    path = "/api/bookings/{id}",
    operation_id = "update_booking",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = BookingInput,
    responses(
        (status = 200, description = "Booking replaced", body = Booking),
        (status = 400, description = "Invalid booking"),
        (status = 404, description = "Unknown booking")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn update(
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<BookingInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    write(user, path.into_inner(), body.into_inner(), WriteMode::Replace, &state).await
}

#[utoipa::path(
    patch,
    path = "/api/bookings/{id}",
    operation_id = "partial_update_booking",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = BookingInput,
    responses(
        (status = 200, description = "Booking updated", body = Booking),
        (status = 400, description = "Invalid booking"),
        (status = 404, description = "Unknown booking")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn partial_update(
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<BookingInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    write(user, path.into_inner(), body.into_inner(), WriteMode::Partial, &state).await
}

#[utoipa::path(
    delete,
    path = "/api/bookings/{id}",
    operation_id = "destroy_booking",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 204, description = "Booking deleted"),
        (status = 404, description = "Unknown booking")
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn destroy(
    user: AuthUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let booking = load_visible(&state, &user, path.into_inner()).await?;
    if !state.repo.delete_booking(booking.booking_id).await? {
        return Err(AppError::not_found("Booking"));
    }
    info!("Booking {} deleted by {}", booking.booking_id, user.id());
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes() -> Scope {
    web::scope("/bookings")
        .route("", web::get().to(list))
        .route("", web::post().to(create))
        .route("/{id}", web::get().to(retrieve))
        .route("/{id}", web::put().to(update))
        .route("/{id}", web::patch().to(partial_update))
        .route("/{id}", web::delete().to(destroy))
}
