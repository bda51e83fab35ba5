use actix_web::{web, HttpResponse, Scope};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api::bookings::notify_booking;
use crate::auth::AuthUser;
use crate::db::{BookingStatus, Payment, PaymentStatus};
use crate::error::{AppError, FieldErrors, PaymentError};
use crate::payments::CheckoutRequest;
use crate::serializers::REQUIRED;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    pub booking_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InitiatePaymentResponse {
    pub payment_id: Uuid,
    pub payment_link: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyParams {
    /// Chapa transaction id.
    pub transaction_id: Option<String>,
    /// Our payment id, echoed back by Chapa.
    pub tx_ref: Option<String>,
}

fn callback_url(state: &AppState) -> String {
    format!(
        "{}/api/payments/verify",
        state.config.server.public_url.trim_end_matches('/')
    )
}

#[utoipa::path(
    post,
    path = "/api/payments/initiate",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Checkout opened", body = InitiatePaymentResponse),
        (status = 400, description = "Missing booking or gateway failure"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Booking not found for caller"),
        (status = 500, description = "Gateway not configured")
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn initiate(
    user: AuthUser,
    body: web::Json<InitiatePaymentRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let booking_id = body
        .booking_id
        .ok_or_else(|| AppError::field("booking_id", REQUIRED))?;

    let booking = match state.repo.get_booking(booking_id).await? {
        Some(booking) if booking.user_id == user.id() => booking,
        _ => return Err(AppError::not_found("Booking")),
    };

    let mut payment = match state.repo.get_payment_by_booking(booking.booking_id).await? {
        Some(payment) => payment,
        None => {
            state
                .repo
                .insert_payment(&Payment::new(booking.booking_id, booking.total_price))
                .await?
        }
    };

    let guest = user.user();
    let checkout = state
        .payments
        .initialize(&CheckoutRequest {
            amount: format!("{:.2}", booking.total_price),
            currency: state.payments.currency().to_string(),
            email: guest.email.clone(),
            first_name: guest.first_name(),
            last_name: guest.last_name(),
            tx_ref: payment.payment_id.to_string(),
            callback_url: callback_url(&state),
        })
        .await?;

    payment.transaction_id = Some(checkout.transaction_id);
    payment.updated_at = Utc::now();
    let payment = state.repo.update_payment(&payment).await?;
    info!(
        "Payment {} initiated for booking {}",
        payment.payment_id, booking.booking_id
    );

    Ok(HttpResponse::Ok().json(InitiatePaymentResponse {
        payment_id: payment.payment_id,
        payment_link: checkout.checkout_url,
        status: payment.status,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payments/verify",
    params(VerifyParams),
    responses(
        (status = 200, description = "Payment verified and booking confirmed"),
        (status = 400, description = "Missing parameters or unsuccessful payment"),
        (status = 404, description = "Unknown payment")
    ),
    tag = "payments"
)]
pub async fn verify(
    params: web::Query<VerifyParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let params = params.into_inner();
    let mut missing = FieldErrors::new();
    if params.transaction_id.as_deref().unwrap_or("").is_empty() {
        missing.add("transaction_id", REQUIRED);
    }
    if params.tx_ref.as_deref().unwrap_or("").is_empty() {
        missing.add("tx_ref", REQUIRED);
    }
    let (transaction_id, tx_ref) = match (params.transaction_id, params.tx_ref) {
        (Some(transaction_id), Some(tx_ref)) if missing.is_empty() => (transaction_id, tx_ref),
        _ => return Err(AppError::ValidationError(missing)),
    };

    let payment_id = Uuid::parse_str(&tx_ref).map_err(|_| AppError::not_found("Payment"))?;
    let mut payment = state
        .repo
        .get_payment(payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    let outcome = match state.payments.verify(&transaction_id).await {
        Ok(status) if status == "successful" => Ok(()),
        Ok(status) => Err(PaymentError::Unsuccessful(status)),
        Err(PaymentError::NotConfigured) => return Err(PaymentError::NotConfigured.into()),
        Err(e) => Err(e),
    };

    payment.updated_at = Utc::now();
    if let Err(e) = outcome {
        warn!("Payment {} failed verification: {}", payment.payment_id, e);
        payment.status = PaymentStatus::Failed;
        state.repo.update_payment(&payment).await?;
        return Err(e.into());
    }

    payment.status = PaymentStatus::Completed;
    let payment = state.repo.update_payment(&payment).await?;

    if let Some(mut booking) = state.repo.get_booking(payment.booking_id).await? {
        booking.status = BookingStatus::Confirmed;
        state.repo.update_booking(&booking).await?;
        notify_booking(&state, booking.booking_id).await;
    }
    info!("Payment {} completed", payment.payment_id);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Payment verified and booking confirmed."
    })))
}

pub fn routes() -> Scope {
    web::scope("/payments")
        .route("/initiate", web::post().to(initiate))
        .route("/verify", web::get().to(verify))
}
