//! REST resources mounted under `/api`.

pub mod bookings;
pub mod docs;
pub mod listings;
pub mod payments;
pub mod reviews;

use actix_web::{error::JsonPayloadError, web, HttpRequest};
use tracing::debug;

use crate::auth::handlers::{login, logout, register};
use crate::error::{AppError, FieldErrors};

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("Rejected request body: {}", err);
    AppError::ValidationError(FieldErrors::single(NON_FIELD_ERRORS, err.to_string())).into()
}

fn query_error(err: actix_web::error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::ValidationError(FieldErrors::single(NON_FIELD_ERRORS, err.to_string())).into()
}

/// Path segments are resource ids; anything that is not one names nothing.
fn path_error(err: actix_web::error::PathError, _req: &HttpRequest) -> actix_web::Error {
    debug!("Unparseable resource id: {}", err);
    AppError::not_found("Resource").into()
}

/// Registers the extractor error handlers and every `/api` route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(register))
                        .route("/login", web::post().to(login))
                        .route("/logout", web::post().to(logout)),
                )
                .service(listings::routes())
                .service(bookings::routes())
                .service(reviews::routes())
                .service(payments::routes()),
        );
}
