use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{bookings, listings, payments, reviews};
use crate::auth::handlers as auth;
use crate::db::{Booking, BookingStatus, Listing, Payment, PaymentStatus, Review};
use crate::serializers::{BookingInput, ListingInput, ReviewInput};

pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(title = "Travel Listings API", description = "Listings, bookings, reviews and payments"),
    paths(
        auth::register,
        auth::login,
        auth::logout,
        listings::list,
        listings::retrieve,
        listings::create,
        listings::update,
        listings::partial_update,
        listings::destroy,
        bookings::list,
        bookings::retrieve,
        bookings::create,
        bookings::update,
        bookings::partial_update,
        bookings::destroy,
        reviews::list,
        reviews::retrieve,
        reviews::create,
        reviews::update,
        reviews::partial_update,
        reviews::destroy,
        payments::initiate,
        payments::verify,
    ),
    components(schemas(
        Listing,
        Booking,
        BookingStatus,
        Review,
        Payment,
        PaymentStatus,
        ListingInput,
        BookingInput,
        ReviewInput,
        auth::LoginRequest,
        auth::RegisterRequest,
        auth::AuthResponse,
        payments::InitiatePaymentRequest,
        payments::InitiatePaymentResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and token sessions"),
        (name = "listings", description = "Properties available for booking"),
        (name = "bookings", description = "Reservations of listings"),
        (name = "reviews", description = "Ratings and comments on listings"),
        (name = "payments", description = "Chapa checkout and verification")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI under `/swagger/`, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger/{_:.*}").url(OPENAPI_PATH, ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/login",
            "/api/listings",
            "/api/listings/{id}",
            "/api/bookings/{id}",
            "/api/reviews",
            "/api/payments/verify",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn document_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
