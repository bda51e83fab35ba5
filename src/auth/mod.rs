//! Authentication module
//!
//! Password hashing, JWT-backed sessions, the `AuthUser` request
//! extractor, and the register/login/logout handlers.

pub mod extractor;
pub mod handlers;
pub mod password;
mod service;

pub use extractor::AuthUser;
pub use service::{AuthService, Claims};
