//! Chapa payment gateway integration.

mod chapa;

pub use chapa::{ChapaClient, Checkout, CheckoutRequest};
