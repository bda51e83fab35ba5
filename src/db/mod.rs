//! Database module
//!
//! Models, the `Repository` seam used by handlers, the worker and the
//! seeder, and its Postgres and in-memory implementations.

pub mod memory;
pub mod models;
pub mod operations;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::DatabaseError;

pub use memory::MemoryStore;
pub use models::{
    Booking, BookingStatus, Listing, Payment, PaymentStatus, RecordCounts, Review, User,
    UserSession,
};
pub use operations::DbOperations;

pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Result of [`Repository::delete_listing_if_idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingRemoval {
    Deleted,
    /// Pending or confirmed bookings still reference the listing.
    Blocked { active_bookings: i64 },
    Missing,
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_user(&self, user: &User) -> DbResult<User>;
    async fn get_user_by_id(&self, id: Uuid) -> DbResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>>;
    async fn record_login(&self, id: Uuid) -> DbResult<()>;

    async fn create_session(&self, session: &UserSession) -> DbResult<UserSession>;
    async fn get_session_by_token(&self, token: &str) -> DbResult<Option<UserSession>>;
    async fn update_session_activity(&self, token: &str) -> DbResult<()>;
    async fn delete_session(&self, token: &str) -> DbResult<()>;

    async fn list_listings(&self) -> DbResult<Vec<Listing>>;
    async fn get_listing(&self, id: Uuid) -> DbResult<Option<Listing>>;
    async fn find_listing(&self, host_id: Uuid, title: &str) -> DbResult<Option<Listing>>;
    async fn insert_listing(&self, listing: &Listing) -> DbResult<Listing>;
    async fn update_listing(&self, listing: &Listing) -> DbResult<Listing>;
    /// Deletes the listing unless it has active bookings. The check and the
    /// delete are one atomic step; cascades remove whatever remains.
    async fn delete_listing_if_idle(&self, id: Uuid) -> DbResult<ListingRemoval>;

    /// All bookings, or only those made by `user_id`.
    async fn list_bookings(&self, user_id: Option<Uuid>) -> DbResult<Vec<Booking>>;
    async fn get_booking(&self, id: Uuid) -> DbResult<Option<Booking>>;
    async fn find_booking(
        &self,
        listing_id: Uuid,
        user_id: Uuid,
        start_date: NaiveDate,
    ) -> DbResult<Option<Booking>>;
    async fn insert_booking(&self, booking: &Booking) -> DbResult<Booking>;
    async fn update_booking(&self, booking: &Booking) -> DbResult<Booking>;
    async fn delete_booking(&self, id: Uuid) -> DbResult<bool>;

    /// All reviews, or only those for `listing_id`.
    async fn list_reviews(&self, listing_id: Option<Uuid>) -> DbResult<Vec<Review>>;
    async fn get_review(&self, id: Uuid) -> DbResult<Option<Review>>;
    async fn find_review(&self, listing_id: Uuid, user_id: Uuid) -> DbResult<Option<Review>>;
    async fn insert_review(&self, review: &Review) -> DbResult<Review>;
    async fn update_review(&self, review: &Review) -> DbResult<Review>;
    async fn delete_review(&self, id: Uuid) -> DbResult<bool>;

    async fn get_payment(&self, id: Uuid) -> DbResult<Option<Payment>>;
    async fn get_payment_by_booking(&self, booking_id: Uuid) -> DbResult<Option<Payment>>;
    async fn insert_payment(&self, payment: &Payment) -> DbResult<Payment>;
    async fn update_payment(&self, payment: &Payment) -> DbResult<Payment>;

    async fn count_records(&self) -> DbResult<RecordCounts>;
}
