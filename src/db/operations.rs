use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{Booking, Listing, Payment, RecordCounts, Review, User, UserSession};
use crate::db::{DbResult, ListingRemoval, Repository};

const USER_COLUMNS: &str =
    "id, email, display_name, password_hash, is_staff, is_active, created_at, updated_at, last_login";
const SESSION_COLUMNS: &str = "id, user_id, token, expires_at, created_at, last_activity";
const LISTING_COLUMNS: &str =
    "listing_id, host_id, title, description, location, price_per_night, created_at, updated_at";
const BOOKING_COLUMNS: &str =
    "booking_id, listing_id, user_id, start_date, end_date, total_price, status, created_at";
const REVIEW_COLUMNS: &str = "review_id, listing_id, user_id, rating, comment, created_at";
const PAYMENT_COLUMNS: &str =
    "payment_id, booking_id, amount, transaction_id, status, created_at, updated_at";

/// Postgres-backed repository.
#[derive(Clone)]
pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await
    }

    pub fn get_pool_status(&self) -> DbPoolStatus {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;

        DbPoolStatus {
            total_connections: size,
            active_connections: size.saturating_sub(idle),
            idle_connections: idle,
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Repository for DbOperations {
    async fn create_user(&self, user: &User) -> DbResult<User> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(&user.password_hash)
            .bind(user.is_staff)
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(user.last_login)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn record_login(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create_session(&self, session: &UserSession) -> DbResult<UserSession> {
        let sql = format!(
            "INSERT INTO user_sessions ({SESSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SESSION_COLUMNS}"
        );
        let session = sqlx::query_as::<_, UserSession>(&sql)
            .bind(session.id)
            .bind(session.user_id)
            .bind(&session.token)
            .bind(session.expires_at)
            .bind(session.created_at)
            .bind(session.last_activity)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(session)
    }

    async fn get_session_by_token(&self, token: &str) -> DbResult<Option<UserSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM user_sessions WHERE token = $1");
        let session = sqlx::query_as::<_, UserSession>(&sql)
            .bind(token)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(session)
    }

    async fn update_session_activity(&self, token: &str) -> DbResult<()> {
        sqlx::query("UPDATE user_sessions SET last_activity = $1 WHERE token = $2")
            .bind(Utc::now())
            .bind(token)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn delete_session(&self, token: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM user_sessions WHERE token = $1")
            .bind(token)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn list_listings(&self) -> DbResult<Vec<Listing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at DESC");
        let listings = sqlx::query_as::<_, Listing>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(listings)
    }

    async fn get_listing(&self, id: Uuid) -> DbResult<Option<Listing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE listing_id = $1");
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(listing)
    }

    async fn find_listing(&self, host_id: Uuid, title: &str) -> DbResult<Option<Listing>> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE host_id = $1 AND title = $2 LIMIT 1"
        );
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(host_id)
            .bind(title)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(listing)
    }

    async fn insert_listing(&self, listing: &Listing) -> DbResult<Listing> {
        let sql = format!(
            "INSERT INTO listings ({LISTING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {LISTING_COLUMNS}"
        );
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(listing.listing_id)
            .bind(listing.host_id)
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(&listing.location)
            .bind(listing.price_per_night)
            .bind(listing.created_at)
            .bind(listing.updated_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(listing)
    }

    async fn update_listing(&self, listing: &Listing) -> DbResult<Listing> {
        let sql = format!(
            "UPDATE listings SET title = $2, description = $3, location = $4, price_per_night = $5, updated_at = $6 \
             WHERE listing_id = $1 RETURNING {LISTING_COLUMNS}"
        );
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(listing.listing_id)
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(&listing.location)
            .bind(listing.price_per_night)
            .bind(listing.updated_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(listing)
    }

    async fn delete_listing_if_idle(&self, id: Uuid) -> DbResult<ListingRemoval> {
        let mut tx = self.pool.begin().await?;

        // The row lock makes concurrent booking inserts wait on their
        // foreign-key check until this transaction ends.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT listing_id FROM listings WHERE listing_id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(ListingRemoval::Missing);
        }

        let active_bookings: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE listing_id = $1 AND status IN ('pending', 'confirmed')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if active_bookings > 0 {
            tx.rollback().await?;
            return Ok(ListingRemoval::Blocked { active_bookings });
        }

        sqlx::query("DELETE FROM listings WHERE listing_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("Deleted listing {}", id);
        Ok(ListingRemoval::Deleted)
    }

    async fn list_bookings(&self, user_id: Option<Uuid>) -> DbResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC"
        );
        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(user_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(bookings)
    }

    async fn get_booking(&self, id: Uuid) -> DbResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1");
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(booking)
    }

    async fn find_booking(
        &self,
        listing_id: Uuid,
        user_id: Uuid,
        start_date: NaiveDate,
    ) -> DbResult<Option<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE listing_id = $1 AND user_id = $2 AND start_date = $3 LIMIT 1"
        );
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(listing_id)
            .bind(user_id)
            .bind(start_date)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(booking)
    }

    async fn insert_booking(&self, booking: &Booking) -> DbResult<Booking> {
        let sql = format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {BOOKING_COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(booking.booking_id)
            .bind(booking.listing_id)
            .bind(booking.user_id)
            .bind(booking.start_date)
            .bind(booking.end_date)
            .bind(booking.total_price)
            .bind(booking.status)
            .bind(booking.created_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(booking)
    }

    async fn update_booking(&self, booking: &Booking) -> DbResult<Booking> {
        let sql = format!(
            "UPDATE bookings SET listing_id = $2, start_date = $3, end_date = $4, total_price = $5, status = $6 \
             WHERE booking_id = $1 RETURNING {BOOKING_COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(booking.booking_id)
            .bind(booking.listing_id)
            .bind(booking.start_date)
            .bind(booking.end_date)
            .bind(booking.total_price)
            .bind(booking.status)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(booking)
    }

    async fn delete_booking(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_reviews(&self, listing_id: Option<Uuid>) -> DbResult<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE ($1::uuid IS NULL OR listing_id = $1) ORDER BY created_at DESC"
        );
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(listing_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(reviews)
    }

    async fn get_review(&self, id: Uuid) -> DbResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE review_id = $1");
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(review)
    }

    async fn find_review(&self, listing_id: Uuid, user_id: Uuid) -> DbResult<Option<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE listing_id = $1 AND user_id = $2 LIMIT 1"
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(listing_id)
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(review)
    }

    async fn insert_review(&self, review: &Review) -> DbResult<Review> {
        let sql = format!(
            "INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {REVIEW_COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(review.review_id)
            .bind(review.listing_id)
            .bind(review.user_id)
            .bind(review.rating)
            .bind(&review.comment)
            .bind(review.created_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(review)
    }

    async fn update_review(&self, review: &Review) -> DbResult<Review> {
        let sql = format!(
            "UPDATE reviews SET listing_id = $2, rating = $3, comment = $4 WHERE review_id = $1 RETURNING {REVIEW_COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(review.review_id)
            .bind(review.listing_id)
            .bind(review.rating)
            .bind(&review.comment)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(review)
    }

    async fn delete_review(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE review_id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_payment(&self, id: Uuid) -> DbResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(payment)
    }

    async fn get_payment_by_booking(&self, booking_id: Uuid) -> DbResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(booking_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(payment)
    }

    async fn insert_payment(&self, payment: &Payment) -> DbResult<Payment> {
        let sql = format!(
            "INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PAYMENT_COLUMNS}"
        );
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment.payment_id)
            .bind(payment.booking_id)
            .bind(payment.amount)
            .bind(&payment.transaction_id)
            .bind(payment.status)
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(payment)
    }

    async fn update_payment(&self, payment: &Payment) -> DbResult<Payment> {
        let sql = format!(
            "UPDATE payments SET amount = $2, transaction_id = $3, status = $4, updated_at = $5 \
             WHERE payment_id = $1 RETURNING {PAYMENT_COLUMNS}"
        );
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment.payment_id)
            .bind(payment.amount)
            .bind(&payment.transaction_id)
            .bind(payment.status)
            .bind(Utc::now())
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(payment)
    }

    async fn count_records(&self) -> DbResult<RecordCounts> {
        let (users, listings, bookings, reviews): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM users), (SELECT COUNT(*) FROM listings), \
             (SELECT COUNT(*) FROM bookings), (SELECT COUNT(*) FROM reviews)",
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(RecordCounts {
            users,
            listings,
            bookings,
            reviews,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DbPoolStatus {
    pub total_connections: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
}
