use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(email: String, password_hash: String, display_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            display_name,
            password_hash,
            is_staff: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    /// First word of the display name, falling back to the mailbox part of the email.
    pub fn first_name(&self) -> String {
        self.display_name
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
            .map(str::to_string)
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or_default().to_string())
    }

    pub fn last_name(&self) -> String {
        self.display_name
            .as_deref()
            .map(|name| name.split_whitespace().skip(1).collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl UserSession {
    pub fn new(user_id: Uuid, token: String, expires_in_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            expires_at: now + chrono::Duration::hours(expires_in_hours),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// A property available for booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Listing {
    pub listing_id: Uuid,
    #[serde(rename = "host")]
    pub host_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price_per_night: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Canceled,
}

impl BookingStatus {
    /// Pending and confirmed bookings still hold the listing.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// A reservation of a listing by a user for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub booking_id: Uuid,
    #[serde(rename = "listing")]
    pub listing_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Largest amount a `NUMERIC(10,2)` money column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Price of a stay, rounded to cents.
pub fn stay_price(price_per_night: Decimal, start: NaiveDate, end: NaiveDate) -> Decimal {
    let nights = (end - start).num_days().max(0);
    (price_per_night * Decimal::from(nights)).round_dp(2)
}

/// A user-submitted rating and comment for a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Review {
    pub review_id: Uuid,
    #[serde(rename = "listing")]
    pub listing_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub payment_id: Uuid,
    #[serde(rename = "booking")]
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(booking_id: Uuid, amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            payment_id: Uuid::new_v4(),
            booking_id,
            amount,
            transaction_id: None,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Row counts per table, reported by the seeder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub users: i64,
    pub listings: i64,
    pub bookings: i64,
    pub reviews: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn stay_price_is_exact() {
        let price = Decimal::new(9999, 2);
        assert_eq!(
            stay_price(price, date(2025, 3, 1), date(2025, 3, 4)),
            Decimal::new(29997, 2)
        );
        // 0.1 and 0.2 are inexact as floats
        let price = Decimal::new(1, 1) + Decimal::new(2, 1);
        assert_eq!(
            stay_price(price, date(2025, 3, 1), date(2025, 3, 11)),
            Decimal::from(3)
        );
        assert_eq!(
            stay_price(Decimal::from(80), date(2025, 3, 1), date(2025, 3, 1)),
            Decimal::ZERO
        );
        assert_eq!(MAX_AMOUNT.to_string(), "99999999.99");
    }

    #[test]
    fn only_pending_and_confirmed_bookings_are_active() {
        assert!(BookingStatus::Pending.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(!BookingStatus::Canceled.is_active());
    }

    #[test]
    fn wire_names_use_relation_fields() {
        let booking = Booking {
            booking_id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 3),
            total_price: Decimal::from(200),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["listing"], booking.listing_id.to_string());
        assert_eq!(json["user"], booking.user_id.to_string());
        assert_eq!(json["start_date"], "2025-06-01");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["total_price"], 200.0);
        assert_eq!(booking.nights(), 2);
    }

    #[test]
    fn user_names_split_display_name() {
        let mut user = User::new("ada@example.com".into(), "hash".into(), Some("Ada King Lovelace".into()));
        assert_eq!(user.first_name(), "Ada");
        assert_eq!(user.last_name(), "King Lovelace");

        user.display_name = None;
        assert_eq!(user.first_name(), "ada");
        assert_eq!(user.last_name(), "");

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
