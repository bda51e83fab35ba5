use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{require, WriteMode};
use crate::db::models::{stay_price, MAX_AMOUNT};
use crate::db::{Booking, BookingStatus, Listing, Repository};
use crate::error::{AppError, FieldErrors};

pub const INVALID_RANGE: &str = "End date must be after start date.";
pub const STAFF_ONLY_STATUS: &str = "Only staff may set this status; bookings are confirmed by payment.";

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct BookingInput {
    pub listing: Option<Uuid>,
    #[schema(example = "2025-06-01")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2025-06-04")]
    pub end_date: Option<NaiveDate>,
    /// Ignored on create; new bookings always start as `pending`. Guests may
    /// only move their booking to `canceled`.
    pub status: Option<BookingStatus>,
}

/// Resolves the referenced listing, recording a field error when it does not exist.
async fn lookup_listing(
    repo: &dyn Repository,
    errors: &mut FieldErrors,
    id: Option<Uuid>,
) -> Result<Option<Listing>, AppError> {
    let Some(id) = id else {
        return Ok(None);
    };
    let listing = repo.get_listing(id).await?;
    if listing.is_none() {
        errors.add(
            "listing",
            format!("Invalid pk \"{}\" - object does not exist.", id),
        );
    }
    Ok(listing)
}

fn check_range(errors: &mut FieldErrors, start: Option<NaiveDate>, end: Option<NaiveDate>) {
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            errors.add("end_date", INVALID_RANGE);
        }
    }
}

fn price_stay(
    errors: &mut FieldErrors,
    listing: &Listing,
    start: NaiveDate,
    end: NaiveDate,
) -> Decimal {
    let total = stay_price(listing.price_per_night, start, end);
    if total > MAX_AMOUNT {
        errors.add(
            "end_date",
            "Stay is too long; the total price exceeds the largest payable amount.",
        );
    }
    total
}

impl BookingInput {
    /// Validates a reservation request and prices it against the listing.
    pub async fn into_new(self, repo: &dyn Repository, user_id: Uuid) -> Result<Booking, AppError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, WriteMode::Create, "listing", &self.listing);
        require(&mut errors, WriteMode::Create, "start_date", &self.start_date);
        require(&mut errors, WriteMode::Create, "end_date", &self.end_date);
        check_range(&mut errors, self.start_date, self.end_date);
        let listing = lookup_listing(repo, &mut errors, self.listing).await?;

        let (Some(listing), Some(start_date), Some(end_date)) =
            (listing, self.start_date, self.end_date)
        else {
            return Err(AppError::ValidationError(errors));
        };
        let total_price = price_stay(&mut errors, &listing, start_date, end_date);
        errors.into_result(Booking {
            booking_id: Uuid::new_v4(),
            listing_id: listing.listing_id,
            user_id,
            start_date,
            end_date,
            total_price,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Applies a PUT or PATCH body, re-pricing the stay when dates or listing change.
    pub async fn apply(
        self,
        repo: &dyn Repository,
        mut booking: Booking,
        mode: WriteMode,
        by_staff: bool,
    ) -> Result<Booking, AppError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, mode, "listing", &self.listing);
        require(&mut errors, mode, "start_date", &self.start_date);
        require(&mut errors, mode, "end_date", &self.end_date);
        if let Some(status) = self.status {
            let allowed = status == booking.status || status == BookingStatus::Canceled;
            if !by_staff && !allowed {
                errors.add("status", STAFF_ONLY_STATUS);
            }
        }

        let start_date = self.start_date.unwrap_or(booking.start_date);
        let end_date = self.end_date.unwrap_or(booking.end_date);
        check_range(&mut errors, Some(start_date), Some(end_date));

        let listing_id = self.listing.unwrap_or(booking.listing_id);
        let listing = lookup_listing(repo, &mut errors, Some(listing_id)).await?;

        let Some(listing) = listing else {
            return Err(AppError::ValidationError(errors));
        };
        let total_price = price_stay(&mut errors, &listing, start_date, end_date);
        if !errors.is_empty() {
            return Err(AppError::ValidationError(errors));
        }

        booking.listing_id = listing.listing_id;
        booking.start_date = start_date;
        booking.end_date = end_date;
        booking.total_price = total_price;
        if let Some(status) = self.status {
            booking.status = status;
        }
        Ok(booking)
    }
}
