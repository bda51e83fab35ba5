use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{check_text, require, WriteMode};
use crate::db::models::MAX_AMOUNT;
use crate::db::Listing;
use crate::error::{AppError, FieldErrors};

const MAX_TITLE: usize = 255;
const MAX_LOCATION: usize = 255;
const PRICE_PLACES: u32 = 2;

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ListingInput {
    #[schema(example = "Seaside loft")]
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = "Mombasa, Kenya")]
    pub location: Option<String>,
    #[schema(example = 120.0)]
    pub price_per_night: Option<Decimal>,
}

struct Checked {
    title: Option<String>,
    description: Option<String>,
    location: Option<String>,
    price_per_night: Option<Decimal>,
}

impl ListingInput {
    fn check(&self, mode: WriteMode) -> Result<Checked, AppError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, mode, "title", &self.title);
        require(&mut errors, mode, "location", &self.location);
        require(&mut errors, mode, "price_per_night", &self.price_per_night);

        let title = check_text(&mut errors, "title", self.title.as_deref(), MAX_TITLE);
        let location = check_text(&mut errors, "location", self.location.as_deref(), MAX_LOCATION);

        if let Some(price) = self.price_per_night {
            if price <= Decimal::ZERO {
                errors.add("price_per_night", "Ensure this value is greater than 0.");
            } else if price.normalize().scale() > PRICE_PLACES {
                errors.add(
                    "price_per_night",
                    "Ensure that there are no more than 2 decimal places.",
                );
            } else if price > MAX_AMOUNT {
                errors.add(
                    "price_per_night",
                    "Ensure that there are no more than 10 digits in total.",
                );
            }
        }

        errors.into_result(Checked {
            title,
            description: self.description.as_ref().map(|d| d.trim().to_string()),
            location,
            price_per_night: self.price_per_night,
        })
    }

    /// Builds a new listing owned by `host_id`.
    pub fn into_new(self, host_id: Uuid) -> Result<Listing, AppError> {
        let checked = self.check(WriteMode::Create)?;
        let now = Utc::now();
        Ok(Listing {
            listing_id: Uuid::new_v4(),
            host_id,
            title: checked.title.unwrap_or_default(),
            description: checked.description.unwrap_or_default(),
            location: checked.location.unwrap_or_default(),
            price_per_night: checked.price_per_night.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a PUT (`Replace`) or PATCH (`Partial`) body to an existing listing.
    pub fn apply(self, mut listing: Listing, mode: WriteMode) -> Result<Listing, AppError> {
        let checked = self.check(mode)?;
        if let Some(title) = checked.title {
            listing.title = title;
        }
        match checked.description {
            Some(description) => listing.description = description,
            None if mode == WriteMode::Replace => listing.description = String::new(),
            None => {}
        }
        if let Some(location) = checked.location {
            listing.location = location;
        }
        if let Some(price) = checked.price_per_night {
            listing.price_per_night = price;
        }
        listing.updated_at = Utc::now();
        Ok(listing)
    }
}
