//! Development data seeding.
//!
//! Every generated record has a natural key (user email, listing host and
//! title, booking listing/user/start date, review listing and user) that is
//! looked up before inserting, and all random choices come from a seeded RNG
//! that advances identically whether or not a record already existed. Running
//! the same plan twice therefore leaves the table counts unchanged.

use chrono::{Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::db::models::stay_price;
use crate::db::{Booking, BookingStatus, Listing, RecordCounts, Repository, Review, User};
use crate::error::AppError;

pub const DEFAULT_PASSWORD: &str = "password123";

const NAMES: &[&str] = &[
    "Amina Njoroge",
    "Brian Otieno",
    "Chloe Martin",
    "Dawit Bekele",
    "Elena Rossi",
    "Farah Haddad",
    "Gabriel Silva",
    "Hana Sato",
];
const ADJECTIVES: &[&str] = &["Cozy", "Sunny", "Quiet", "Spacious", "Rustic", "Modern"];
const KINDS: &[&str] = &["Cottage", "Loft", "Villa", "Cabin", "Apartment", "Bungalow"];
const LOCATIONS: &[&str] = &[
    "Nairobi, Kenya",
    "Addis Ababa, Ethiopia",
    "Lisbon, Portugal",
    "Kyoto, Japan",
    "Cape Town, South Africa",
    "Zanzibar, Tanzania",
];
const COMMENTS: &[&str] = &[
    "Lovely stay, would come back.",
    "Clean and close to everything.",
    "Host was very responsive.",
    "Smaller than the photos suggest.",
    "Great value for the price.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPlan {
    pub users: usize,
    pub listings: usize,
    pub bookings: usize,
    pub reviews: usize,
    pub seed: u64,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            users: 5,
            listings: 10,
            bookings: 10,
            reviews: 10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub created: RecordCounts,
    pub existing: RecordCounts,
    pub totals: RecordCounts,
}

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> Option<&'a T> {
    items.choose(rng)
}

fn first_of<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    pick(rng, items).copied().unwrap_or_default()
}

async fn seed_users(
    repo: &dyn Repository,
    plan: &SeedPlan,
    report: &mut SeedReport,
) -> Result<Vec<User>, AppError> {
    let mut users = Vec::with_capacity(plan.users);
    for i in 0..plan.users {
        let email = format!("user{}@example.com", i + 1);
        if let Some(user) = repo.get_user_by_email(&email).await? {
            report.existing.users += 1;
            users.push(user);
            continue;
        }

        let name = NAMES[i % NAMES.len()];
        let user = User::new(email, hash_password(DEFAULT_PASSWORD)?, Some(name.to_string()));
        users.push(repo.create_user(&user).await?);
        report.created.users += 1;
    }
    Ok(users)
}

async fn seed_listings(
    repo: &dyn Repository,
    rng: &mut StdRng,
    plan: &SeedPlan,
    users: &[User],
    report: &mut SeedReport,
) -> Result<Vec<Listing>, AppError> {
    let mut listings = Vec::with_capacity(plan.listings);
    for i in 0..plan.listings {
        let Some(host) = pick(rng, users) else {
            break;
        };
        let title = format!(
            "{} {} #{}",
            first_of(rng, ADJECTIVES),
            first_of(rng, KINDS),
            i + 1
        );
        let location = first_of(rng, LOCATIONS);
        let price = Decimal::from(rng.gen_range(30..=400u32));

        if let Some(listing) = repo.find_listing(host.id, &title).await? {
            report.existing.listings += 1;
            listings.push(listing);
            continue;
        }

        let now = Utc::now();
        let listing = Listing {
            listing_id: Uuid::new_v4(),
            host_id: host.id,
            description: format!("A {} stay in {}.", title.to_lowercase(), location),
            title,
            location: location.to_string(),
            price_per_night: price,
            created_at: now,
            updated_at: now,
        };
        listings.push(repo.insert_listing(&listing).await?);
        report.created.listings += 1;
    }
    Ok(listings)
}

async fn seed_bookings(
    repo: &dyn Repository,
    rng: &mut StdRng,
    plan: &SeedPlan,
    users: &[User],
    listings: &[Listing],
    report: &mut SeedReport,
) -> Result<(), AppError> {
    let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
    for _ in 0..plan.bookings {
        let (Some(listing), Some(guest)) = (pick(rng, listings), pick(rng, users)) else {
            break;
        };
        let start_date = base + Duration::days(rng.gen_range(0..180));
        let end_date = start_date + Duration::days(rng.gen_range(1..=7));
        let status = if rng.gen_bool(0.5) {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        };

        if repo
            .find_booking(listing.listing_id, guest.id, start_date)
            .await?
            .is_some()
        {
            report.existing.bookings += 1;
            continue;
        }

        let booking = Booking {
            booking_id: Uuid::new_v4(),
            listing_id: listing.listing_id,
            user_id: guest.id,
            start_date,
            end_date,
            total_price: stay_price(listing.price_per_night, start_date, end_date),
            status,
            created_at: Utc::now(),
        };
        repo.insert_booking(&booking).await?;
        report.created.bookings += 1;
    }
    Ok(())
}

async fn seed_reviews(
    repo: &dyn Repository,
    rng: &mut StdRng,
    plan: &SeedPlan,
    users: &[User],
    listings: &[Listing],
    report: &mut SeedReport,
) -> Result<(), AppError> {
    for _ in 0..plan.reviews {
        let (Some(listing), Some(author)) = (pick(rng, listings), pick(rng, users)) else {
            break;
        };
        let rating: i16 = rng.gen_range(1..=5);
        let comment = first_of(rng, COMMENTS);

        if repo
            .find_review(listing.listing_id, author.id)
            .await?
            .is_some()
        {
            report.existing.reviews += 1;
            continue;
        }

        let review = Review {
            review_id: Uuid::new_v4(),
            listing_id: listing.listing_id,
            user_id: author.id,
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        };
        repo.insert_review(&review).await?;
        report.created.reviews += 1;
    }
    Ok(())
}

/// Populates the store according to `plan`. Does not queue notifications.
pub async fn run(repo: &dyn Repository, plan: &SeedPlan) -> Result<SeedReport, AppError> {
    info!("Seeding with {:?}", plan);
    let mut rng = StdRng::seed_from_u64(plan.seed);
    let mut report = SeedReport::default();

    let users = seed_users(repo, plan, &mut report).await?;
    let listings = seed_listings(repo, &mut rng, plan, &users, &mut report).await?;
    seed_bookings(repo, &mut rng, plan, &users, &listings, &mut report).await?;
    seed_reviews(repo, &mut rng, plan, &users, &listings, &mut report).await?;

    report.totals = repo.count_records().await?;
    debug!("Seed report: {:?}", report);
    Ok(report)
}
