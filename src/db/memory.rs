use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{Booking, Listing, Payment, RecordCounts, Review, User, UserSession};
use crate::db::{DbResult, ListingRemoval, Repository};
use crate::error::DatabaseError;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, UserSession>,
    listings: HashMap<Uuid, Listing>,
    bookings: HashMap<Uuid, Booking>,
    reviews: HashMap<Uuid, Review>,
    payments: HashMap<Uuid, Payment>,
}

impl Tables {
    fn remove_booking(&mut self, id: Uuid) -> bool {
        self.payments.retain(|_, p| p.booking_id != id);
        self.bookings.remove(&id).is_some()
    }
}

/// In-process repository mirroring the Postgres constraints: unique emails
/// and tokens, foreign keys, and cascading deletes.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
    rows
}

#[async_trait]
impl Repository for MemoryStore {
    async fn create_user(&self, user: &User) -> DbResult<User> {
        let mut tables = self.tables.write().await;
        let email = user.email.to_lowercase();
        if tables
            .users
            .values()
            .any(|u| u.email.to_lowercase() == email || u.id == user.id)
        {
            return Err(DatabaseError::Duplicate);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn record_login(&self, id: Uuid) -> DbResult<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_session(&self, session: &UserSession) -> DbResult<UserSession> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&session.user_id) {
            return Err(DatabaseError::ForeignKey);
        }
        if tables.sessions.contains_key(&session.token) {
            return Err(DatabaseError::Duplicate);
        }
        tables.sessions.insert(session.token.clone(), session.clone());
        Ok(session.clone())
    }

    async fn get_session_by_token(&self, token: &str) -> DbResult<Option<UserSession>> {
        Ok(self.tables.read().await.sessions.get(token).cloned())
    }

    async fn update_session_activity(&self, token: &str) -> DbResult<()> {
        if let Some(session) = self.tables.write().await.sessions.get_mut(token) {
            session.last_activity = Utc::now();
        }
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> DbResult<()> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }

    async fn list_listings(&self) -> DbResult<Vec<Listing>> {
        let rows: Vec<Listing> = self.tables.read().await.listings.values().cloned().collect();
        Ok(newest_first(rows, |l| l.created_at))
    }

    async fn get_listing(&self, id: Uuid) -> DbResult<Option<Listing>> {
        Ok(self.tables.read().await.listings.get(&id).cloned())
    }

    async fn find_listing(&self, host_id: Uuid, title: &str) -> DbResult<Option<Listing>> {
        Ok(self
            .tables
            .read()
            .await
            .listings
            .values()
            .find(|l| l.host_id == host_id && l.title == title)
            .cloned())
    }

    async fn insert_listing(&self, listing: &Listing) -> DbResult<Listing> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&listing.host_id) {
            return Err(DatabaseError::ForeignKey);
        }
        if tables.listings.contains_key(&listing.listing_id) {
            return Err(DatabaseError::Duplicate);
        }
        tables.listings.insert(listing.listing_id, listing.clone());
        Ok(listing.clone())
    }

    async fn update_listing(&self, listing: &Listing) -> DbResult<Listing> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .listings
            .get_mut(&listing.listing_id)
            .ok_or(DatabaseError::NotFound)?;
        stored.title = listing.title.clone();
        stored.description = listing.description.clone();
        stored.location = listing.location.clone();
        stored.price_per_night = listing.price_per_night;
        stored.updated_at = listing.updated_at;
        Ok(stored.clone())
    }

    async fn delete_listing_if_idle(&self, id: Uuid) -> DbResult<ListingRemoval> {
        let mut tables = self.tables.write().await;
        if !tables.listings.contains_key(&id) {
            return Ok(ListingRemoval::Missing);
        }
        let active_bookings = tables
            .bookings
            .values()
            .filter(|b| b.listing_id == id && b.status.is_active())
            .count() as i64;
        if active_bookings > 0 {
            return Ok(ListingRemoval::Blocked { active_bookings });
        }

        tables.listings.remove(&id);
        let booking_ids: Vec<Uuid> = tables
            .bookings
            .values()
            .filter(|b| b.listing_id == id)
            .map(|b| b.booking_id)
            .collect();
        for booking_id in booking_ids {
            tables.remove_booking(booking_id);
        }
        tables.reviews.retain(|_, r| r.listing_id != id);
        Ok(ListingRemoval::Deleted)
    }

    async fn list_bookings(&self, user_id: Option<Uuid>) -> DbResult<Vec<Booking>> {
        let rows: Vec<Booking> = self
            .tables
            .read()
            .await
            .bookings
            .values()
            .filter(|b| user_id.map_or(true, |id| b.user_id == id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |b| b.created_at))
    }

    async fn get_booking(&self, id: Uuid) -> DbResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn find_booking(
        &self,
        listing_id: Uuid,
        user_id: Uuid,
        start_date: NaiveDate,
    ) -> DbResult<Option<Booking>> {
        Ok(self
            .tables
            .read()
            .await
            .bookings
            .values()
            .find(|b| b.listing_id == listing_id && b.user_id == user_id && b.start_date == start_date)
            .cloned())
    }

    async fn insert_booking(&self, booking: &Booking) -> DbResult<Booking> {
        let mut tables = self.tables.write().await;
        if !tables.listings.contains_key(&booking.listing_id)
            || !tables.users.contains_key(&booking.user_id)
        {
            return Err(DatabaseError::ForeignKey);
        }
        if booking.start_date >= booking.end_date {
            return Err(DatabaseError::QueryError(
                "violates check constraint \"bookings_date_range_check\"".into(),
            ));
        }
        tables.bookings.insert(booking.booking_id, booking.clone());
        Ok(booking.clone())
    }

    async fn update_booking(&self, booking: &Booking) -> DbResult<Booking> {
        let mut tables = self.tables.write().await;
        if !tables.listings.contains_key(&booking.listing_id) {
            return Err(DatabaseError::ForeignKey);
        }
        let stored = tables
            .bookings
            .get_mut(&booking.booking_id)
            .ok_or(DatabaseError::NotFound)?;
        stored.listing_id = booking.listing_id;
        stored.start_date = booking.start_date;
        stored.end_date = booking.end_date;
        stored.total_price = booking.total_price;
        stored.status = booking.status;
        Ok(stored.clone())
    }

    async fn delete_booking(&self, id: Uuid) -> DbResult<bool> {
        Ok(self.tables.write().await.remove_booking(id))
    }

    async fn list_reviews(&self, listing_id: Option<Uuid>) -> DbResult<Vec<Review>> {
        let rows: Vec<Review> = self
            .tables
            .read()
            .await
            .reviews
            .values()
            .filter(|r| listing_id.map_or(true, |id| r.listing_id == id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| r.created_at))
    }

    async fn get_review(&self, id: Uuid) -> DbResult<Option<Review>> {
        Ok(self.tables.read().await.reviews.get(&id).cloned())
    }

    async fn find_review(&self, listing_id: Uuid, user_id: Uuid) -> DbResult<Option<Review>> {
        Ok(self
            .tables
            .read()
            .await
            .reviews
            .values()
            .find(|r| r.listing_id == listing_id && r.user_id == user_id)
            .cloned())
    }

    async fn insert_review(&self, review: &Review) -> DbResult<Review> {
        let mut tables = self.tables.write().await;
        if !tables.listings.contains_key(&review.listing_id)
            || !tables.users.contains_key(&review.user_id)
        {
            return Err(DatabaseError::ForeignKey);
        }
        tables.reviews.insert(review.review_id, review.clone());
        Ok(review.clone())
    }

    async fn update_review(&self, review: &Review) -> DbResult<Review> {
        let mut tables = self.tables.write().await;
        if !tables.listings.contains_key(&review.listing_id) {
            return Err(DatabaseError::ForeignKey);
        }
        let stored = tables
            .reviews
            .get_mut(&review.review_id)
            .ok_or(DatabaseError::NotFound)?;
        stored.listing_id = review.listing_id;
        stored.rating = review.rating;
        stored.comment = review.comment.clone();
        Ok(stored.clone())
    }

    async fn delete_review(&self, id: Uuid) -> DbResult<bool> {
        Ok(self.tables.write().await.reviews.remove(&id).is_some())
    }

    async fn get_payment(&self, id: Uuid) -> DbResult<Option<Payment>> {
        Ok(self.tables.read().await.payments.get(&id).cloned())
    }

    async fn get_payment_by_booking(&self, booking_id: Uuid) -> DbResult<Option<Payment>> {
        Ok(self
            .tables
            .read()
            .await
            .payments
            .values()
            .find(|p| p.booking_id == booking_id)
            .cloned())
    }

    async fn insert_payment(&self, payment: &Payment) -> DbResult<Payment> {
        let mut tables = self.tables.write().await;
        if !tables.bookings.contains_key(&payment.booking_id) {
            return Err(DatabaseError::ForeignKey);
        }
        if tables
            .payments
            .values()
            .any(|p| p.booking_id == payment.booking_id)
        {
            return Err(DatabaseError::Duplicate);
        }
        tables.payments.insert(payment.payment_id, payment.clone());
        Ok(payment.clone())
    }

    async fn update_payment(&self, payment: &Payment) -> DbResult<Payment> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .payments
            .get_mut(&payment.payment_id)
            .ok_or(DatabaseError::NotFound)?;
        stored.amount = payment.amount;
        stored.transaction_id = payment.transaction_id.clone();
        stored.status = payment.status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn count_records(&self) -> DbResult<RecordCounts> {
        let tables = self.tables.read().await;
        Ok(RecordCounts {
            users: tables.users.len() as i64,
            listings: tables.listings.len() as i64,
            bookings: tables.bookings.len() as i64,
            reviews: tables.reviews.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BookingStatus;
    use rust_decimal::Decimal;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    async fn seeded() -> (MemoryStore, User, Listing) {
        let store = MemoryStore::new();
        let host = store
            .create_user(&User::new("host@example.com".into(), "hash".into(), None))
            .await
            .unwrap();
        let now = Utc::now();
        let listing = store
            .insert_listing(&Listing {
                listing_id: Uuid::new_v4(),
                host_id: host.id,
                title: "Cabin".into(),
                description: String::new(),
                location: "Lake".into(),
                price_per_night: Decimal::from(50),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        (store, host, listing)
    }

    fn booking(listing: &Listing, user: &User, status: BookingStatus) -> Booking {
        Booking {
            booking_id: Uuid::new_v4(),
            listing_id: listing.listing_id,
            user_id: user.id,
            start_date: date(1),
            end_date: date(3),
            total_price: Decimal::from(100),
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn emails_are_unique_case_insensitively() {
        let (store, _, _) = seeded().await;
        let result = store
            .create_user(&User::new("HOST@example.com".into(), "hash".into(), None))
            .await;
        assert!(matches!(result, Err(DatabaseError::Duplicate)));
    }

    #[tokio::test]
    async fn rejects_dangling_foreign_keys() {
        let (store, host, _) = seeded().await;
        let orphan = Listing {
            listing_id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            title: "Nowhere".into(),
            description: String::new(),
            location: "Void".into(),
            price_per_night: Decimal::ONE,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            store.insert_listing(&orphan).await,
            Err(DatabaseError::ForeignKey)
        ));
        assert!(matches!(
            store.insert_booking(&booking(&orphan, &host, BookingStatus::Pending)).await,
            Err(DatabaseError::ForeignKey)
        ));
    }

    #[tokio::test]
    async fn deleting_listing_cascades() {
        let (store, host, listing) = seeded().await;
        let canceled = store
            .insert_booking(&booking(&listing, &host, BookingStatus::Canceled))
            .await
            .unwrap();
        store
            .insert_payment(&Payment::new(canceled.booking_id, Decimal::from(100)))
            .await
            .unwrap();
        store
            .insert_review(&Review {
                review_id: Uuid::new_v4(),
                listing_id: listing.listing_id,
                user_id: host.id,
                rating: 4,
                comment: "Nice".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(
            store.delete_listing_if_idle(listing.listing_id).await.unwrap(),
            ListingRemoval::Deleted
        );
        assert_eq!(
            store.delete_listing_if_idle(listing.listing_id).await.unwrap(),
            ListingRemoval::Missing
        );

        let counts = store.count_records().await.unwrap();
        assert_eq!(counts.listings, 0);
        assert_eq!(counts.bookings, 0);
        assert_eq!(counts.reviews, 0);
        assert!(store
            .get_payment_by_booking(canceled.booking_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn one_payment_per_booking() {
        let (store, host, listing) = seeded().await;
        let b = store
            .insert_booking(&booking(&listing, &host, BookingStatus::Pending))
            .await
            .unwrap();
        store.insert_payment(&Payment::new(b.booking_id, Decimal::from(100))).await.unwrap();
        assert!(matches!(
            store.insert_payment(&Payment::new(b.booking_id, Decimal::from(100))).await,
            Err(DatabaseError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn active_booking_blocks_listing_delete() {
        let (store, host, listing) = seeded().await;
        let pending = store
            .insert_booking(&booking(&listing, &host, BookingStatus::Pending))
            .await
            .unwrap();

        assert_eq!(
            store.delete_listing_if_idle(listing.listing_id).await.unwrap(),
            ListingRemoval::Blocked { active_bookings: 1 }
        );
        assert!(store.get_listing(listing.listing_id).await.unwrap().is_some());
        assert!(store.get_booking(pending.booking_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_booking_survives_listing_delete() {
        for _ in 0..50 {
            let (store, host, listing) = seeded().await;
            let pending = booking(&listing, &host, BookingStatus::Pending);

            let (inserted, removal) = tokio::join!(
                store.insert_booking(&pending),
                store.delete_listing_if_idle(listing.listing_id)
            );
            match removal.unwrap() {
                ListingRemoval::Deleted => {
                    assert!(matches!(inserted, Err(DatabaseError::ForeignKey)));
                }
                ListingRemoval::Blocked { .. } => {
                    inserted.unwrap();
                    assert!(store.get_booking(pending.booking_id).await.unwrap().is_some());
                }
                ListingRemoval::Missing => panic!("listing vanished"),
            }
        }
    }

    #[tokio::test]
    async fn filters_bookings_by_user() {
        let (store, host, listing) = seeded().await;
        let guest = store
            .create_user(&User::new("guest@example.com".into(), "hash".into(), None))
            .await
            .unwrap();
        store
            .insert_booking(&booking(&listing, &host, BookingStatus::Pending))
            .await
            .unwrap();
        store
            .insert_booking(&booking(&listing, &guest, BookingStatus::Pending))
            .await
            .unwrap();

        assert_eq!(store.list_bookings(None).await.unwrap().len(), 2);
        let own = store.list_bookings(Some(guest.id)).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].user_id, guest.id);
    }
}
