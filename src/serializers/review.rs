use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{require, WriteMode};
use crate::db::{Repository, Review};
use crate::error::{AppError, FieldErrors};

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ReviewInput {
    pub listing: Option<Uuid>,
    #[schema(minimum = 1, maximum = 5, example = 4)]
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

impl ReviewInput {
    async fn check(
        &self,
        repo: &dyn Repository,
        mode: WriteMode,
    ) -> Result<Option<i16>, AppError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, mode, "listing", &self.listing);
        require(&mut errors, mode, "rating", &self.rating);

        let rating = match self.rating {
            Some(r) if r < MIN_RATING as i64 => {
                errors.add(
                    "rating",
                    format!("Ensure this value is greater than or equal to {}.", MIN_RATING),
                );
                None
            }
            Some(r) if r > MAX_RATING as i64 => {
                errors.add(
                    "rating",
                    format!("Ensure this value is less than or equal to {}.", MAX_RATING),
                );
                None
            }
            Some(r) => Some(r as i16),
            None => None,
        };

        if let Some(listing_id) = self.listing {
            if repo.get_listing(listing_id).await?.is_none() {
                errors.add(
                    "listing",
                    format!("Invalid pk \"{}\" - object does not exist.", listing_id),
                );
            }
        }

        errors.into_result(rating)
    }

    pub async fn into_new(self, repo: &dyn Repository, user_id: Uuid) -> Result<Review, AppError> {
        let rating = self.check(repo, WriteMode::Create).await?;
        Ok(Review {
            review_id: Uuid::new_v4(),
            listing_id: self.listing.unwrap_or_default(),
            user_id,
            rating: rating.unwrap_or(MIN_RATING),
            comment: self.comment.map(|c| c.trim().to_string()).unwrap_or_default(),
            created_at: Utc::now(),
        })
    }

    pub async fn apply(
        self,
        repo: &dyn Repository,
        mut review: Review,
        mode: WriteMode,
    ) -> Result<Review, AppError> {
        let rating = self.check(repo, mode).await?;
        if let Some(listing_id) = self.listing {
            review.listing_id = listing_id;
        }
        if let Some(rating) = rating {
            review.rating = rating;
        }
        match self.comment {
            Some(comment) => review.comment = comment.trim().to_string(),
            None if mode == WriteMode::Replace => review.comment = String::new(),
            None => {}
        }
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Listing, MemoryStore, User};
    use rust_decimal::Decimal;

    async fn store_with_listing() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let user = store
            .create_user(&User::new("critic@example.com".into(), "hash".into(), None))
            .await
            .unwrap();
        let now = Utc::now();
        let listing = store
            .insert_listing(&Listing {
                listing_id: Uuid::new_v4(),
                host_id: user.id,
                title: "Hut".into(),
                description: String::new(),
                location: "Hills".into(),
                price_per_night: Decimal::from(30),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        (store, user.id, listing.listing_id)
    }

    fn input(listing: Uuid, rating: i64) -> ReviewInput {
        ReviewInput {
            listing: Some(listing),
            rating: Some(rating),
            comment: Some(" Lovely stay ".into()),
        }
    }

    #[tokio::test]
    async fn accepts_ratings_at_bounds() {
        let (store, user, listing) = store_with_listing().await;
        for rating in [1, 5] {
            let review = input(listing, rating).into_new(&store, user).await.unwrap();
            assert_eq!(review.rating, rating as i16);
            assert_eq!(review.comment, "Lovely stay");
        }
    }

    #[tokio::test]
    async fn rejects_ratings_out_of_range() {
        let (store, user, listing) = store_with_listing().await;
        for rating in [0, 6, -3, 100_000] {
            match input(listing, rating).into_new(&store, user).await {
                Err(AppError::ValidationError(errors)) => assert!(errors.contains("rating")),
                other => panic!("rating {} should fail, got {:?}", rating, other),
            }
        }
    }

    #[tokio::test]
    async fn patch_changes_only_comment() {
        let (store, user, listing) = store_with_listing().await;
        let review = input(listing, 4).into_new(&store, user).await.unwrap();
        let patch = ReviewInput {
            comment: Some("Updated".into()),
            ..Default::default()
        };
        let updated = patch.apply(&store, review, WriteMode::Partial).await.unwrap();
        assert_eq!(updated.rating, 4);
        assert_eq!(updated.comment, "Updated");
    }
}
