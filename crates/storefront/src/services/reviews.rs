//! Review rules on top of the review store.

use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use boxsub_core::{Rating, ReviewId, SubscriptionId, Timestamp};

use crate::models::CurrentUser;
use crate::reviews::{NewReview, Review, ReviewError, ReviewStore};
use crate::storage::{MembershipList, StorageError};

/// Why a review was not written or deleted.
#[derive(Debug, Error)]
pub enum ReviewRejection {
    #[error("account has no email address")]
    NoEmail,

    #[error("not subscribed to this box")]
    NotSubscribed,

    #[error("review text is empty")]
    EmptyText,

    #[error("review belongs to another user")]
    NotOwner,

    #[error("review not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] ReviewError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ReviewRejection {
    /// Notification text for a rejected submission.
    #[must_use]
    pub fn submit_message(&self) -> &'static str {
        match self {
            Self::NoEmail => "Your account has no email address",
            Self::NotSubscribed => "You must be subscribed to this box to leave a review",
            Self::EmptyText => "Please enter a review",
            Self::NotOwner => "You can only delete your own reviews",
            Self::NotFound | Self::Store(_) | Self::Storage(_) => {
                "Failed to submit review. Please try again."
            }
        }
    }

    /// Notification text for a rejected deletion.
    #[must_use]
    pub fn delete_message(&self) -> &'static str {
        match self {
            Self::NotOwner => "You can only delete your own reviews",
            _ => "Failed to delete review. Please try again.",
        }
    }
}

/// Lists, submits and deletes reviews.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn ReviewStore>,
    subscriptions: MembershipList,
}

impl ReviewService {
    #[must_use]
    pub fn new(store: Arc<dyn ReviewStore>, subscriptions: MembershipList) -> Self {
        Self {
            store,
            subscriptions,
        }
    }

    /// Reviews for a subscription, newest first.
    ///
    /// A store failure is logged and yields an empty list.
    #[instrument(skip(self))]
    pub async fn list(&self, subscription_id: SubscriptionId) -> Vec<Review> {
        match self.store.list_for_subscription(subscription_id).await {
            Ok(mut reviews) => {
                sort_newest_first(&mut reviews);
                reviews
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load reviews");
                Vec::new()
            }
        }
    }

    /// Write a review by `user` for a box they are subscribed to.
    ///
    /// # Errors
    ///
    /// Returns `ReviewRejection` if the user has no email, is not subscribed,
    /// left the text blank, or a store call fails.
    #[instrument(skip(self, user, id_token, text), fields(uid = %user.uid))]
    pub async fn submit(
        &self,
        user: &CurrentUser,
        id_token: &SecretString,
        subscription_id: SubscriptionId,
        text: &str,
        rating: Rating,
    ) -> Result<ReviewId, ReviewRejection> {
        let email = user.email.as_ref().ok_or(ReviewRejection::NoEmail)?;
        if !self.subscriptions.contains(email, subscription_id).await? {
            return Err(ReviewRejection::NotSubscribed);
        }
        if text.trim().is_empty() {
            return Err(ReviewRejection::EmptyText);
        }

        let review = NewReview {
            subscription_id,
            user_id: user.uid.clone(),
            user_name: user.name_or_email(),
            user_email: email.to_string(),
            user_photo: user.avatar_url(),
            rating,
            review: text.to_string(),
            created_at: Timestamp::now(),
        };
        let id = self.store.add(&review, id_token).await?;
        tracing::info!(review_id = %id, "Review submitted");
        Ok(id)
    }

    /// Delete a review written by `user`.
    ///
    /// # Errors
    ///
    /// Returns `ReviewRejection::NotOwner` if someone else wrote it, or a
    /// store error.
    #[instrument(skip(self, user, id_token), fields(uid = %user.uid))]
    pub async fn delete(
        &self,
        user: &CurrentUser,
        id_token: &SecretString,
        review_id: &ReviewId,
    ) -> Result<(), ReviewRejection> {
        let review = self
            .store
            .get(review_id)
            .await?
            .ok_or(ReviewRejection::NotFound)?;
        if review.user_id != user.uid {
            tracing::warn!(owner = %review.user_id, "Refusing to delete another user's review");
            return Err(ReviewRejection::NotOwner);
        }

        self.store.delete(review_id, id_token).await?;
        tracing::info!("Review deleted");
        Ok(())
    }
}

/// Newest first; reviews without a timestamp sort last.
fn sort_newest_first(reviews: &mut [Review]) {
    reviews.sort_by_key(|r| std::cmp::Reverse(r.created_at.map_or(0, |t| t.as_millis())));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boxsub_core::{Email, Uid};

    use super::*;
    use crate::reviews::MemoryReviews;
    use crate::storage::MemoryKeyValueStore;

    fn ann() -> CurrentUser {
        CurrentUser {
            uid: Uid::new("ann-uid"),
            email: Some(Email::parse("ann@example.com").unwrap()),
            display_name: Some("Ann".to_string()),
            photo_url: None,
        }
    }

    fn setup() -> (ReviewService, MembershipList, MemoryReviews) {
        let store = MemoryReviews::new();
        let subs = MembershipList::subscriptions(Arc::new(MemoryKeyValueStore::new()));
        let service = ReviewService::new(Arc::new(store.clone()), subs.clone());
        (service, subs, store)
    }

    fn token() -> SecretString {
        SecretString::from("token")
    }

    #[tokio::test]
    async fn test_submit_requires_subscription() {
        let (service, subs, store) = setup();
        let id = SubscriptionId::new(1);

        let err = service
            .submit(&ann(), &token(), id, "Love it", Rating::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewRejection::NotSubscribed));
        assert!(store.is_empty().await);

        subs.add(ann().email.as_ref().unwrap(), id).await.unwrap();
        service
            .submit(&ann(), &token(), id, "Love it", Rating::default())
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_text() {
        let (service, subs, _) = setup();
        let id = SubscriptionId::new(2);
        subs.add(ann().email.as_ref().unwrap(), id).await.unwrap();

        let err = service
            .submit(&ann(), &token(), id, "   ", Rating::default())
            .await
            .unwrap_err();
        assert_eq!(err.submit_message(), "Please enter a review");
    }

    #[tokio::test]
    async fn test_stored_fields() {
        let (service, subs, _) = setup();
        let id = SubscriptionId::new(3);
        subs.add(ann().email.as_ref().unwrap(), id).await.unwrap();

        service
            .submit(&ann(), &token(), id, " Great ", Rating::new(4).unwrap())
            .await
            .unwrap();
        let reviews = service.list(id).await;
        let review = &reviews[0];
        // Stored as typed; trimming only decides blankness.
        assert_eq!(review.review, " Great ");
        assert_eq!(review.user_name, "Ann");
        assert_eq!(review.user_email, "ann@example.com");
        assert_eq!(review.user_photo, "https://ui-avatars.com/api/?name=Ann");
        assert_eq!(review.rating.value(), 4);
        assert_eq!(review.created_at.unwrap().nanoseconds, 0);
    }

    #[tokio::test]
    async fn test_only_owner_can_delete() {
        let (service, subs, store) = setup();
        let id = SubscriptionId::new(4);
        subs.add(ann().email.as_ref().unwrap(), id).await.unwrap();
        let review_id = service
            .submit(&ann(), &token(), id, "Mine", Rating::default())
            .await
            .unwrap();

        let bob = CurrentUser {
            uid: Uid::new("bob-uid"),
            email: Some(Email::parse("bob@example.com").unwrap()),
            display_name: None,
            photo_url: None,
        };
        let err = service.delete(&bob, &token(), &review_id).await.unwrap_err();
        assert_eq!(err.delete_message(), "You can only delete your own reviews");
        assert_eq!(store.len().await, 1);

        service.delete(&ann(), &token(), &review_id).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_sort_newest_first_missing_timestamp_last() {
        let base = NewReview {
            subscription_id: SubscriptionId::new(1),
            user_id: Uid::new("u"),
            user_name: String::new(),
            user_email: String::new(),
            user_photo: String::new(),
            rating: Rating::default(),
            review: String::new(),
            created_at: Timestamp::new(100, 0),
        };
        let old = base.clone().into_review(ReviewId::new("old"));
        let new = NewReview {
            created_at: Timestamp::new(200, 0),
            ..base.clone()
        }
        .into_review(ReviewId::new("new"));
        let mut undated = base.into_review(ReviewId::new("undated"));
        undated.created_at = None;

        let mut reviews = vec![undated, old, new];
        sort_newest_first(&mut reviews);
        let ids: Vec<_> = reviews.iter().map(|r| r.id.as_str().to_string()).collect();
        assert_eq!(ids, ["new", "old", "undated"]);
    }
}
