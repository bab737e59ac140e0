//! In-process review store for local development and tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::RwLock;

use boxsub_core::{ReviewId, SubscriptionId};

use super::{NewReview, Review, ReviewError, ReviewStore};

/// Reviews held in memory. Clones share the same collection.
#[derive(Clone, Default)]
pub struct MemoryReviews {
    reviews: Arc<RwLock<BTreeMap<ReviewId, Review>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryReviews {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reviews across all subscriptions.
    pub async fn len(&self) -> usize {
        self.reviews.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reviews.read().await.is_empty()
    }
}

#[async_trait]
impl ReviewStore for MemoryReviews {
    async fn list_for_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Review>, ReviewError> {
        Ok(self
            .reviews
            .read()
            .await
            .values()
            .filter(|r| r.subscription_id == subscription_id)
            .cloned()
            .collect())
    }

    async fn add(
        &self,
        review: &NewReview,
        _id_token: &SecretString,
    ) -> Result<ReviewId, ReviewError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = ReviewId::new(format!("review-{n}"));
        self.reviews
            .write()
            .await
            .insert(id.clone(), review.clone().into_review(id.clone()));
        Ok(id)
    }

    async fn get(&self, id: &ReviewId) -> Result<Option<Review>, ReviewError> {
        Ok(self.reviews.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &ReviewId, _id_token: &SecretString) -> Result<(), ReviewError> {
        self.reviews
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(ReviewError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boxsub_core::{Rating, Timestamp, Uid};

    use super::*;

    fn review(subscription: i32) -> NewReview {
        NewReview {
            subscription_id: SubscriptionId::new(subscription),
            user_id: Uid::new("u1"),
            user_name: "Ann".to_string(),
            user_email: "ann@example.com".to_string(),
            user_photo: String::new(),
            rating: Rating::default(),
            review: "Nice".to_string(),
            created_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn test_add_list_delete() {
        let store = MemoryReviews::new();
        let token = SecretString::from("t");

        let first = store.add(&review(1), &token).await.unwrap();
        store.add(&review(2), &token).await.unwrap();
        assert_eq!(store.len().await, 2);

        let listed = store
            .list_for_subscription(SubscriptionId::new(1))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, first);

        store.delete(&first, &token).await.unwrap();
        assert!(store.get(&first).await.unwrap().is_none());
        assert!(matches!(
            store.delete(&first, &token).await,
            Err(ReviewError::NotFound)
        ));
    }
}
