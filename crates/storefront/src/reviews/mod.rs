//! Customer reviews kept in the remote `CustomerReviews` document collection.
//!
//! Each document has the fields:
//!
//! | Field | Type |
//! |---|---|
//! | `subscriptionId` | integer |
//! | `userId` | string |
//! | `userName` | string |
//! | `userEmail` | string |
//! | `userPhoto` | string (URL) |
//! | `rating` | integer 1-5 |
//! | `review` | string |
//! | `createdAt` | map `{seconds, nanoseconds}` |
//!
//! Reads are public; writes carry the signed-in user's id token.

mod firestore;
mod memory;
pub mod value;

pub use firestore::FirestoreReviews;
pub use memory::MemoryReviews;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use boxsub_core::{Rating, ReviewId, SubscriptionId, Timestamp, Uid};

/// Name of the review collection.
pub const COLLECTION: &str = "CustomerReviews";

/// A stored review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: ReviewId,
    pub subscription_id: SubscriptionId,
    pub user_id: Uid,
    pub user_name: String,
    pub user_email: String,
    pub user_photo: String,
    pub rating: Rating,
    pub review: String,
    /// Missing on documents written without a timestamp; those sort last.
    pub created_at: Option<Timestamp>,
}

/// Fields of a review about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub subscription_id: SubscriptionId,
    pub user_id: Uid,
    pub user_name: String,
    pub user_email: String,
    pub user_photo: String,
    pub rating: Rating,
    pub review: String,
    pub created_at: Timestamp,
}

impl NewReview {
    /// The stored review once the store has assigned `id`.
    #[must_use]
    pub fn into_review(self, id: ReviewId) -> Review {
        Review {
            id,
            subscription_id: self.subscription_id,
            user_id: self.user_id,
            user_name: self.user_name,
            user_email: self.user_email,
            user_photo: self.user_photo,
            rating: self.rating,
            review: self.review,
            created_at: Some(self.created_at),
        }
    }
}

/// Errors from a review store.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Transport error talking to the document store.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Document store rejected the request.
    #[error("document store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not the expected JSON.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A document is missing a field or holds the wrong type.
    #[error("invalid review document: {0}")]
    Decode(String),

    /// The review does not exist.
    #[error("review not found")]
    NotFound,
}

/// Storage for reviews.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// All reviews for one subscription, in store order.
    async fn list_for_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Review>, ReviewError>;

    /// Write a new review and return its id.
    async fn add(&self, review: &NewReview, id_token: &SecretString)
    -> Result<ReviewId, ReviewError>;

    /// Fetch one review.
    async fn get(&self, id: &ReviewId) -> Result<Option<Review>, ReviewError>;

    /// Delete a review.
    async fn delete(&self, id: &ReviewId, id_token: &SecretString) -> Result<(), ReviewError>;
}
