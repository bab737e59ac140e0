//! Per-user key-value storage ("local storage").
//!
//! Each entry is a string value under a string key, exactly like browser
//! local storage. The storefront uses three kinds of keys:
//!
//! | Key | Value |
//! |---|---|
//! | `userSubscriptions` | JSON object: email → array of subscription ids |
//! | `userWishlist` | JSON object: email → array of subscription ids |
//! | `userDetails_<uid>` | JSON object of profile details |
//!
//! `set` replaces a value whole. The membership maps hold every user's entry
//! under one key, so they are edited through [`KeyValueStore::update`], which
//! serializes read-modify-write cycles per key.

mod membership;
mod memory;
mod postgres;
mod profile;

pub use membership::{MembershipList, MembershipMap};
pub use memory::MemoryKeyValueStore;
pub use postgres::PgKeyValueStore;
pub use profile::{Gender, ProfileDetails, ProfileDetailsStore};

use async_trait::async_trait;
use thiserror::Error;

/// Storage keys.
pub mod keys {
    /// Subscription membership map.
    pub const USER_SUBSCRIPTIONS: &str = "userSubscriptions";

    /// Wishlist membership map.
    pub const USER_WISHLIST: &str = "userWishlist";

    /// Prefix for per-user profile details.
    pub const USER_DETAILS_PREFIX: &str = "userDetails_";

    /// Key holding the profile details of `uid`.
    #[must_use]
    pub fn user_details(uid: &str) -> String {
        format!("{USER_DETAILS_PREFIX}{uid}")
    }
}

/// Errors from a key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A value could not be encoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be decoded, so it cannot be safely edited.
    #[error("unreadable value under {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Edit applied by [`KeyValueStore::update`].
///
/// Receives the current value and returns the replacement, or `None` to leave
/// the value untouched.
pub type UpdateFn<'a> =
    dyn FnMut(Option<&str>) -> Result<Option<String>, StorageError> + Send + 'a;

/// A string-keyed, string-valued store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read-modify-write `key` atomically.
    ///
    /// No other `update` of the same key runs between the read and the
    /// write. If `edit` fails, nothing is written.
    async fn update(&self, key: &str, edit: &mut UpdateFn<'_>) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StorageError>;
}
