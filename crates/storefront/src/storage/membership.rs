//! Subscription and wishlist membership maps.
//!
//! Both maps live under a single key each and hold every user's list:
//!
//! ```json
//! { "ann@example.com": [1, 4], "bob@example.com": [2] }
//! ```
//!
//! Every mutation reads the whole document, edits one user's entry and
//! writes the document back inside [`KeyValueStore::update`], so concurrent
//! writers for different users do not drop each other's entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use boxsub_core::{Email, SubscriptionId};

use super::{KeyValueStore, StorageError, keys};

/// Email → subscription ids, as stored.
pub type MembershipMap = BTreeMap<String, Vec<SubscriptionId>>;

/// One membership map (`userSubscriptions` or `userWishlist`).
#[derive(Clone)]
pub struct MembershipList {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
}

impl MembershipList {
    /// The `userSubscriptions` map.
    #[must_use]
    pub fn subscriptions(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: keys::USER_SUBSCRIPTIONS,
        }
    }

    /// The `userWishlist` map.
    #[must_use]
    pub fn wishlist(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: keys::USER_WISHLIST,
        }
    }

    /// Storage key of this map.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Ids in `email`'s entry, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub async fn ids(&self, email: &Email) -> Result<Vec<SubscriptionId>, StorageError> {
        Ok(self
            .load()
            .await?
            .remove(email.as_str())
            .unwrap_or_default())
    }

    /// Whether `email`'s entry contains `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub async fn contains(&self, email: &Email, id: SubscriptionId) -> Result<bool, StorageError> {
        Ok(self.ids(email).await?.contains(&id))
    }

    /// Append `id` to `email`'s entry unless already present.
    ///
    /// Returns `true` if the entry changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written, or if
    /// the stored map is unreadable.
    pub async fn add(&self, email: &Email, id: SubscriptionId) -> Result<bool, StorageError> {
        self.edit(|map| {
            let entry = map.entry(email.as_str().to_string()).or_default();
            if entry.contains(&id) {
                return (false, false);
            }
            entry.push(id);
            (true, true)
        })
        .await
    }

    /// Remove `id` from `email`'s entry.
    ///
    /// Returns `true` if the entry changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written, or if
    /// the stored map is unreadable.
    pub async fn remove(&self, email: &Email, id: SubscriptionId) -> Result<bool, StorageError> {
        self.edit(|map| {
            let Some(entry) = map.get_mut(email.as_str()) else {
                return (false, false);
            };
            let before = entry.len();
            entry.retain(|existing| *existing != id);
            let changed = entry.len() != before;
            (changed, changed)
        })
        .await
    }

    /// Add `id` if absent, remove it if present.
    ///
    /// Returns the membership state after the toggle.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written, or if
    /// the stored map is unreadable.
    pub async fn toggle(&self, email: &Email, id: SubscriptionId) -> Result<bool, StorageError> {
        self.edit(|map| {
            let entry = map.entry(email.as_str().to_string()).or_default();
            if entry.contains(&id) {
                entry.retain(|existing| *existing != id);
                (true, false)
            } else {
                entry.push(id);
                (true, true)
            }
        })
        .await
    }

    /// Delete `email`'s entry entirely.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written, or if
    /// the stored map is unreadable.
    pub async fn purge(&self, email: &Email) -> Result<(), StorageError> {
        self.edit(|map| (map.remove(email.as_str()).is_some(), ()))
            .await
    }

    /// Current map for reading. An unreadable document reads as empty.
    async fn load(&self) -> Result<MembershipMap, StorageError> {
        let Some(raw) = self.store.get(self.key).await? else {
            return Ok(MembershipMap::new());
        };
        match parse(self.key, &raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(key = self.key, error = %e, "Reading unreadable membership map as empty");
                Ok(MembershipMap::new())
            }
        }
    }

    /// Apply `f` to the stored map under the store's per-key update.
    ///
    /// `f` returns whether it changed the map, plus the caller's result. An
    /// unchanged map is not written back. An unreadable document is never
    /// overwritten.
    async fn edit<T, F>(&self, mut f: F) -> Result<T, StorageError>
    where
        T: Default + Send,
        F: FnMut(&mut MembershipMap) -> (bool, T) + Send,
    {
        let key = self.key;
        let mut outcome = T::default();
        self.store
            .update(key, &mut |current| {
                let mut map = match current {
                    Some(raw) => parse(key, raw)?,
                    None => MembershipMap::new(),
                };
                let (changed, result) = f(&mut map);
                outcome = result;
                if changed {
                    Ok(Some(serde_json::to_string(&map)?))
                } else {
                    Ok(None)
                }
            })
            .await?;
        Ok(outcome)
    }
}

fn parse(key: &str, raw: &str) -> Result<MembershipMap, StorageError> {
    serde_json::from_str(raw).map_err(|source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn id(n: i32) -> SubscriptionId {
        SubscriptionId::new(n)
    }

    #[tokio::test]
    async fn test_subscribe_adds_id_to_users_entry() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let subs = MembershipList::subscriptions(store.clone());
        let ann = email("ann@example.com");

        assert!(subs.add(&ann, id(3)).await.unwrap());
        assert_eq!(subs.ids(&ann).await.unwrap(), vec![id(3)]);

        let raw = store.get(keys::USER_SUBSCRIPTIONS).await.unwrap().unwrap();
        assert_eq!(raw, r#"{"ann@example.com":[3]}"#);
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let subs = MembershipList::subscriptions(Arc::new(MemoryKeyValueStore::new()));
        let ann = email("ann@example.com");

        assert!(subs.add(&ann, id(1)).await.unwrap());
        assert!(!subs.add(&ann, id(1)).await.unwrap());
        assert_eq!(subs.ids(&ann).await.unwrap(), vec![id(1)]);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_only_that_id() {
        let subs = MembershipList::subscriptions(Arc::new(MemoryKeyValueStore::new()));
        let ann = email("ann@example.com");
        subs.add(&ann, id(1)).await.unwrap();
        subs.add(&ann, id(2)).await.unwrap();

        assert!(subs.remove(&ann, id(1)).await.unwrap());
        assert!(!subs.remove(&ann, id(1)).await.unwrap());
        assert_eq!(subs.ids(&ann).await.unwrap(), vec![id(2)]);
    }

    #[tokio::test]
    async fn test_wishlist_toggle() {
        let wishlist = MembershipList::wishlist(Arc::new(MemoryKeyValueStore::new()));
        let ann = email("ann@example.com");

        assert!(wishlist.toggle(&ann, id(5)).await.unwrap());
        assert!(wishlist.contains(&ann, id(5)).await.unwrap());
        assert!(!wishlist.toggle(&ann, id(5)).await.unwrap());
        assert!(!wishlist.contains(&ann, id(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let subs = MembershipList::subscriptions(Arc::new(MemoryKeyValueStore::new()));
        let ann = email("ann@example.com");
        let bob = email("bob@example.com");

        subs.add(&ann, id(1)).await.unwrap();
        subs.add(&bob, id(2)).await.unwrap();
        subs.purge(&ann).await.unwrap();

        assert!(subs.ids(&ann).await.unwrap().is_empty());
        assert_eq!(subs.ids(&bob).await.unwrap(), vec![id(2)]);
    }

    #[tokio::test]
    async fn test_maps_do_not_share_keys() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let subs = MembershipList::subscriptions(store.clone());
        let wishlist = MembershipList::wishlist(store);
        let ann = email("ann@example.com");

        subs.add(&ann, id(1)).await.unwrap();
        assert!(wishlist.ids(&ann).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_reads_as_empty_but_is_not_overwritten() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set(keys::USER_WISHLIST, "{not json").await.unwrap();
        let wishlist = MembershipList::wishlist(store.clone());
        let ann = email("ann@example.com");

        assert!(wishlist.ids(&ann).await.unwrap().is_empty());
        assert!(matches!(
            wishlist.add(&ann, id(2)).await,
            Err(StorageError::Corrupt { .. })
        ));
        assert!(matches!(
            wishlist.purge(&ann).await,
            Err(StorageError::Corrupt { .. })
        ));
        assert_eq!(
            store.get(keys::USER_WISHLIST).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn test_toggle_drops_duplicate_copies() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store
            .set(keys::USER_WISHLIST, r#"{"ann@example.com":[4,4,1]}"#)
            .await
            .unwrap();
        let wishlist = MembershipList::wishlist(store);
        let ann = email("ann@example.com");

        assert!(!wishlist.toggle(&ann, id(4)).await.unwrap());
        assert_eq!(wishlist.ids(&ann).await.unwrap(), vec![id(1)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_keep_every_users_entry() {
        let subs = MembershipList::subscriptions(Arc::new(MemoryKeyValueStore::new()));

        let tasks: Vec<_> = (0..200)
            .map(|n| {
                let subs = subs.clone();
                tokio::spawn(async move {
                    let user = email(&format!("user{n}@example.com"));
                    subs.add(&user, id(1)).await.unwrap()
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        for n in 0..200 {
            let user = email(&format!("user{n}@example.com"));
            assert_eq!(subs.ids(&user).await.unwrap(), vec![id(1)], "user{n}");
        }
    }
}
