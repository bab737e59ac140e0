//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::{Backend, StorefrontConfig};
use crate::identity::social::OAuthClient;
use crate::identity::{
    FirebaseIdentity, IdentityProvider, MemoryIdentity, SocialProvider,
};
use crate::reviews::{FirestoreReviews, MemoryReviews, ReviewStore};
use crate::services::{AccountService, ReviewService};
use crate::storage::{KeyValueStore, MembershipList, ProfileDetailsStore};

/// Error assembling application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("firebase backend selected but FIREBASE_* settings are missing")]
    MissingFirebaseConfig,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the catalog, the stores and the identity provider.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    storage: Arc<dyn KeyValueStore>,
    identity: Arc<dyn IdentityProvider>,
    reviews: Arc<dyn ReviewStore>,
    google: Option<OAuthClient>,
    github: Option<OAuthClient>,
}

impl AppState {
    /// Create application state with identity and reviews chosen by
    /// `config.backend`.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the Firebase backend is selected without its
    /// settings.
    pub fn new(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self, StateError> {
        let (identity, reviews): (Arc<dyn IdentityProvider>, Arc<dyn ReviewStore>) =
            match config.backend {
                Backend::Firebase => {
                    let firebase = config
                        .firebase
                        .as_ref()
                        .ok_or(StateError::MissingFirebaseConfig)?;
                    (
                        Arc::new(FirebaseIdentity::new(firebase, &config.base_url)),
                        Arc::new(FirestoreReviews::new(firebase)),
                    )
                }
                Backend::Memory => (Arc::new(MemoryIdentity::new()), Arc::new(MemoryReviews::new())),
            };

        Ok(Self::with_backends(config, storage, identity, reviews))
    }

    /// Create application state from explicit backends.
    #[must_use]
    pub fn with_backends(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStore>,
        identity: Arc<dyn IdentityProvider>,
        reviews: Arc<dyn ReviewStore>,
    ) -> Self {
        let catalog = Catalog::new(&config.catalog);
        let google = config
            .google
            .as_ref()
            .map(|c| OAuthClient::new(SocialProvider::Google, c));
        let github = config
            .github
            .as_ref()
            .map(|c| OAuthClient::new(SocialProvider::GitHub, c));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                storage,
                identity,
                reviews,
                google,
                github,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the fixture catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get the key-value store.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.storage
    }

    /// The `userSubscriptions` membership map.
    #[must_use]
    pub fn subscriptions(&self) -> MembershipList {
        MembershipList::subscriptions(Arc::clone(&self.inner.storage))
    }

    /// The `userWishlist` membership map.
    #[must_use]
    pub fn wishlist(&self) -> MembershipList {
        MembershipList::wishlist(Arc::clone(&self.inner.storage))
    }

    /// The `userDetails_<uid>` entries.
    #[must_use]
    pub fn profile_details(&self) -> ProfileDetailsStore {
        ProfileDetailsStore::new(Arc::clone(&self.inner.storage))
    }

    /// Get the identity provider.
    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.identity
    }

    /// Review rules over the review store.
    #[must_use]
    pub fn reviews(&self) -> ReviewService {
        ReviewService::new(Arc::clone(&self.inner.reviews), self.subscriptions())
    }

    /// Account rules over the identity provider and stores.
    #[must_use]
    pub fn accounts(&self) -> AccountService {
        AccountService::new(
            Arc::clone(&self.inner.identity),
            self.subscriptions(),
            self.wishlist(),
            self.profile_details(),
        )
    }

    /// OAuth client for `provider`, if configured.
    #[must_use]
    pub fn oauth_client(&self, provider: SocialProvider) -> Option<&OAuthClient> {
        match provider {
            SocialProvider::Google => self.inner.google.as_ref(),
            SocialProvider::GitHub => self.inner.github.as_ref(),
        }
    }
}
