//! Database connection for storefront `PostgreSQL`.
//!
//! The storefront keeps two kinds of data in `PostgreSQL`:
//!
//! - `tower_sessions.session` - Tower-sessions storage
//! - `storefront.local_storage` - The per-user key-value store
//!   (see [`crate::storage::PgKeyValueStore`])
//!
//! Catalog data comes from JSON fixtures, accounts from the identity provider
//! and reviews from the document store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p boxsub-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
