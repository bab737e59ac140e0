//! `PostgreSQL`-backed key-value store.
//!
//! Table `storefront.local_storage` is created by the storefront migrations.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{KeyValueStore, StorageError, UpdateFn};

const UPSERT: &str = r"
    INSERT INTO storefront.local_storage (key, value, updated_at)
    VALUES ($1, $2, NOW())
    ON CONFLICT (key) DO UPDATE SET
        value = EXCLUDED.value,
        updated_at = NOW()
";

/// Key-value store persisted in `storefront.local_storage`.
#[derive(Clone)]
pub struct PgKeyValueStore {
    pool: PgPool,
}

impl PgKeyValueStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for PgKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM storefront.local_storage WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(UPSERT)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, key: &str, edit: &mut UpdateFn<'_>) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        // Held until commit; also covers keys that have no row yet.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT value FROM storefront.local_storage WHERE key = $1")
                .bind(key)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(value) = edit(current.as_deref())? {
            sqlx::query(UPSERT)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM storefront.local_storage WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
