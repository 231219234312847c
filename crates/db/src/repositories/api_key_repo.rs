//! Repository for the `api_keys` table.

use crm_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::api_key::ApiKey;

const COLUMNS: &str = "id, company_id, name, key_prefix, key_hash, permissions, is_active, \
    created_by, last_used_at, expires_at, revoked_at, created_at, updated_at";

/// Provides storage and lookup for API keys.
pub struct ApiKeyRepo;

impl ApiKeyRepo {
    /// Insert a new key. `key_hash` is the Argon2 hash of the full key.
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        created_by: DbId,
        name: &str,
        key_prefix: &str,
        key_hash: &str,
        permissions: &[String],
        expires_at: Option<Timestamp>,
    ) -> Result<ApiKey, sqlx::Error> {
        let query = format!(
            "INSERT INTO api_keys
                (company_id, name, key_prefix, key_hash, permissions, created_by, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(company_id)
            .bind(name.trim())
            .bind(key_prefix)
            .bind(key_hash)
            .bind(permissions)
            .bind(created_by)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// List the company's keys, newest first. Revoked keys are included.
    pub async fn list(pool: &PgPool, company_id: DbId) -> Result<Vec<ApiKey>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM api_keys WHERE company_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    /// Find a usable key by its lookup prefix: active, not revoked, and not
    /// expired. The caller still has to verify the full key against the hash.
    pub async fn find_active_by_prefix(
        pool: &PgPool,
        key_prefix: &str,
    ) -> Result<Option<ApiKey>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM api_keys
             WHERE key_prefix = $1
               AND is_active
               AND revoked_at IS NULL
               AND (expires_at IS NULL OR expires_at > NOW())"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(key_prefix)
            .fetch_optional(pool)
            .await
    }

    pub async fn touch_last_used(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Revoke a key. Returns `true` if an active key was revoked.
    pub async fn revoke(pool: &PgPool, company_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE api_keys SET is_active = FALSE, revoked_at = NOW()
             WHERE id = $1 AND company_id = $2 AND revoked_at IS NULL",
        )
        .bind(id)
        .bind(company_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
