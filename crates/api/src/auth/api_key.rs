//! Validation of third-party API keys (`pbr_...`).
//!
//! The stored prefix only narrows the lookup; the full key is checked against
//! its Argon2id hash. Any failure along the way yields an invalid result.

use crm_core::api_keys::{lookup_prefix, verify_api_key};
use crm_db::models::api_key::ApiKeyValidation;
use crm_db::repositories::ApiKeyRepo;
use crm_db::DbPool;

/// Validate a presented key and report its company and permissions.
///
/// Lookup errors are logged at WARN and reported as an invalid key. On
/// success the key's `last_used_at` is touched.
pub async fn validate_api_key(pool: &DbPool, key: &str) -> ApiKeyValidation {
    let Some(prefix) = lookup_prefix(key) else {
        return ApiKeyValidation::invalid();
    };

    let stored = match ApiKeyRepo::find_active_by_prefix(pool, prefix).await {
        Ok(Some(stored)) => stored,
        Ok(None) => return ApiKeyValidation::invalid(),
        Err(e) => {
            tracing::warn!(error = %e, key_prefix = %prefix, "API key lookup failed");
            return ApiKeyValidation::invalid();
        }
    };

    if !verify_api_key(key, &stored.key_hash) {
        return ApiKeyValidation::invalid();
    }

    if let Err(e) = ApiKeyRepo::touch_last_used(pool, stored.id).await {
        tracing::warn!(error = %e, api_key_id = stored.id, "Failed to touch API key last_used_at");
    }

    ApiKeyValidation::valid(&stored)
}
