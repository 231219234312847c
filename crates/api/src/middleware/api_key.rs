//! API-key authentication for webhook and third-party endpoints.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use crm_core::api_keys::has_permission;
use crm_core::error::CoreError;
use crm_core::types::DbId;

use super::bearer_token;
use crate::auth::api_key::validate_api_key;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// A caller authenticated with `Authorization: Bearer pbr_...`.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    pub api_key_id: DbId,
    pub company_id: DbId,
    pub key_name: String,
    pub permissions: Vec<String>,
}

impl ApiKeyAuth {
    /// Fail with 403 unless the key was granted `permission`.
    pub fn require(&self, permission: &str) -> AppResult<()> {
        if has_permission(&self.permissions, permission) {
            return Ok(());
        }
        Err(AppError::Core(CoreError::Forbidden(format!(
            "API key lacks the '{permission}' permission"
        ))))
    }
}

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = bearer_token(parts)?;
        let validation = validate_api_key(&state.pool, key).await;

        let invalid = || AppError::Core(CoreError::Unauthorized("Invalid API key".into()));
        if !validation.is_valid {
            return Err(invalid());
        }

        Ok(ApiKeyAuth {
            api_key_id: validation.api_key_id.ok_or_else(invalid)?,
            company_id: validation.company_id.ok_or_else(invalid)?,
            key_name: validation.key_name.unwrap_or_default(),
            permissions: validation.permissions.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_with(permissions: &[&str]) -> ApiKeyAuth {
        ApiKeyAuth {
            api_key_id: 1,
            company_id: 1,
            key_name: "zapier".into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn require_accepts_granted_permission() {
        assert!(key_with(&["leads:create"]).require("leads:create").is_ok());
    }

    #[test]
    fn require_rejects_missing_permission() {
        let err = key_with(&["contacts:read"]).require("emails:log").unwrap_err();
        assert!(matches!(err, AppError::Core(CoreError::Forbidden(_))));
    }
}
