//! API key models.

use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `api_keys` table. The hash never leaves the server.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub key_prefix: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub last_used_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKey {
    #[validate(
        length(min = 1, max = 100, message = "name must be 1-100 characters"),
        custom(function = "crate::models::not_blank", message = "name must not be blank")
    )]
    pub name: String,
    pub permissions: Vec<String>,
    pub expires_at: Option<Timestamp>,
}

/// Response returned once at creation, carrying the plaintext key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyCreatedResponse {
    #[serde(flatten)]
    pub api_key: ApiKey,
    pub key: String,
}

/// Result of validating a presented key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl ApiKeyValidation {
    pub fn invalid() -> Self {
        Self {
            is_valid: false,
            api_key_id: None,
            company_id: None,
            key_name: None,
            permissions: None,
        }
    }

    pub fn valid(key: &ApiKey) -> Self {
        Self {
            is_valid: true,
            api_key_id: Some(key.id),
            company_id: Some(key.company_id),
            key_name: Some(key.name.clone()),
            permissions: Some(key.permissions.clone()),
        }
    }
}
