//! Service-to-service endpoints guarded by the `x-internal-token` header.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use crm_core::api_keys::has_permission;
use crm_core::error::CoreError;
use crm_db::models::api_key::ApiKeyValidation;
use serde::{Deserialize, Serialize};

use crate::auth::api_key::validate_api_key;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateApiKeyRequest {
    pub api_key: String,
    #[serde(default)]
    pub required_permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateApiKeyResponse {
    #[serde(flatten)]
    pub validation: ApiKeyValidation,
    /// Whether the key holds every requested permission.
    pub has_required_permissions: bool,
}

/// POST /internal/validate-api-key-permissions
pub async fn validate_api_key_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ValidateApiKeyRequest>,
) -> AppResult<Json<DataResponse<ValidateApiKeyResponse>>> {
    let presented = headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    let authorized = matches!(
        (state.config.internal_service_token.as_deref(), presented),
        (Some(expected), Some(given)) if expected == given
    );
    if !authorized {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Missing or invalid internal token".into(),
        )));
    }

    let validation = validate_api_key(&state.pool, &input.api_key).await;
    let has_required_permissions = validation.is_valid
        && validation.permissions.as_deref().is_some_and(|granted| {
            input
                .required_permissions
                .iter()
                .all(|p| has_permission(granted, p))
        });

    Ok(Json(DataResponse {
        data: ValidateApiKeyResponse {
            validation,
            has_required_permissions,
        },
    }))
}
