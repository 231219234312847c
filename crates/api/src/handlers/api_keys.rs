//! Handlers for `/api-keys`.
//!
//! The plaintext key is returned exactly once, in the create response. Only
//! its display prefix and Argon2id hash are stored.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::api_keys::{generate_api_key, is_known_permission};
use crm_core::error::CoreError;
use crm_core::types::DbId;
use crm_db::models::api_key::{ApiKeyCreatedResponse, CreateApiKey};
use crm_db::repositories::ApiKeyRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOwner;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/api-keys
pub async fn create_api_key(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Json(input): Json<CreateApiKey>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if input.permissions.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "At least one permission is required".into(),
        )));
    }
    if let Some(unknown) = input.permissions.iter().find(|p| !is_known_permission(p)) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown permission '{unknown}'"
        ))));
    }

    let generated = generate_api_key()
        .map_err(|e| AppError::InternalError(format!("API key hashing failed: {e}")))?;

    let mut permissions = input.permissions.clone();
    permissions.sort();
    permissions.dedup();

    let api_key = ApiKeyRepo::create(
        &state.pool,
        owner.company_id,
        owner.user_id,
        input.name.trim(),
        &generated.prefix,
        &generated.hash,
        &permissions,
        input.expires_at,
    )
    .await?;

    tracing::info!(
        company_id = owner.company_id,
        api_key_id = api_key.id,
        key_prefix = %api_key.key_prefix,
        "API key created",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ApiKeyCreatedResponse {
                api_key,
                key: generated.plaintext,
            },
        }),
    ))
}

/// GET /api/v1/api-keys
pub async fn list_api_keys(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let keys = ApiKeyRepo::list(&state.pool, auth.company_id).await?;
    Ok(Json(DataResponse { data: keys }))
}

/// DELETE /api/v1/api-keys/{id}
pub async fn revoke_api_key(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !ApiKeyRepo::revoke(&state.pool, owner.company_id, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ApiKey",
            id,
        }));
    }

    tracing::info!(
        company_id = owner.company_id,
        api_key_id = id,
        user_id = owner.user_id,
        "API key revoked",
    );

    Ok(StatusCode::NO_CONTENT)
}
