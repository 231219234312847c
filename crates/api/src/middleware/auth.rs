//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use crm_core::error::CoreError;
use crm_core::types::DbId;

use super::bearer_token;
use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// Every tenant-scoped handler takes this extractor and passes `company_id`
/// into the repository call:
///
/// ```ignore
/// async fn list_tags(auth: AuthUser, State(state): State<AppState>) -> AppResult<...> {
///     let tags = TagRepo::list_with_counts(&state.pool, auth.company_id).await?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// The company the user belongs to.
    pub company_id: DbId,
    /// The user's role name (`"owner"` or `"member"`).
    pub role: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            company_id: claims.company_id,
            role: claims.role,
        })
    }
}
