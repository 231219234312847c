//! Role-based access control extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use crm_core::error::CoreError;
use crm_core::roles::can_manage_company;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the company `owner` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn revoke(RequireOwner(user): RequireOwner) -> AppResult<StatusCode> {
///     Ok(StatusCode::NO_CONTENT)
/// }
/// ```
pub struct RequireOwner(pub AuthUser);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_manage_company(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Owner role required".into(),
            )));
        }
        Ok(RequireOwner(user))
    }
}
