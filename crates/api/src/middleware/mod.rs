//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireOwner`] -- Requires the company `owner` role.
//! - [`api_key::ApiKeyAuth`] -- Authenticates third-party callers by API key.

pub mod api_key;
pub mod auth;
pub mod rbac;

use axum::http::request::Parts;
use crm_core::error::CoreError;

use crate::error::AppError;

/// Read the bearer credential from the `Authorization` header.
pub(crate) fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })
}
