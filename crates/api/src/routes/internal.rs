use axum::routing::post;
use axum::Router;

use crate::handlers::internal;
use crate::state::AppState;

/// Service-to-service routes, mounted at `/internal` (root level).
///
/// ```text
/// POST /validate-api-key-permissions   -> validate_api_key_permissions
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/validate-api-key-permissions",
        post(internal::validate_api_key_permissions),
    )
}
