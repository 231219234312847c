use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::api_keys;
use crate::state::AppState;

/// API key routes mounted at `/api-keys`.
///
/// ```text
/// GET    /       -> list_api_keys
/// POST   /       -> create_api_key (owner; plaintext returned once)
/// DELETE /{id}   -> revoke_api_key (owner)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/{id}", delete(api_keys::revoke_api_key))
}
