use axum::routing::{get, post};
use axum::Router;

use crate::handlers::companies;
use crate::state::AppState;

/// Company routes mounted at `/companies`.
///
/// ```text
/// POST /        -> create_company (public signup)
/// GET  /{id}    -> get_company
/// PUT  /{id}    -> update_company (owner)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(companies::create_company))
        .route(
            "/{id}",
            get(companies::get_company).put(companies::update_company),
        )
}
