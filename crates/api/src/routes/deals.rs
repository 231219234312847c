use axum::routing::{get, put};
use axum::Router;

use crate::handlers::deals;
use crate::state::AppState;

/// Deal routes mounted at `/deals`.
///
/// ```text
/// GET  /              -> list_board
/// POST /              -> create_deal
/// GET  /table         -> list_table
/// GET  /{id}          -> get_deal
/// PUT  /{id}/stage    -> update_deal_stage
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(deals::list_board).post(deals::create_deal))
        .route("/table", get(deals::list_table))
        .route("/{id}", get(deals::get_deal))
        .route("/{id}/stage", put(deals::update_deal_stage))
}
