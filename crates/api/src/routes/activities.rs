use axum::routing::get;
use axum::Router;

use crate::handlers::activities;
use crate::state::AppState;

/// Activity routes mounted at `/activities`.
///
/// ```text
/// GET  /   -> list_activities (?personId=&dealId=)
/// POST /   -> create_activity
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(activities::list_activities).post(activities::create_activity),
    )
}
