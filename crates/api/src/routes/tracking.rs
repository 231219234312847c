use axum::routing::get;
use axum::Router;

use crate::handlers::tracking;
use crate::state::AppState;

/// Public email tracking routes, mounted at `/track` (root level).
///
/// ```text
/// GET /open/{tracking_id}          -> track_open (1x1 GIF)
/// GET /click/{tracking_id}?url=    -> track_click (302)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/open/{tracking_id}", get(tracking::track_open))
        .route("/click/{tracking_id}", get(tracking::track_click))
}
