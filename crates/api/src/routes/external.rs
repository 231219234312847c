use axum::routing::{get, post};
use axum::Router;

use crate::handlers::external;
use crate::state::AppState;

/// Third-party integration routes, merged into `/api/v1`.
///
/// ```text
/// POST /leads      -> create_lead (leads:create)
/// GET  /contacts   -> list_contacts (contacts:read)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/leads", post(external::create_lead))
        .route("/contacts", get(external::list_contacts))
}
