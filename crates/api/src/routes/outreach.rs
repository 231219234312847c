use axum::routing::post;
use axum::Router;

use crate::handlers::outreach;
use crate::state::AppState;

/// Outreach routes mounted at `/outreach`.
///
/// ```text
/// POST /emails             -> send_email
/// POST /emails/tracked     -> send_tracked_email
/// POST /emails/validated   -> send_validated_email
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/emails", post(outreach::send_email))
        .route("/emails/tracked", post(outreach::send_tracked_email))
        .route("/emails/validated", post(outreach::send_validated_email))
}
