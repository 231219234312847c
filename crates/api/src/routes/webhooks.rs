use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Inbound webhook routes mounted at `/webhooks`. Authenticated by API key.
///
/// ```text
/// POST /bcc-email         -> log_bcc_email (emails:log)
/// POST /form-submission   -> form_submission (leads:create)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bcc-email", post(webhooks::log_bcc_email))
        .route("/form-submission", post(webhooks::form_submission))
}
