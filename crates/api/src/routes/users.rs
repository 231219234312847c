use axum::routing::{get, post};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// User routes mounted at `/users`.
///
/// ```text
/// GET  /                             -> list_users
/// POST /                             -> create_user (owner)
/// GET  /me/email-settings            -> get_email_settings
/// PUT  /me/email-settings            -> update_email_settings
/// POST /me/email-settings/test       -> test_email_settings
/// GET  /me/calendar-settings         -> get_calendar_settings
/// PUT  /me/calendar-settings         -> update_calendar_settings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/me/email-settings",
            get(users::get_email_settings).put(users::update_email_settings),
        )
        .route("/me/email-settings/test", post(users::test_email_settings))
        .route(
            "/me/calendar-settings",
            get(users::get_calendar_settings).put(users::update_calendar_settings),
        )
}
