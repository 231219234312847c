pub mod activities;
pub mod api_keys;
pub mod auth;
pub mod companies;
pub mod deals;
pub mod external;
pub mod health;
pub mod imports;
pub mod internal;
pub mod outreach;
pub mod people;
pub mod pipelines;
pub mod tags;
pub mod tasks;
pub mod tracking;
pub mod users;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                           login (public)
/// /auth/me                              current user
///
/// /companies                            signup (public)
/// /companies/{id}                       get, update (own company only)
///
/// /users                                list, add member (owner)
/// /users/me/email-settings              get, put
/// /users/me/email-settings/test         simulated connection test
/// /users/me/calendar-settings           get, put
///
/// /people                               list (filters), create
/// /people/assign-owner                  bulk assign
/// /people/bulk-tag-update               bulk add/remove tags
/// /people/{id}                          get, update, delete
///
/// /tags                                 list (with counts), create
///
/// /pipelines                            list, create
/// /pipelines/{id}                       detail, update, delete
///
/// /deals                                board, create
/// /deals/table                          filtered table
/// /deals/{id}                           get
/// /deals/{id}/stage                     move to stage
///
/// /tasks                                list, create
/// /tasks/{id}                           get, update
///
/// /activities                           timeline, create
///
/// /api-keys                             list, create (owner)
/// /api-keys/{id}                        revoke (owner)
///
/// /imports                              list, create
/// /imports/{id}/status                  job + progress
/// /imports/{id}/rows                    rows by status
///
/// /outreach/emails                      simulated send
/// /outreach/emails/tracked              send with open/click tracking
/// /outreach/emails/validated            send after input validation
///
/// /webhooks/bcc-email                   API key: emails:log
/// /webhooks/form-submission             API key: leads:create
///
/// /leads                                API key: leads:create
/// /contacts                             API key: contacts:read
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/companies", companies::router())
        .nest("/users", users::router())
        .nest("/people", people::router())
        .nest("/tags", tags::router())
        .nest("/pipelines", pipelines::router())
        .nest("/deals", deals::router())
        .nest("/tasks", tasks::router())
        .nest("/activities", activities::router())
        .nest("/api-keys", api_keys::router())
        .nest("/imports", imports::router())
        .nest("/outreach", outreach::router())
        .nest("/webhooks", webhooks::router())
        // Third-party integration endpoints, authenticated by API key.
        .merge(external::router())
}
