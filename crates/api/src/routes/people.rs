use axum::routing::{get, post};
use axum::Router;

use crate::handlers::people;
use crate::state::AppState;

/// People routes mounted at `/people`.
///
/// ```text
/// GET    /                   -> list_people
/// POST   /                   -> create_person
/// POST   /assign-owner       -> assign_owner
/// POST   /bulk-tag-update    -> bulk_tag_update
/// GET    /{id}               -> get_person
/// PUT    /{id}               -> update_person
/// DELETE /{id}               -> delete_person
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(people::list_people).post(people::create_person))
        .route("/assign-owner", post(people::assign_owner))
        .route("/bulk-tag-update", post(people::bulk_tag_update))
        .route(
            "/{id}",
            get(people::get_person)
                .put(people::update_person)
                .delete(people::delete_person),
        )
}
