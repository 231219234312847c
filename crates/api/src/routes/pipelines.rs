use axum::routing::get;
use axum::Router;

use crate::handlers::pipelines;
use crate::state::AppState;

/// Pipeline routes mounted at `/pipelines`.
///
/// ```text
/// GET    /       -> list_pipelines
/// POST   /       -> create_pipeline
/// GET    /{id}   -> get_pipeline (stages + stats)
/// PUT    /{id}   -> update_pipeline
/// DELETE /{id}   -> delete_pipeline
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(pipelines::list_pipelines).post(pipelines::create_pipeline),
        )
        .route(
            "/{id}",
            get(pipelines::get_pipeline)
                .put(pipelines::update_pipeline)
                .delete(pipelines::delete_pipeline),
        )
}
