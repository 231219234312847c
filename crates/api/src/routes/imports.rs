use axum::routing::get;
use axum::Router;

use crate::handlers::imports;
use crate::state::AppState;

/// Import routes mounted at `/imports`.
///
/// ```text
/// GET  /              -> list_imports
/// POST /              -> create_import (202, processed asynchronously)
/// GET  /{id}/status   -> get_import_status
/// GET  /{id}/rows     -> list_import_rows (?status=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(imports::list_imports).post(imports::create_import))
        .route("/{id}/status", get(imports::get_import_status))
        .route("/{id}/rows", get(imports::list_import_rows))
}
