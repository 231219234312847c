use std::sync::Arc;

use tokio::sync::Notify;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: crm_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Wakes the import dispatcher as soon as a job is queued.
    pub import_notify: Arc<Notify>,
}
