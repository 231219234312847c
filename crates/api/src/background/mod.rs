//! Background tasks run inside the API process.
//!
//! Each task is spawned via `tokio::spawn` and accepts a
//! [`CancellationToken`] for graceful shutdown.

use std::sync::Arc;

use crm_db::DbPool;
use crm_worker::config::DispatcherConfig;
use crm_worker::dispatcher::ImportDispatcher;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn the import dispatcher. `notify` is the same handle stored in
/// `AppState` so new imports wake it immediately.
pub fn spawn_import_dispatcher(
    pool: DbPool,
    config: DispatcherConfig,
    notify: Arc<Notify>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let dispatcher = ImportDispatcher::new(pool, config, notify);
    tokio::spawn(async move { dispatcher.run(cancel).await })
}
