//! Import job dispatcher.
//!
//! Polls for claimable import jobs every `poll_interval` and also wakes
//! immediately when notified (the API notifies right after creating a job).
//! Claims go through [`ImportRepo::claim_next`], which uses
//! `FOR UPDATE SKIP LOCKED` and a lease, so a crashed worker's job is picked
//! up again once the lease expires.
//!
//! Shutdown is checked between jobs and between rows, so a cancelled
//! dispatcher stops after the row in hand instead of finishing the job.

use std::sync::Arc;

use crm_core::types::DbId;
use crm_db::repositories::ImportRepo;
use sqlx::PgPool;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::config::DispatcherConfig;
use crate::error::ImportError;
use crate::processor::ImportProcessor;

/// Background import dispatcher.
///
/// A single long-lived Tokio task; jobs inside it run sequentially.
pub struct ImportDispatcher {
    pool: PgPool,
    processor: ImportProcessor,
    config: DispatcherConfig,
    notify: Arc<Notify>,
}

impl ImportDispatcher {
    pub fn new(pool: PgPool, config: DispatcherConfig, notify: Arc<Notify>) -> Self {
        Self {
            processor: ImportProcessor::new(pool.clone()),
            pool,
            config,
            notify,
        }
    }

    /// Run the dispatcher loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            lease_secs = self.config.lease_secs,
            max_attempts = self.config.max_attempts,
            "Import dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Import dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => self.drain(&cancel).await,
                _ = self.notify.notified() => self.drain(&cancel).await,
            }
        }
    }

    /// Process claimable jobs until none is left or `cancel` fires.
    async fn drain(&self, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            match self.run_once_until(cancel).await {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Import dispatch cycle failed");
                    break;
                }
            }
        }
    }

    /// One dispatch cycle: fail exhausted jobs, then claim and process at
    /// most one job. Returns the id of the job handled, if any.
    ///
    /// A job whose processing fails is marked `failed` with the error.
    pub async fn run_once(&self) -> Result<Option<DbId>, ImportError> {
        self.run_once_until(&CancellationToken::new()).await
    }

    /// [`run_once`](Self::run_once) that stops processing between rows once
    /// `cancel` fires. The interrupted job keeps its lease and is claimed
    /// again after it expires.
    pub async fn run_once_until(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<DbId>, ImportError> {
        let abandoned =
            ImportRepo::fail_exhausted(&self.pool, self.config.lease_secs, self.config.max_attempts)
                .await?;
        for job_id in abandoned {
            tracing::warn!(job_id, "Import job exceeded its attempts and was failed");
        }

        let Some(job) =
            ImportRepo::claim_next(&self.pool, self.config.lease_secs, self.config.max_attempts)
                .await?
        else {
            return Ok(None);
        };

        tracing::info!(job_id = job.id, attempt = job.attempts, "Import job claimed");

        if let Err(e) = self.processor.process_until(&job, cancel).await {
            tracing::error!(job_id = job.id, error = %e, "Import job failed");
            ImportRepo::fail(&self.pool, job.id, &e.to_string()).await?;
        }

        Ok(Some(job.id))
    }
}
