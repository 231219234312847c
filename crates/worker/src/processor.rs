//! Row-by-row processing of an import job.
//!
//! Each pending row runs in its own transaction: the person write, the row
//! outcome, and the job counter bump commit together. A failing row rolls
//! back alone and is recorded as `error`; the rest of the job continues.
//!
//! The row is locked with `FOR UPDATE SKIP LOCKED` before anything is
//! written, so two workers holding the same job (after a lease expiry)
//! never apply one row twice.

use crm_core::importer::{
    DuplicateHandling, ImportRecord, ROW_STATUS_ERROR, ROW_STATUS_SKIPPED, ROW_STATUS_SUCCESS,
};
use crm_core::types::DbId;
use crm_db::models::import::{ImportJob, ImportRow};
use crm_db::repositories::{ImportRepo, PersonRepo};
use sqlx::{PgConnection, PgPool};
use tokio_util::sync::CancellationToken;

use crate::error::ImportError;

/// Applies a job's pending rows to the people table.
#[derive(Clone)]
pub struct ImportProcessor {
    pool: PgPool,
}

impl ImportProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Process every pending row of `job` in row order, then mark the job
    /// completed. Rows resolved by an earlier attempt are not touched again.
    pub async fn process(&self, job: &ImportJob) -> Result<ImportJob, ImportError> {
        self.process_until(job, &CancellationToken::new()).await
    }

    /// Like [`process`](Self::process), but stops between rows once `cancel`
    /// fires. An interrupted job stays `processing` and is picked up again
    /// when its lease expires.
    ///
    /// Returns the job as stored after this pass. It is only `completed` once
    /// no row is pending; rows still held by another worker keep it open.
    pub async fn process_until(
        &self,
        job: &ImportJob,
        cancel: &CancellationToken,
    ) -> Result<ImportJob, ImportError> {
        let handling = DuplicateHandling::parse(&job.duplicate_handling).ok_or_else(|| {
            ImportError::InvalidJob(format!(
                "unknown duplicate handling '{}'",
                job.duplicate_handling
            ))
        })?;

        let rows = ImportRepo::pending_rows(&self.pool, job.id).await?;
        tracing::info!(
            job_id = job.id,
            company_id = job.company_id,
            pending = rows.len(),
            attempt = job.attempts,
            "Processing import job",
        );

        for row in &rows {
            if cancel.is_cancelled() {
                tracing::info!(
                    job_id = job.id,
                    next_row = row.row_number,
                    "Import job interrupted by shutdown",
                );
                return self.current(job).await;
            }
            self.process_row(job, handling, row).await?;
        }

        match ImportRepo::complete(&self.pool, job.id).await? {
            Some(completed) => {
                tracing::info!(
                    job_id = job.id,
                    success = completed.success_rows,
                    skipped = completed.skipped_rows,
                    errors = completed.error_rows,
                    "Import job completed",
                );
                Ok(completed)
            }
            None => {
                tracing::debug!(job_id = job.id, "Import job still has rows in flight");
                self.current(job).await
            }
        }
    }

    async fn current(&self, job: &ImportJob) -> Result<ImportJob, ImportError> {
        ImportRepo::find_by_id(&self.pool, job.company_id, job.id)
            .await?
            .ok_or_else(|| ImportError::InvalidJob(format!("import job {} disappeared", job.id)))
    }

    async fn process_row(
        &self,
        job: &ImportJob,
        handling: DuplicateHandling,
        row: &ImportRow,
    ) -> Result<(), ImportError> {
        let mut tx = self.pool.begin().await?;
        if !ImportRepo::lock_pending_row(&mut tx, job.id, row.id).await? {
            // Resolved or held by another worker.
            tx.rollback().await?;
            return Ok(());
        }

        let record = ImportRecord::from_raw(&row.raw_data);
        if let Err(message) = record.validate() {
            ImportRepo::resolve_row(&mut tx, job.id, row.id, ROW_STATUS_ERROR, None, Some(&message))
                .await?;
            tx.commit().await?;
            return Ok(());
        }

        match apply_record(&mut tx, job.company_id, handling, &record).await {
            Ok((status, person_id)) => {
                if ImportRepo::resolve_row(&mut tx, job.id, row.id, status, Some(person_id), None)
                    .await?
                {
                    tx.commit().await?;
                } else {
                    tx.rollback().await?;
                }
                Ok(())
            }
            Err(e) => {
                tx.rollback().await?;
                tracing::warn!(
                    job_id = job.id,
                    row_number = row.row_number,
                    error = %e,
                    "Import row failed",
                );
                self.record_error(job.id, row, &e.to_string()).await
            }
        }
    }

    async fn record_error(
        &self,
        job_id: DbId,
        row: &ImportRow,
        message: &str,
    ) -> Result<(), ImportError> {
        let mut conn = self.pool.acquire().await?;
        ImportRepo::resolve_row(&mut conn, job_id, row.id, ROW_STATUS_ERROR, None, Some(message))
            .await?;
        Ok(())
    }
}

/// Write one record according to the duplicate policy. Returns the row
/// status and the person the row resolved to.
async fn apply_record(
    conn: &mut PgConnection,
    company_id: DbId,
    handling: DuplicateHandling,
    record: &ImportRecord,
) -> Result<(&'static str, DbId), sqlx::Error> {
    let existing = match &record.email {
        Some(email) => PersonRepo::find_by_email(&mut *conn, company_id, email).await?,
        None => None,
    };

    match (existing, handling) {
        (Some(person), DuplicateHandling::Skip) => Ok((ROW_STATUS_SKIPPED, person.id)),
        (Some(person), DuplicateHandling::Merge) => {
            let merged = PersonRepo::merge_record(conn, company_id, person.id, record).await?;
            Ok((ROW_STATUS_SUCCESS, merged.id))
        }
        _ => {
            let created = PersonRepo::insert_record(conn, company_id, record).await?;
            Ok((ROW_STATUS_SUCCESS, created.id))
        }
    }
}
