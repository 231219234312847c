//! Repository for the `import_jobs` and `import_rows` tables.
//!
//! Jobs double as the work queue: a job in `processing` status is claimable
//! whenever its lease (`claimed_at`) is unset or older than the lease window.
//! Claims use `FOR UPDATE SKIP LOCKED`, so several workers can poll safely.

use crm_core::importer::{
    DuplicateHandling, JOB_STATUS_COMPLETED, JOB_STATUS_FAILED, JOB_STATUS_PROCESSING,
    ROW_STATUS_ERROR, ROW_STATUS_PENDING, ROW_STATUS_SKIPPED, ROW_STATUS_SUCCESS,
};
use crm_core::search::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crm_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::import::{ImportJob, ImportRow};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

const JOB_COLUMNS: &str = "id, company_id, user_id, filename, status, total_rows, \
    processed_rows, success_rows, skipped_rows, error_rows, field_mapping, duplicate_handling, \
    error_log, attempts, claimed_at, started_at, completed_at, created_at, updated_at";

const ROW_COLUMNS: &str = "id, import_job_id, row_number, raw_data, status, person_id, \
    error_message, processed_at, created_at";

/// Rows inserted per statement when creating a job.
const INSERT_CHUNK: usize = 1_000;

pub struct ImportRepo;

impl ImportRepo {
    // -----------------------------------------------------------------------
    // Creation and reads
    // -----------------------------------------------------------------------

    /// Create a job with one pending row per entry of `rows` (already mapped
    /// to field objects), then flip it to `processing`. All in one
    /// transaction, so a job is never visible with a partial row set.
    pub async fn create_job(
        pool: &PgPool,
        company_id: DbId,
        user_id: Option<DbId>,
        filename: &str,
        field_mapping: &serde_json::Value,
        duplicate_handling: DuplicateHandling,
        rows: &[serde_json::Value],
    ) -> Result<ImportJob, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let job_id: DbId = sqlx::query_scalar(
            "INSERT INTO import_jobs
                (company_id, user_id, filename, total_rows, field_mapping, duplicate_handling)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(company_id)
        .bind(user_id)
        .bind(filename)
        .bind(rows.len() as i32)
        .bind(field_mapping)
        .bind(duplicate_handling.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for (chunk_index, chunk) in rows.chunks(INSERT_CHUNK).enumerate() {
            let first = (chunk_index * INSERT_CHUNK) as i32 + 1;
            let numbers: Vec<i32> = (first..first + chunk.len() as i32).collect();
            sqlx::query(
                "INSERT INTO import_rows (import_job_id, row_number, raw_data)
                 SELECT $1, n, d FROM UNNEST($2::INTEGER[], $3::JSONB[]) AS t(n, d)",
            )
            .bind(job_id)
            .bind(&numbers)
            .bind(chunk)
            .execute(&mut *tx)
            .await?;
        }

        let query = format!(
            "UPDATE import_jobs SET status = $2 WHERE id = $1 RETURNING {JOB_COLUMNS}"
        );
        let job = sqlx::query_as::<_, ImportJob>(&query)
            .bind(job_id)
            .bind(JOB_STATUS_PROCESSING)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(job)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query =
            format!("SELECT {JOB_COLUMNS} FROM import_jobs WHERE id = $1 AND company_id = $2");
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// List the company's jobs, newest first.
    pub async fn list(pool: &PgPool, company_id: DbId) -> Result<Vec<ImportJob>, sqlx::Error> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM import_jobs WHERE company_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    /// List a job's rows in row order, optionally only one status.
    pub async fn list_rows(
        pool: &PgPool,
        job_id: DbId,
        status: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ImportRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ROW_COLUMNS} FROM import_rows
             WHERE import_job_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY row_number
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, ImportRow>(&query)
            .bind(job_id)
            .bind(status)
            .bind(clamp_limit(limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT))
            .bind(clamp_offset(offset))
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    /// Claim the oldest claimable job, stamping the lease and counting the
    /// attempt. Jobs that already used `max_attempts` are not claimed.
    pub async fn claim_next(
        pool: &PgPool,
        lease_secs: i64,
        max_attempts: i32,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs SET
                claimed_at = NOW(),
                attempts = attempts + 1,
                started_at = COALESCE(started_at, NOW())
             WHERE id = (
                SELECT id FROM import_jobs
                WHERE status = $1
                  AND attempts < $3
                  AND (claimed_at IS NULL
                       OR claimed_at < NOW() - make_interval(secs => $2::DOUBLE PRECISION))
                ORDER BY created_at, id
                FOR UPDATE SKIP LOCKED
                LIMIT 1
             )
             RETURNING {JOB_COLUMNS}"
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(JOB_STATUS_PROCESSING)
            .bind(lease_secs as f64)
            .bind(max_attempts)
            .fetch_optional(pool)
            .await
    }

    /// Fail jobs whose lease expired after their last permitted attempt.
    /// Returns the ids of the jobs failed.
    pub async fn fail_exhausted(
        pool: &PgPool,
        lease_secs: i64,
        max_attempts: i32,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE import_jobs SET
                status = $1,
                error_log = 'Import abandoned after ' || attempts || ' attempt(s)',
                completed_at = NOW(),
                claimed_at = NULL
             WHERE status = $2
               AND attempts >= $4
               AND claimed_at < NOW() - make_interval(secs => $3::DOUBLE PRECISION)
             RETURNING id",
        )
        .bind(JOB_STATUS_FAILED)
        .bind(JOB_STATUS_PROCESSING)
        .bind(lease_secs as f64)
        .bind(max_attempts)
        .fetch_all(pool)
        .await
    }

    /// Pending rows of a job in ascending row order.
    pub async fn pending_rows(pool: &PgPool, job_id: DbId) -> Result<Vec<ImportRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ROW_COLUMNS} FROM import_rows
             WHERE import_job_id = $1 AND status = $2
             ORDER BY row_number"
        );
        sqlx::query_as::<_, ImportRow>(&query)
            .bind(job_id)
            .bind(ROW_STATUS_PENDING)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Row outcomes
    // -----------------------------------------------------------------------

    /// Lock a pending row for the rest of the caller's transaction.
    ///
    /// Returns `false` if the row is already resolved or locked by another
    /// worker; the caller skips it.
    pub async fn lock_pending_row(
        conn: &mut PgConnection,
        job_id: DbId,
        row_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let locked: Option<DbId> = sqlx::query_scalar(
            "SELECT id FROM import_rows
             WHERE id = $1 AND import_job_id = $2 AND status = $3
             FOR UPDATE SKIP LOCKED",
        )
        .bind(row_id)
        .bind(job_id)
        .bind(ROW_STATUS_PENDING)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(locked.is_some())
    }

    /// Resolve a pending row and bump the job counters, refreshing the lease.
    ///
    /// Runs on the caller's connection so it commits together with the
    /// person write. Returns `false` if the row was no longer pending, in
    /// which case no counter moves.
    pub async fn resolve_row(
        conn: &mut PgConnection,
        job_id: DbId,
        row_id: DbId,
        status: &str,
        person_id: Option<DbId>,
        error_message: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE import_rows SET status = $3, person_id = $4, error_message = $5,
                    processed_at = NOW()
             WHERE id = $1 AND import_job_id = $2 AND status = $6",
        )
        .bind(row_id)
        .bind(job_id)
        .bind(status)
        .bind(person_id)
        .bind(error_message)
        .bind(ROW_STATUS_PENDING)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE import_jobs SET
                processed_rows = processed_rows + 1,
                success_rows = success_rows + CASE WHEN $2 = $3 THEN 1 ELSE 0 END,
                skipped_rows = skipped_rows + CASE WHEN $2 = $4 THEN 1 ELSE 0 END,
                error_rows = error_rows + CASE WHEN $2 = $5 THEN 1 ELSE 0 END,
                claimed_at = NOW()
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(status)
        .bind(ROW_STATUS_SUCCESS)
        .bind(ROW_STATUS_SKIPPED)
        .bind(ROW_STATUS_ERROR)
        .execute(&mut *conn)
        .await?;

        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Mark a job completed, recomputing the counters from its rows.
    ///
    /// Returns `None` and leaves the job untouched while any row is still
    /// pending.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Option<ImportJob>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs j SET
                status = $2,
                processed_rows = c.processed,
                success_rows = c.success,
                skipped_rows = c.skipped,
                error_rows = c.errors,
                completed_at = NOW(),
                claimed_at = NULL
             FROM (
                SELECT COUNT(*) FILTER (WHERE status <> $3) AS processed,
                       COUNT(*) FILTER (WHERE status = $4) AS success,
                       COUNT(*) FILTER (WHERE status = $5) AS skipped,
                       COUNT(*) FILTER (WHERE status = $6) AS errors
                FROM import_rows WHERE import_job_id = $1
             ) c
             WHERE j.id = $1
               AND NOT EXISTS (
                   SELECT 1 FROM import_rows r
                   WHERE r.import_job_id = $1 AND r.status = $3
               )
             RETURNING {}",
            prefixed_job_columns()
        );
        sqlx::query_as::<_, ImportJob>(&query)
            .bind(job_id)
            .bind(JOB_STATUS_COMPLETED)
            .bind(ROW_STATUS_PENDING)
            .bind(ROW_STATUS_SUCCESS)
            .bind(ROW_STATUS_SKIPPED)
            .bind(ROW_STATUS_ERROR)
            .fetch_optional(pool)
            .await
    }

    /// Mark a job failed with an error log.
    pub async fn fail(pool: &PgPool, job_id: DbId, error_log: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE import_jobs SET status = $2, error_log = $3, completed_at = NOW(),
                    claimed_at = NULL
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JOB_STATUS_FAILED)
        .bind(error_log)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Job columns qualified with the `j` alias, for `UPDATE ... FROM` queries.
fn prefixed_job_columns() -> String {
    JOB_COLUMNS
        .split(',')
        .map(|c| format!("j.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
