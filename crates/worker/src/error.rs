/// Errors that abort processing of a whole import job.
///
/// Per-row failures never surface here; they are recorded on the row.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid import job: {0}")]
    InvalidJob(String),
}
