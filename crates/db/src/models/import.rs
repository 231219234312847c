//! Import job and row models.

use std::collections::BTreeMap;

use crm_core::importer::DuplicateHandling;
use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `import_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: DbId,
    pub company_id: DbId,
    pub user_id: Option<DbId>,
    pub filename: String,
    pub status: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub success_rows: i32,
    pub skipped_rows: i32,
    pub error_rows: i32,
    pub field_mapping: serde_json::Value,
    pub duplicate_handling: String,
    pub error_log: Option<String>,
    pub attempts: i32,
    pub claimed_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `import_rows` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub id: DbId,
    pub import_job_id: DbId,
    pub row_number: i32,
    pub raw_data: serde_json::Value,
    pub status: String,
    pub person_id: Option<DbId>,
    pub error_message: Option<String>,
    pub processed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Body of `POST /imports`.
///
/// Exactly one of `rows` (pre-split cells) or `csvText` must be given.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateImport {
    #[validate(length(min = 1, max = 255, message = "filename must be 1-255 characters"))]
    pub filename: String,
    /// Column index (as a string key) to person field name.
    pub field_mapping: BTreeMap<String, String>,
    #[serde(default = "default_duplicate_handling")]
    pub duplicate_handling: DuplicateHandling,
    pub rows: Option<Vec<Vec<String>>>,
    pub csv_text: Option<String>,
    #[serde(default)]
    pub has_header: bool,
}

fn default_duplicate_handling() -> DuplicateHandling {
    DuplicateHandling::Skip
}

/// A job with its computed progress percentage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatus {
    #[serde(flatten)]
    pub job: ImportJob,
    pub progress: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
