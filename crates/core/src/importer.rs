//! CSV import rules (people import).
//!
//! Covers everything about an import that does not need the database:
//! status names, field-mapping validation, turning raw cells into row
//! records, per-row validation, and progress computation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::validation::{is_valid_email, non_blank, normalize_email};

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

pub const JOB_STATUS_QUEUED: &str = "queued";
pub const JOB_STATUS_PROCESSING: &str = "processing";
pub const JOB_STATUS_COMPLETED: &str = "completed";
pub const JOB_STATUS_FAILED: &str = "failed";

pub const ROW_STATUS_PENDING: &str = "pending";
pub const ROW_STATUS_SUCCESS: &str = "success";
pub const ROW_STATUS_SKIPPED: &str = "skipped";
pub const ROW_STATUS_ERROR: &str = "error";

/// Row statuses accepted by the row listing filter.
pub const ROW_STATUSES: &[&str] = &[
    ROW_STATUS_PENDING,
    ROW_STATUS_SUCCESS,
    ROW_STATUS_SKIPPED,
    ROW_STATUS_ERROR,
];

/// Upper bound on rows accepted in a single import.
pub const MAX_IMPORT_ROWS: usize = 50_000;

// ---------------------------------------------------------------------------
// Duplicate handling
// ---------------------------------------------------------------------------

/// What to do when a row's email matches an existing person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateHandling {
    /// Leave the existing person untouched and mark the row skipped.
    Skip,
    /// Overwrite the existing person's fields with the row's values.
    Merge,
    /// Insert a new person regardless of the match.
    Create,
}

impl DuplicateHandling {
    pub fn as_str(self) -> &'static str {
        match self {
            DuplicateHandling::Skip => "skip",
            DuplicateHandling::Merge => "merge",
            DuplicateHandling::Create => "create",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "skip" => Some(DuplicateHandling::Skip),
            "merge" => Some(DuplicateHandling::Merge),
            "create" => Some(DuplicateHandling::Create),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

pub const FIELD_FIRST_NAME: &str = "firstName";
pub const FIELD_LAST_NAME: &str = "lastName";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_PHONE: &str = "phone";
pub const FIELD_JOB_TITLE: &str = "jobTitle";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_TAGS: &str = "tags";

/// Person fields a CSV column may be mapped to.
pub const MAPPABLE_FIELDS: &[&str] = &[
    FIELD_FIRST_NAME,
    FIELD_LAST_NAME,
    FIELD_EMAIL,
    FIELD_PHONE,
    FIELD_JOB_TITLE,
    FIELD_STATUS,
    FIELD_TAGS,
];

/// Validate a `column index -> field name` mapping as received over JSON
/// (object keys are strings) and convert it to numeric column indexes.
///
/// Empty field names mean "ignore this column" and are dropped.
pub fn parse_field_mapping(
    mapping: &BTreeMap<String, String>,
) -> Result<BTreeMap<usize, String>, CoreError> {
    let mut parsed = BTreeMap::new();
    let mut targets = Vec::new();

    for (column, field) in mapping {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let index: usize = column.trim().parse().map_err(|_| {
            CoreError::Validation(format!("Field mapping key '{column}' is not a column index"))
        })?;
        if !MAPPABLE_FIELDS.contains(&field) {
            return Err(CoreError::Validation(format!(
                "Unknown import field '{field}'"
            )));
        }
        if targets.contains(&field) {
            return Err(CoreError::Validation(format!(
                "Field '{field}' is mapped from more than one column"
            )));
        }
        targets.push(field);
        parsed.insert(index, field.to_string());
    }

    if parsed.is_empty() {
        return Err(CoreError::Validation(
            "Field mapping must map at least one column".into(),
        ));
    }
    Ok(parsed)
}

/// Apply a parsed mapping to one row of cells, producing the JSON object
/// stored as the row's `raw_data`. Blank cells and unmapped columns are
/// omitted; cells are trimmed.
pub fn apply_mapping(mapping: &BTreeMap<usize, String>, cells: &[String]) -> Value {
    let mut object = Map::new();
    for (index, field) in mapping {
        if let Some(cell) = cells.get(*index).map(|c| c.trim()) {
            if !cell.is_empty() {
                object.insert(field.clone(), Value::String(cell.to_string()));
            }
        }
    }
    Value::Object(object)
}

/// Split CSV text into rows of cells. Records may have differing lengths.
pub fn parse_csv(text: &str, has_header: bool) -> Result<Vec<Vec<String>>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            CoreError::Validation(format!("CSV parse error at record {}: {e}", index + 1))
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Row records
// ---------------------------------------------------------------------------

/// A row's mapped values, read back from `raw_data` by the worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub status: Option<String>,
    pub tags: Vec<String>,
}

impl ImportRecord {
    /// Read a record from a row's `raw_data` object.
    ///
    /// Non-string values are ignored. Emails are normalized; tags are split
    /// on commas and semicolons.
    pub fn from_raw(raw: &Value) -> Self {
        let text = |key: &str| {
            non_blank(raw.get(key).and_then(Value::as_str)).map(str::to_string)
        };

        let tags = text(FIELD_TAGS)
            .map(|t| {
                t.split([',', ';'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            first_name: text(FIELD_FIRST_NAME),
            last_name: text(FIELD_LAST_NAME),
            email: text(FIELD_EMAIL).map(|e| normalize_email(&e)),
            phone: text(FIELD_PHONE),
            job_title: text(FIELD_JOB_TITLE),
            status: text(FIELD_STATUS),
            tags,
        }
    }

    /// Check the record can become a person. The error string is stored as
    /// the row's `error_message`.
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.is_none() && self.email.is_none() {
            return Err("Row must include a first name or an email".into());
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                return Err(format!("Invalid email address '{email}'"));
            }
        }
        Ok(())
    }

    /// First name to store on insert; falls back to the email's local part.
    pub fn first_name_or_fallback(&self) -> String {
        if let Some(name) = &self.first_name {
            return name.clone();
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .unwrap_or_default()
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Percentage of processed rows, rounded and clamped to `[0, 100]`.
pub fn compute_progress(processed_rows: i32, total_rows: i32) -> i32 {
    if total_rows <= 0 {
        return 0;
    }
    let pct = (f64::from(processed_rows) / f64::from(total_rows) * 100.0).round() as i32;
    pct.clamp(0, 100)
}
