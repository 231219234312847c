//! Handlers for `/imports`.
//!
//! Creating an import stores the job and its mapped rows in one transaction
//! and returns immediately; the dispatcher processes rows in the background.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::error::CoreError;
use crm_core::importer::{
    apply_mapping, compute_progress, parse_csv, parse_field_mapping, MAX_IMPORT_ROWS,
    ROW_STATUSES,
};
use crm_core::types::DbId;
use crm_db::models::import::{CreateImport, ImportJob, ImportRowParams, ImportStatus};
use crm_db::repositories::ImportRepo;
use crm_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/imports
///
/// Accepts either pre-split `rows` or raw `csvText`, never both.
pub async fn create_import(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateImport>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let mapping = parse_field_mapping(&input.field_mapping)?;

    let cells = match (input.rows, input.csv_text.as_deref()) {
        (Some(rows), None) => rows,
        (None, Some(text)) => parse_csv(text, input.has_header)?,
        _ => {
            return Err(AppError::Core(CoreError::Validation(
                "Provide exactly one of rows or csvText".into(),
            )))
        }
    };
    if cells.len() > MAX_IMPORT_ROWS {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Imports are limited to {MAX_IMPORT_ROWS} rows"
        ))));
    }

    let raw_rows: Vec<serde_json::Value> =
        cells.iter().map(|row| apply_mapping(&mapping, row)).collect();
    let field_mapping = serde_json::to_value(&input.field_mapping)
        .map_err(|e| AppError::InternalError(format!("Field mapping serialization: {e}")))?;

    let job = ImportRepo::create_job(
        &state.pool,
        auth.company_id,
        Some(auth.user_id),
        input.filename.trim(),
        &field_mapping,
        input.duplicate_handling,
        &raw_rows,
    )
    .await?;

    state.import_notify.notify_one();

    tracing::info!(
        company_id = auth.company_id,
        import_job_id = job.id,
        total_rows = job.total_rows,
        duplicate_handling = input.duplicate_handling.as_str(),
        "Import queued",
    );

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: with_progress(job) })))
}

/// GET /api/v1/imports
///
/// Newest first.
pub async fn list_imports(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let jobs = ImportRepo::list(&state.pool, auth.company_id).await?;
    let data: Vec<ImportStatus> = jobs.into_iter().map(with_progress).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/imports/{id}/status
pub async fn get_import_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state.pool, auth.company_id, id).await?;
    Ok(Json(DataResponse {
        data: with_progress(job),
    }))
}

/// GET /api/v1/imports/{id}/rows?status=
pub async fn list_import_rows(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ImportRowParams>,
) -> AppResult<impl IntoResponse> {
    if let Some(status) = params.status.as_deref() {
        if !ROW_STATUSES.contains(&status) {
            return Err(AppError::BadRequest(format!(
                "Unknown row status '{status}'"
            )));
        }
    }
    let job = find_job(&state.pool, auth.company_id, id).await?;

    let rows = ImportRepo::list_rows(
        &state.pool,
        job.id,
        params.status.as_deref(),
        params.limit,
        params.offset,
    )
    .await?;

    Ok(Json(DataResponse { data: rows }))
}

async fn find_job(pool: &DbPool, company_id: DbId, id: DbId) -> AppResult<ImportJob> {
    ImportRepo::find_by_id(pool, company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ImportJob",
            id,
        }))
}

fn with_progress(job: ImportJob) -> ImportStatus {
    let progress = compute_progress(job.processed_rows, job.total_rows);
    ImportStatus { job, progress }
}
