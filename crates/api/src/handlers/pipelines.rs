//! Handlers for `/pipelines`.
//!
//! Stage lists are validated up front (non-empty names, no stage both won
//! and lost); the repository enforces the rules that need the database,
//! such as refusing to drop stages that still hold deals.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::error::CoreError;
use crm_core::pipeline::validate_stages;
use crm_core::types::DbId;
use crm_db::models::pipeline::{stage_specs, CreatePipeline, UpdatePipeline};
use crm_db::repositories::PipelineRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/pipelines
pub async fn create_pipeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePipeline>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let stages = stage_specs(&input.stages);
    validate_stages(&stages)?;

    let pipeline =
        PipelineRepo::create(&state.pool, auth.company_id, input.name.trim(), &stages).await?;

    tracing::info!(
        company_id = auth.company_id,
        pipeline_id = pipeline.pipeline.id,
        stage_count = pipeline.stages.len(),
        "Pipeline created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: pipeline })))
}

/// GET /api/v1/pipelines
pub async fn list_pipelines(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let pipelines = PipelineRepo::list(&state.pool, auth.company_id).await?;
    Ok(Json(DataResponse { data: pipelines }))
}

/// GET /api/v1/pipelines/{id}
///
/// Pipeline with per-stage deal counts and pipeline statistics.
pub async fn get_pipeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = PipelineRepo::find_detail(&state.pool, auth.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Pipeline",
            id,
        }))?;

    Ok(Json(DataResponse { data: detail }))
}

/// PUT /api/v1/pipelines/{id}
///
/// Stages with an `id` are updated in place, stages without one are
/// inserted, and omitted stages are removed when no deal uses them.
pub async fn update_pipeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePipeline>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let stages = input.stages.as_deref().map(stage_specs);
    if let Some(stages) = &stages {
        validate_stages(stages)?;
    }

    let pipeline = PipelineRepo::update(
        &state.pool,
        auth.company_id,
        id,
        input.name.as_deref(),
        stages.as_deref(),
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "Pipeline",
        id,
    }))?;

    tracing::info!(
        company_id = auth.company_id,
        pipeline_id = id,
        user_id = auth.user_id,
        "Pipeline updated",
    );

    Ok(Json(DataResponse { data: pipeline }))
}

/// DELETE /api/v1/pipelines/{id}
///
/// Refused with 409 while any deal sits in one of its stages.
pub async fn delete_pipeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !PipelineRepo::delete(&state.pool, auth.company_id, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Pipeline",
            id,
        }));
    }

    tracing::info!(
        company_id = auth.company_id,
        pipeline_id = id,
        user_id = auth.user_id,
        "Pipeline deleted",
    );

    Ok(StatusCode::NO_CONTENT)
}
