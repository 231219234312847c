//! Handlers for `/deals`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::error::CoreError;
use crm_core::pipeline::is_valid_deal_status;
use crm_core::types::DbId;
use crm_db::models::deal::{CreateDeal, DealBoardParams, DealTableParams, UpdateDealStage};
use crm_db::models::pipeline::Stage;
use crm_db::repositories::{DealRepo, PersonRepo, PipelineRepo};
use crm_db::DbPool;
use validator::Validate;

use super::people::ensure_assignee;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/deals
///
/// Records a `deal_created` activity alongside the deal.
pub async fn create_deal(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateDeal>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    require_stage(&state.pool, auth.company_id, input.stage_id).await?;
    if let Some(person_id) = input.person_id {
        if PersonRepo::find_by_id(&state.pool, auth.company_id, person_id)
            .await?
            .is_none()
        {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Person {person_id} does not exist"
            ))));
        }
    }
    ensure_assignee(&state.pool, auth.company_id, input.assigned_to).await?;

    let deal = DealRepo::create(&state.pool, auth.company_id, Some(auth.user_id), &input).await?;

    tracing::info!(
        company_id = auth.company_id,
        deal_id = deal.id,
        stage_id = deal.stage_id,
        user_id = auth.user_id,
        "Deal created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: deal })))
}

/// GET /api/v1/deals
///
/// Board view: every deal, optionally limited to one pipeline.
pub async fn list_board(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<DealBoardParams>,
) -> AppResult<impl IntoResponse> {
    let deals = DealRepo::list_board(&state.pool, auth.company_id, params.pipeline_id).await?;
    Ok(Json(DataResponse { data: deals }))
}

/// GET /api/v1/deals/table
pub async fn list_table(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<DealTableParams>,
) -> AppResult<impl IntoResponse> {
    if let Some(status) = params.status.as_deref() {
        if !is_valid_deal_status(status) {
            return Err(AppError::BadRequest(format!(
                "Unknown deal status '{status}'"
            )));
        }
    }

    let page = DealRepo::list_table(&state.pool, auth.company_id, &params).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/deals/{id}
pub async fn get_deal(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deal = DealRepo::find_by_id(&state.pool, auth.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Deal", id }))?;

    Ok(Json(DataResponse { data: deal }))
}

/// PUT /api/v1/deals/{id}/stage
///
/// Move a deal to any stage of the company. Only the stage and loss reason
/// change; a `stage_change` activity records the move.
pub async fn update_deal_stage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDealStage>,
) -> AppResult<impl IntoResponse> {
    let not_found = || AppError::Core(CoreError::NotFound { entity: "Deal", id });

    DealRepo::find_by_id(&state.pool, auth.company_id, id)
        .await?
        .ok_or_else(not_found)?;
    require_stage(&state.pool, auth.company_id, input.stage_id).await?;

    let deal = DealRepo::update_stage(
        &state.pool,
        auth.company_id,
        id,
        input.stage_id,
        input.loss_reason.as_deref(),
        Some(auth.user_id),
    )
    .await?
    .ok_or_else(not_found)?;

    tracing::info!(
        company_id = auth.company_id,
        deal_id = id,
        stage_id = input.stage_id,
        user_id = auth.user_id,
        "Deal stage updated",
    );

    Ok(Json(DataResponse { data: deal }))
}

/// A stage id supplied by the client must belong to the caller's company.
async fn require_stage(pool: &DbPool, company_id: DbId, stage_id: DbId) -> AppResult<Stage> {
    PipelineRepo::find_stage(pool, company_id, stage_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Stage {stage_id} does not exist"
            )))
        })
}
