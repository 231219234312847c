//! Handlers for `/tasks`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::error::CoreError;
use crm_core::tasks::{is_valid_priority, PRIORITIES};
use crm_core::types::DbId;
use crm_db::models::task::{CreateTask, TaskListParams, UpdateTask};
use crm_db::repositories::TaskRepo;
use validator::Validate;

use super::activities::ensure_links;
use super::people::ensure_assignee;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/tasks
pub async fn create_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTask>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    check_priority(input.priority.as_deref())?;
    ensure_links(&state.pool, auth.company_id, input.person_id, input.deal_id).await?;
    ensure_assignee(&state.pool, auth.company_id, input.assigned_to).await?;

    let task = TaskRepo::create(&state.pool, auth.company_id, auth.user_id, &input).await?;

    tracing::info!(company_id = auth.company_id, task_id = task.id, "Task created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// GET /api/v1/tasks
pub async fn list_tasks(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<TaskListParams>,
) -> AppResult<impl IntoResponse> {
    let tasks = TaskRepo::list(&state.pool, auth.company_id, &params).await?;
    Ok(Json(DataResponse { data: tasks }))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = TaskRepo::find_by_id(&state.pool, auth.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Task", id }))?;

    Ok(Json(DataResponse { data: task }))
}

/// PUT /api/v1/tasks/{id}
///
/// Setting `completed` stamps or clears `completedAt`.
pub async fn update_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTask>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    check_priority(input.priority.as_deref())?;
    ensure_links(&state.pool, auth.company_id, input.person_id, input.deal_id).await?;
    ensure_assignee(&state.pool, auth.company_id, input.assigned_to).await?;

    let task = TaskRepo::update(&state.pool, auth.company_id, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Task", id }))?;

    tracing::info!(
        company_id = auth.company_id,
        task_id = id,
        completed = task.completed,
        "Task updated",
    );

    Ok(Json(DataResponse { data: task }))
}

fn check_priority(priority: Option<&str>) -> AppResult<()> {
    match priority {
        Some(p) if !is_valid_priority(p) => Err(AppError::Core(CoreError::Validation(format!(
            "priority must be one of {}",
            PRIORITIES.join(", ")
        )))),
        _ => Ok(()),
    }
}
