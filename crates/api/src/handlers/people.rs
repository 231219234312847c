//! Handlers for `/people` (contacts).
//!
//! Emails are normalized before storage so duplicate matching in imports
//! and webhooks stays case-insensitive. Tag and assignee ids are checked
//! against the caller's company before any write.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::error::CoreError;
use crm_core::types::DbId;
use crm_core::validation::normalize_email;
use crm_db::models::person::{
    AssignOwnerRequest, BulkTagUpdateRequest, BulkUpdateResult, CreatePerson, PersonListParams,
    UpdatePerson,
};
use crm_db::repositories::{PersonRepo, TagRepo, UserRepo};
use crm_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/people
pub async fn create_person(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut input): Json<CreatePerson>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    input.email = input.email.as_deref().map(normalize_email);
    ensure_tags_owned(&state.pool, auth.company_id, input.tag_ids.as_deref()).await?;
    ensure_assignee(&state.pool, auth.company_id, input.assigned_to).await?;

    let person = PersonRepo::create(&state.pool, auth.company_id, &input).await?;

    tracing::info!(
        company_id = auth.company_id,
        person_id = person.id,
        user_id = auth.user_id,
        "Person created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: person })))
}

/// GET /api/v1/people
///
/// Filter by `search`, `tagIds`, `status`, `assignedTo`; sort and paginate.
pub async fn list_people(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PersonListParams>,
) -> AppResult<impl IntoResponse> {
    let page = PersonRepo::list(&state.pool, auth.company_id, &params).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/people/{id}
pub async fn get_person(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let person = PersonRepo::find_by_id(&state.pool, auth.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Person",
            id,
        }))?;

    Ok(Json(DataResponse { data: person }))
}

/// PUT /api/v1/people/{id}
///
/// `tagIds`, when present, replaces the person's tag set.
pub async fn update_person(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdatePerson>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    input.email = input.email.as_deref().map(normalize_email);
    ensure_tags_owned(&state.pool, auth.company_id, input.tag_ids.as_deref()).await?;
    ensure_assignee(&state.pool, auth.company_id, input.assigned_to).await?;

    let person = PersonRepo::update(&state.pool, auth.company_id, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Person",
            id,
        }))?;

    tracing::info!(
        company_id = auth.company_id,
        person_id = id,
        user_id = auth.user_id,
        "Person updated",
    );

    Ok(Json(DataResponse { data: person }))
}

/// DELETE /api/v1/people/{id}
pub async fn delete_person(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !PersonRepo::delete(&state.pool, auth.company_id, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Person",
            id,
        }));
    }

    tracing::info!(
        company_id = auth.company_id,
        person_id = id,
        user_id = auth.user_id,
        "Person deleted",
    );

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/people/assign-owner
pub async fn assign_owner(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<AssignOwnerRequest>,
) -> AppResult<impl IntoResponse> {
    if input.person_ids.is_empty() {
        return Err(AppError::BadRequest("personIds must not be empty".into()));
    }
    ensure_assignee(&state.pool, auth.company_id, input.assigned_to).await?;

    let updated = PersonRepo::assign_owner(
        &state.pool,
        auth.company_id,
        &input.person_ids,
        input.assigned_to,
    )
    .await?;

    tracing::info!(
        company_id = auth.company_id,
        assigned_to = ?input.assigned_to,
        updated,
        "People assigned",
    );

    Ok(Json(DataResponse {
        data: BulkUpdateResult { updated },
    }))
}

/// POST /api/v1/people/bulk-tag-update
pub async fn bulk_tag_update(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<BulkTagUpdateRequest>,
) -> AppResult<impl IntoResponse> {
    if input.person_ids.is_empty() {
        return Err(AppError::BadRequest("personIds must not be empty".into()));
    }
    if input.add_tag_ids.is_empty() && input.remove_tag_ids.is_empty() {
        return Err(AppError::BadRequest(
            "addTagIds or removeTagIds must not be empty".into(),
        ));
    }
    let all_tags: Vec<DbId> = input
        .add_tag_ids
        .iter()
        .chain(&input.remove_tag_ids)
        .copied()
        .collect();
    ensure_tags_owned(&state.pool, auth.company_id, Some(&all_tags)).await?;

    let updated = PersonRepo::bulk_tag_update(
        &state.pool,
        auth.company_id,
        &input.person_ids,
        &input.add_tag_ids,
        &input.remove_tag_ids,
    )
    .await?;

    tracing::info!(company_id = auth.company_id, updated, "Bulk tag update applied");

    Ok(Json(DataResponse {
        data: BulkUpdateResult { updated },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_tags_owned(
    pool: &DbPool,
    company_id: DbId,
    tag_ids: Option<&[DbId]>,
) -> AppResult<()> {
    let Some(tag_ids) = tag_ids.filter(|ids| !ids.is_empty()) else {
        return Ok(());
    };
    if !TagRepo::all_owned(pool, company_id, tag_ids).await? {
        return Err(AppError::Core(CoreError::Validation(
            "One or more tags do not exist".into(),
        )));
    }
    Ok(())
}

/// Assignees must be users of the same company.
pub(crate) async fn ensure_assignee(
    pool: &DbPool,
    company_id: DbId,
    assigned_to: Option<DbId>,
) -> AppResult<()> {
    let Some(user_id) = assigned_to else {
        return Ok(());
    };
    if !UserRepo::belongs_to_company(pool, company_id, user_id).await? {
        return Err(AppError::Core(CoreError::Validation(format!(
            "User {user_id} is not a member of this company"
        ))));
    }
    Ok(())
}
