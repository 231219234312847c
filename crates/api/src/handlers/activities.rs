//! Handlers for `/activities` (the contact and deal timeline).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::error::CoreError;
use crm_core::types::DbId;
use crm_db::models::activity::{ActivityListParams, CreateActivity};
use crm_db::repositories::{ActivityRepo, DealRepo, PersonRepo};
use crm_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/activities
///
/// The acting user is taken from the token, never from the body.
pub async fn create_activity(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut input): Json<CreateActivity>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    ensure_links(&state.pool, auth.company_id, input.person_id, input.deal_id).await?;
    input.user_id = Some(auth.user_id);

    let mut conn = state.pool.acquire().await?;
    let activity = ActivityRepo::create(&mut conn, auth.company_id, &input).await?;

    tracing::info!(
        company_id = auth.company_id,
        activity_id = activity.id,
        activity_type = %activity.activity_type,
        "Activity logged",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: activity })))
}

/// GET /api/v1/activities?personId=&dealId=
///
/// Newest first.
pub async fn list_activities(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ActivityListParams>,
) -> AppResult<impl IntoResponse> {
    let activities = ActivityRepo::list(&state.pool, auth.company_id, &params).await?;
    Ok(Json(DataResponse { data: activities }))
}

/// Person and deal references must point at rows of the caller's company.
pub(crate) async fn ensure_links(
    pool: &DbPool,
    company_id: DbId,
    person_id: Option<DbId>,
    deal_id: Option<DbId>,
) -> AppResult<()> {
    if let Some(id) = person_id {
        if PersonRepo::find_by_id(pool, company_id, id).await?.is_none() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Person {id} does not exist"
            ))));
        }
    }
    if let Some(id) = deal_id {
        if DealRepo::find_by_id(pool, company_id, id).await?.is_none() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Deal {id} does not exist"
            ))));
        }
    }
    Ok(())
}
