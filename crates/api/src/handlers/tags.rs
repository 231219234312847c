//! Handlers for `/tags`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_db::models::tag::CreateTag;
use crm_db::repositories::TagRepo;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/tags
///
/// Names are unique per company, case-insensitively (409 on duplicate).
pub async fn create_tag(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTag>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let tag = TagRepo::create(&state.pool, auth.company_id, &input).await?;

    tracing::info!(company_id = auth.company_id, tag_id = tag.id, "Tag created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: tag })))
}

/// GET /api/v1/tags
///
/// All company tags with the number of people carrying each.
pub async fn list_tags(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let tags = TagRepo::list_with_counts(&state.pool, auth.company_id).await?;
    Ok(Json(DataResponse { data: tags }))
}
