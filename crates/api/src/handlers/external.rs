//! Third-party integration endpoints, authenticated by API key.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::activity::LEAD_CREATED;
use crm_core::api_keys::permissions::{CONTACTS_READ, LEADS_CREATE};
use crm_db::models::person::PersonListParams;
use crm_db::repositories::PersonRepo;

use super::leads::{capture_lead, LeadInput};
use crate::error::AppResult;
use crate::middleware::api_key::ApiKeyAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/leads
pub async fn create_lead(
    key: ApiKeyAuth,
    State(state): State<AppState>,
    Json(input): Json<LeadInput>,
) -> AppResult<impl IntoResponse> {
    key.require(LEADS_CREATE)?;

    let result =
        capture_lead(&state.pool, key.company_id, &input, LEAD_CREATED, &key.key_name).await?;

    tracing::info!(
        company_id = key.company_id,
        api_key_id = key.api_key_id,
        person_id = result.person_id,
        "Lead created via API",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}

/// GET /api/v1/contacts
///
/// Same filters and paging as `GET /people`.
pub async fn list_contacts(
    key: ApiKeyAuth,
    State(state): State<AppState>,
    Query(params): Query<PersonListParams>,
) -> AppResult<impl IntoResponse> {
    key.require(CONTACTS_READ)?;

    let page = PersonRepo::list(&state.pool, key.company_id, &params).await?;
    Ok(Json(DataResponse { data: page }))
}
