//! Inbound webhooks, authenticated by API key.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::activity::{BCC_EMAIL, FORM_SUBMISSION};
use crm_core::api_keys::permissions::{EMAILS_LOG, LEADS_CREATE};
use crm_core::error::CoreError;
use crm_core::types::DbId;
use crm_core::validation::{is_valid_email, normalize_email};
use crm_db::models::activity::CreateActivity;
use crm_db::repositories::{ActivityRepo, PersonRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::leads::{capture_lead, LeadInput};
use crate::error::{AppError, AppResult};
use crate::middleware::api_key::ApiKeyAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// An email the user BCC'd to the CRM drop address.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BccEmailPayload {
    pub from: String,
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BccEmailResult {
    pub logged_count: usize,
    pub person_ids: Vec<DbId>,
}

/// POST /api/v1/webhooks/bcc-email
///
/// Logs one `bcc_email` activity per recipient, creating unknown recipients
/// as people.
pub async fn log_bcc_email(
    key: ApiKeyAuth,
    State(state): State<AppState>,
    Json(payload): Json<BccEmailPayload>,
) -> AppResult<impl IntoResponse> {
    key.require(EMAILS_LOG)?;

    let mut recipients: Vec<String> = Vec::new();
    for address in payload.to.iter().chain(&payload.cc) {
        let email = normalize_email(address);
        if is_valid_email(&email) && !recipients.contains(&email) {
            recipients.push(email);
        }
    }
    if recipients.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "No valid recipient addresses".into(),
        )));
    }

    let mut tx = state.pool.begin().await?;
    let mut person_ids = Vec::with_capacity(recipients.len());

    for email in &recipients {
        let (person, _) =
            PersonRepo::find_or_create_by_email(&mut tx, key.company_id, email, None, None, None)
                .await?;

        let mut activity = CreateActivity::new(BCC_EMAIL);
        activity.person_id = Some(person.id);
        activity.subject = payload.subject.clone();
        activity.body = payload.body.clone();
        activity.metadata = Some(json!({
            "from": normalize_email(&payload.from),
            "recipients": recipients,
        }));
        ActivityRepo::create(&mut tx, key.company_id, &activity).await?;
        PersonRepo::touch_last_contacted(&mut tx, person.id).await?;

        person_ids.push(person.id);
    }

    tx.commit().await?;

    tracing::info!(
        company_id = key.company_id,
        api_key_id = key.api_key_id,
        logged = person_ids.len(),
        "BCC email logged",
    );

    Ok(Json(DataResponse {
        data: BccEmailResult {
            logged_count: person_ids.len(),
            person_ids,
        },
    }))
}

/// POST /api/v1/webhooks/form-submission
pub async fn form_submission(
    key: ApiKeyAuth,
    State(state): State<AppState>,
    Json(input): Json<LeadInput>,
) -> AppResult<impl IntoResponse> {
    key.require(LEADS_CREATE)?;

    let result = capture_lead(
        &state.pool,
        key.company_id,
        &input,
        FORM_SUBMISSION,
        &key.key_name,
    )
    .await?;

    tracing::info!(
        company_id = key.company_id,
        api_key_id = key.api_key_id,
        person_id = result.person_id,
        deal_id = ?result.deal_id,
        "Form submission captured",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}
