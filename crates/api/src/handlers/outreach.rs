//! Handlers for `/outreach`: simulated email sending.
//!
//! No mail leaves the server. A send succeeds or fails according to a random
//! roll against the provider's failure rate; failures are reported in a 200
//! response as `{success: false, message, error}` so the UI can show them
//! inline. Successful sends land on the person's timeline as `email_sent`.

use axum::extract::State;
use axum::Json;
use crm_core::activity::EMAIL_SENT;
use crm_core::outreach::{
    generate_tracking_id, inject_tracking, simulate_delivery, DeliveryOutcome, EmailProvider,
};
use crm_core::types::DbId;
use crm_core::validation::{is_valid_email, non_blank, normalize_email};
use crm_db::models::activity::CreateActivity;
use crm_db::repositories::{ActivityRepo, PersonRepo, SettingsRepo};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::activities::ensure_links;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const ERROR_NOT_CONNECTED: &str = "EMAIL_NOT_CONNECTED";
const ERROR_VALIDATION: &str = "VALIDATION_FAILED";

/// Request body shared by all send variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub person_id: Option<DbId>,
    pub deal_id: Option<DbId>,
}

/// Outcome of a send attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
}

impl SendEmailResult {
    fn failed(message: impl Into<String>, error: &str) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.to_string()),
            activity_id: None,
            tracking_id: None,
        }
    }
}

/// POST /api/v1/outreach/emails
pub async fn send_email(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SendEmailRequest>,
) -> AppResult<Json<DataResponse<SendEmailResult>>> {
    let result = deliver(&state, &auth, input, false).await?;
    Ok(Json(DataResponse { data: result }))
}

/// POST /api/v1/outreach/emails/tracked
///
/// Rewrites links through the click tracker and appends an open pixel.
pub async fn send_tracked_email(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SendEmailRequest>,
) -> AppResult<Json<DataResponse<SendEmailResult>>> {
    let result = deliver(&state, &auth, input, true).await?;
    Ok(Json(DataResponse { data: result }))
}

/// POST /api/v1/outreach/emails/validated
///
/// Checks the recipient and content before attempting the send.
pub async fn send_validated_email(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SendEmailRequest>,
) -> AppResult<Json<DataResponse<SendEmailResult>>> {
    let result = match validate_message(&input) {
        Err(message) => SendEmailResult::failed(message, ERROR_VALIDATION),
        Ok(()) => deliver(&state, &auth, input, false).await?,
    };
    Ok(Json(DataResponse { data: result }))
}

/// Random roll in `[0, 1)` for simulated sends. With failure simulation
/// disabled every send succeeds.
pub(crate) fn delivery_roll(state: &AppState) -> f64 {
    if state.config.simulate_delivery_failures {
        rand::rng().random::<f64>()
    } else {
        1.0
    }
}

fn validate_message(input: &SendEmailRequest) -> Result<(), String> {
    if !is_valid_email(&input.to) {
        return Err(format!("Invalid recipient email '{}'", input.to.trim()));
    }
    if non_blank(Some(&input.subject)).is_none() {
        return Err("Subject must not be empty".into());
    }
    if non_blank(Some(&input.body)).is_none() {
        return Err("Body must not be empty".into());
    }
    Ok(())
}

async fn deliver(
    state: &AppState,
    auth: &AuthUser,
    input: SendEmailRequest,
    tracked: bool,
) -> AppResult<SendEmailResult> {
    let settings = SettingsRepo::find_email(&state.pool, auth.user_id).await?;
    let Some(settings) = settings.filter(|s| s.is_connected) else {
        return Ok(SendEmailResult::failed(
            "Connect and test an email account before sending",
            ERROR_NOT_CONNECTED,
        ));
    };
    let provider = EmailProvider::parse(&settings.provider).ok_or_else(|| {
        AppError::InternalError(format!("Stored provider '{}' is unknown", settings.provider))
    })?;

    ensure_links(&state.pool, auth.company_id, input.person_id, input.deal_id).await?;
    let recipient = normalize_email(&input.to);

    let (body, tracking) = if tracked {
        let tracking_id = generate_tracking_id();
        let rewritten = inject_tracking(&input.body, &state.config.public_base_url, &tracking_id);
        (rewritten.html, Some((tracking_id, rewritten.links)))
    } else {
        (input.body.clone(), None)
    };

    if let DeliveryOutcome::Failed { message, error } =
        simulate_delivery(provider, delivery_roll(state))
    {
        tracing::warn!(
            user_id = auth.user_id,
            provider = provider.as_str(),
            error = %error,
            "Simulated email send failed",
        );
        return Ok(SendEmailResult::failed(message, &error));
    }

    let mut tx = state.pool.begin().await?;

    let person_id = match input.person_id {
        Some(id) => Some(id),
        None => PersonRepo::find_by_email(&mut tx, auth.company_id, &recipient)
            .await?
            .map(|p| p.id),
    };

    let mut metadata = json!({ "to": recipient, "provider": provider.as_str() });
    if let Some((tracking_id, links)) = &tracking {
        metadata["trackingId"] = json!(tracking_id);
        metadata["links"] = json!(links);
    }

    let mut activity = CreateActivity::new(EMAIL_SENT);
    activity.person_id = person_id;
    activity.deal_id = input.deal_id;
    activity.user_id = Some(auth.user_id);
    activity.subject = Some(input.subject.trim().to_string());
    activity.body = Some(body);
    activity.metadata = Some(metadata);
    let activity = ActivityRepo::create(&mut tx, auth.company_id, &activity).await?;

    if let Some(person_id) = person_id {
        PersonRepo::touch_last_contacted(&mut tx, person_id).await?;
    }

    tx.commit().await?;

    tracing::info!(
        company_id = auth.company_id,
        user_id = auth.user_id,
        activity_id = activity.id,
        tracked,
        "Email sent",
    );

    Ok(SendEmailResult {
        success: true,
        message: format!("Email sent to {recipient}"),
        error: None,
        activity_id: Some(activity.id),
        tracking_id: tracking.map(|(id, _)| id),
    })
}
