//! Handlers for `/users`: company members and per-user connection settings.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::error::CoreError;
use crm_core::outreach::{simulate_delivery, DeliveryOutcome, EmailProvider, CALENDAR_PROVIDERS};
use crm_core::validation::{is_valid_email, non_blank, normalize_email};
use crm_db::models::settings::{EmailSettings, UpsertCalendarSettings, UpsertEmailSettings};
use crm_db::models::user::CreateUser;
use crm_db::repositories::{SettingsRepo, UserRepo};
use serde::Serialize;
use validator::Validate;

use super::auth::UserInfo;
use super::outreach::delivery_roll;
use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOwner;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of a simulated connection test.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub settings: EmailSettings,
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// GET /api/v1/users
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let users = UserRepo::list(&state.pool, auth.company_id).await?;
    let data: Vec<UserInfo> = users.iter().map(UserInfo::from).collect();
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/users
///
/// Add a member to the caller's company. Owner only.
pub async fn create_user(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?;

    let user = UserRepo::create_member(
        &state.pool,
        owner.company_id,
        &normalize_email(&input.email),
        &password_hash,
        input.first_name.trim(),
        non_blank(input.last_name.as_deref()),
    )
    .await?;

    tracing::info!(
        company_id = owner.company_id,
        user_id = user.id,
        created_by = owner.user_id,
        "User created",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserInfo::from(&user),
        }),
    ))
}

// ---------------------------------------------------------------------------
// Email settings
// ---------------------------------------------------------------------------

/// GET /api/v1/users/me/email-settings
///
/// Returns `null` data when nothing is configured yet.
pub async fn get_email_settings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let settings = SettingsRepo::find_email(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /api/v1/users/me/email-settings
///
/// Saving resets the connection flag until the next test.
pub async fn update_email_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpsertEmailSettings>,
) -> AppResult<impl IntoResponse> {
    let provider = EmailProvider::parse(&input.provider).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Unknown email provider '{}'",
            input.provider
        )))
    })?;

    if provider.is_oauth() {
        let account = non_blank(input.oauth_email.as_deref()).unwrap_or_default();
        if !is_valid_email(account) {
            return Err(AppError::Core(CoreError::Validation(
                "oauthEmail must be a valid email address".into(),
            )));
        }
    } else if non_blank(input.smtp_host.as_deref()).is_none() {
        return Err(AppError::Core(CoreError::Validation(
            "smtpHost is required for SMTP".into(),
        )));
    }

    let settings = SettingsRepo::upsert_email(&state.pool, auth.user_id, &input).await?;

    tracing::info!(
        user_id = auth.user_id,
        provider = provider.as_str(),
        "Email settings saved",
    );

    Ok(Json(DataResponse { data: settings }))
}

/// POST /api/v1/users/me/email-settings/test
///
/// Simulated connection test; the outcome is recorded on the settings row.
pub async fn test_email_settings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "EmailSettings",
            id: auth.user_id,
        })
    };

    let settings = SettingsRepo::find_email(&state.pool, auth.user_id)
        .await?
        .ok_or_else(not_found)?;
    let provider = EmailProvider::parse(&settings.provider).ok_or_else(|| {
        AppError::InternalError(format!("Stored provider '{}' is unknown", settings.provider))
    })?;

    let outcome = simulate_delivery(provider, delivery_roll(&state));
    let connected = outcome == DeliveryOutcome::Delivered;

    let settings = SettingsRepo::mark_email_tested(&state.pool, auth.user_id, connected)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(user_id = auth.user_id, connected, "Email connection tested");

    let result = match outcome {
        DeliveryOutcome::Delivered => ConnectionTestResult {
            success: true,
            message: format!("Connected to {}", provider.as_str()),
            error: None,
            settings,
        },
        DeliveryOutcome::Failed { message, error } => ConnectionTestResult {
            success: false,
            message,
            error: Some(error),
            settings,
        },
    };

    Ok(Json(DataResponse { data: result }))
}

// ---------------------------------------------------------------------------
// Calendar settings
// ---------------------------------------------------------------------------

/// GET /api/v1/users/me/calendar-settings
pub async fn get_calendar_settings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let settings = SettingsRepo::find_calendar(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /api/v1/users/me/calendar-settings
pub async fn update_calendar_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpsertCalendarSettings>,
) -> AppResult<impl IntoResponse> {
    if !CALENDAR_PROVIDERS.contains(&input.provider.as_str()) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown calendar provider '{}'",
            input.provider
        ))));
    }

    let settings = SettingsRepo::upsert_calendar(&state.pool, auth.user_id, &input).await?;

    tracing::info!(user_id = auth.user_id, provider = %input.provider, "Calendar settings saved");

    Ok(Json(DataResponse { data: settings }))
}
