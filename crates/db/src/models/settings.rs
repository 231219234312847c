//! Per-user email and calendar connection settings.
//!
//! Connections are simulated; these rows only record what the user
//! configured and whether the last (simulated) test succeeded.

use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `user_email_settings`.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    pub user_id: DbId,
    pub provider: String,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_username: Option<String>,
    pub oauth_email: Option<String>,
    pub from_name: Option<String>,
    pub signature: Option<String>,
    pub is_connected: bool,
    pub last_tested_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating or replacing a user's email settings.
///
/// Saving always resets `isConnected`; the connection test sets it again.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertEmailSettings {
    pub provider: String,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_username: Option<String>,
    pub oauth_email: Option<String>,
    pub from_name: Option<String>,
    pub signature: Option<String>,
}

/// A row from `user_calendar_settings`.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSettings {
    pub user_id: DbId,
    pub provider: String,
    pub calendar_id: Option<String>,
    pub sync_enabled: bool,
    pub is_connected: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating or replacing a user's calendar settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertCalendarSettings {
    pub provider: String,
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub sync_enabled: bool,
}
