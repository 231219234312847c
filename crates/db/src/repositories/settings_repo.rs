//! Repository for `user_email_settings` and `user_calendar_settings`.

use crm_core::types::DbId;
use sqlx::PgPool;

use crate::models::settings::{
    CalendarSettings, EmailSettings, UpsertCalendarSettings, UpsertEmailSettings,
};

const EMAIL_COLUMNS: &str = "user_id, provider, smtp_host, smtp_port, smtp_username, \
    oauth_email, from_name, signature, is_connected, last_tested_at, created_at, updated_at";

const CALENDAR_COLUMNS: &str =
    "user_id, provider, calendar_id, sync_enabled, is_connected, created_at, updated_at";

pub struct SettingsRepo;

impl SettingsRepo {
    // -----------------------------------------------------------------------
    // Email
    // -----------------------------------------------------------------------

    pub async fn find_email(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<EmailSettings>, sqlx::Error> {
        let query = format!("SELECT {EMAIL_COLUMNS} FROM user_email_settings WHERE user_id = $1");
        sqlx::query_as::<_, EmailSettings>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create or replace a user's email settings. Resets `is_connected`.
    pub async fn upsert_email(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertEmailSettings,
    ) -> Result<EmailSettings, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_email_settings
                (user_id, provider, smtp_host, smtp_port, smtp_username, oauth_email,
                 from_name, signature, is_connected)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)
             ON CONFLICT (user_id) DO UPDATE SET
                provider = EXCLUDED.provider,
                smtp_host = EXCLUDED.smtp_host,
                smtp_port = EXCLUDED.smtp_port,
                smtp_username = EXCLUDED.smtp_username,
                oauth_email = EXCLUDED.oauth_email,
                from_name = EXCLUDED.from_name,
                signature = EXCLUDED.signature,
                is_connected = FALSE
             RETURNING {EMAIL_COLUMNS}"
        );
        sqlx::query_as::<_, EmailSettings>(&query)
            .bind(user_id)
            .bind(&input.provider)
            .bind(&input.smtp_host)
            .bind(input.smtp_port)
            .bind(&input.smtp_username)
            .bind(&input.oauth_email)
            .bind(&input.from_name)
            .bind(&input.signature)
            .fetch_one(pool)
            .await
    }

    /// Record the result of a connection test.
    pub async fn mark_email_tested(
        pool: &PgPool,
        user_id: DbId,
        connected: bool,
    ) -> Result<Option<EmailSettings>, sqlx::Error> {
        let query = format!(
            "UPDATE user_email_settings SET is_connected = $2, last_tested_at = NOW()
             WHERE user_id = $1
             RETURNING {EMAIL_COLUMNS}"
        );
        sqlx::query_as::<_, EmailSettings>(&query)
            .bind(user_id)
            .bind(connected)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Calendar
    // -----------------------------------------------------------------------

    pub async fn find_calendar(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<CalendarSettings>, sqlx::Error> {
        let query =
            format!("SELECT {CALENDAR_COLUMNS} FROM user_calendar_settings WHERE user_id = $1");
        sqlx::query_as::<_, CalendarSettings>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create or replace calendar settings. Saving marks the (simulated)
    /// connection as established.
    pub async fn upsert_calendar(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertCalendarSettings,
    ) -> Result<CalendarSettings, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_calendar_settings (user_id, provider, calendar_id, sync_enabled, is_connected)
             VALUES ($1, $2, $3, $4, TRUE)
             ON CONFLICT (user_id) DO UPDATE SET
                provider = EXCLUDED.provider,
                calendar_id = EXCLUDED.calendar_id,
                sync_enabled = EXCLUDED.sync_enabled,
                is_connected = TRUE
             RETURNING {CALENDAR_COLUMNS}"
        );
        sqlx::query_as::<_, CalendarSettings>(&query)
            .bind(user_id)
            .bind(&input.provider)
            .bind(&input.calendar_id)
            .bind(input.sync_enabled)
            .fetch_one(pool)
            .await
    }
}
