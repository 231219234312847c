//! Repository for the `activities` table.

use crm_core::activity::EMAIL_OPEN;
use crm_core::search::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crm_core::types::DbId;
use serde_json::json;
use sqlx::{PgConnection, PgPool};

use crate::models::activity::{Activity, ActivityListParams, CreateActivity};

const COLUMNS: &str = "id, company_id, person_id, deal_id, user_id, activity_type, subject, \
    body, metadata, created_at";

pub struct ActivityRepo;

impl ActivityRepo {
    /// Insert an activity.
    pub async fn create(
        conn: &mut PgConnection,
        company_id: DbId,
        input: &CreateActivity,
    ) -> Result<Activity, sqlx::Error> {
        let query = format!(
            "INSERT INTO activities
                (company_id, person_id, deal_id, user_id, activity_type, subject, body, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, '{{}}'::jsonb))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(company_id)
            .bind(input.person_id)
            .bind(input.deal_id)
            .bind(input.user_id)
            .bind(&input.activity_type)
            .bind(&input.subject)
            .bind(&input.body)
            .bind(&input.metadata)
            .fetch_one(conn)
            .await
    }

    /// Timeline for a person and/or deal, newest first.
    pub async fn list(
        pool: &PgPool,
        company_id: DbId,
        params: &ActivityListParams,
    ) -> Result<Vec<Activity>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activities
             WHERE company_id = $1
               AND ($2::BIGINT IS NULL OR person_id = $2)
               AND ($3::BIGINT IS NULL OR deal_id = $3)
             ORDER BY created_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(company_id)
            .bind(params.person_id)
            .bind(params.deal_id)
            .bind(clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Tracking
    // -----------------------------------------------------------------------

    /// Find the `email_sent` activity carrying `tracking_id` in its metadata.
    pub async fn find_by_tracking_id(
        pool: &PgPool,
        activity_type: &str,
        tracking_id: &str,
    ) -> Result<Option<Activity>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activities
             WHERE metadata->>'trackingId' = $1 AND activity_type = $2
             ORDER BY id
             LIMIT 1"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(tracking_id)
            .bind(activity_type)
            .fetch_optional(pool)
            .await
    }

    /// Record an open of `original` unless one is already recorded.
    ///
    /// Returns `true` if a new `email_open` row was inserted. The
    /// `uq_activities_email_open_original` partial index allows one open per
    /// original activity; a concurrent duplicate hits the conflict and
    /// inserts nothing.
    pub async fn record_open_once(
        pool: &PgPool,
        original: &Activity,
    ) -> Result<bool, sqlx::Error> {
        let metadata = json!({
            "trackingId": original.metadata.get("trackingId"),
            "originalActivityId": original.id.to_string(),
        });
        let result = sqlx::query(
            "INSERT INTO activities (company_id, person_id, deal_id, activity_type, subject, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT ((metadata->>'originalActivityId')) WHERE activity_type = 'email_open'
             DO NOTHING",
        )
        .bind(original.company_id)
        .bind(original.person_id)
        .bind(original.deal_id)
        .bind(EMAIL_OPEN)
        .bind(&original.subject)
        .bind(&metadata)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
