//! Activity timeline models.

use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `activities` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: DbId,
    pub company_id: DbId,
    pub person_id: Option<DbId>,
    pub deal_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub activity_type: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// Insert payload for an activity. Built by handlers and internal callers;
/// `user_id` comes from the caller, never from the request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivity {
    pub person_id: Option<DbId>,
    pub deal_id: Option<DbId>,
    #[serde(skip)]
    pub user_id: Option<DbId>,
    #[validate(
        length(min = 1, max = 50, message = "activityType must be 1-50 characters"),
        custom(function = "crate::models::not_blank", message = "activityType must not be blank")
    )]
    pub activity_type: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl CreateActivity {
    /// A bare activity of `activity_type` with no links or content.
    pub fn new(activity_type: &str) -> Self {
        Self {
            person_id: None,
            deal_id: None,
            user_id: None,
            activity_type: activity_type.to_string(),
            subject: None,
            body: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityListParams {
    pub person_id: Option<DbId>,
    pub deal_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
