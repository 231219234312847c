//! Tag models.

use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `tags` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub color: Option<String>,
    pub created_at: Timestamp,
}

/// A tag with the number of people carrying it.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWithCount {
    pub id: DbId,
    pub name: String,
    pub color: Option<String>,
    pub created_at: Timestamp,
    pub person_count: i64,
}

/// Compact tag embedded in person payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSummary {
    pub id: DbId,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTag {
    #[validate(
        length(min = 1, max = 100, message = "name must be 1-100 characters"),
        custom(function = "crate::models::not_blank", message = "name must not be blank")
    )]
    pub name: String,
    pub color: Option<String>,
}
