//! Task models and DTOs.

use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: DbId,
    pub company_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: String,
    pub completed: bool,
    pub completed_at: Option<Timestamp>,
    pub person_id: Option<DbId>,
    pub deal_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    #[validate(
        length(min = 1, max = 300, message = "title must be 1-300 characters"),
        custom(function = "crate::models::not_blank", message = "title must not be blank")
    )]
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: Option<String>,
    pub person_id: Option<DbId>,
    pub deal_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    #[validate(
        length(min = 1, max = 300, message = "title must be 1-300 characters"),
        custom(function = "crate::models::not_blank", message = "title must not be blank")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: Option<String>,
    pub completed: Option<bool>,
    pub person_id: Option<DbId>,
    pub deal_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    pub completed: Option<bool>,
    pub assigned_to: Option<DbId>,
    pub person_id: Option<DbId>,
    pub deal_id: Option<DbId>,
}
