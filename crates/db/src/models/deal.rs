//! Deal models and DTOs.

use chrono::NaiveDate;
use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A deal joined with its stage, pipeline, and person.
///
/// `value` is coalesced to 0 in SQL; `status` is derived from the stage's
/// won/lost flags.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealView {
    pub id: DbId,
    pub company_id: DbId,
    pub title: String,
    pub value: f64,
    pub expected_close_date: Option<NaiveDate>,
    pub probability: i32,
    pub loss_reason: Option<String>,
    pub notes: String,
    pub assigned_to: Option<DbId>,
    pub stage_id: DbId,
    pub stage_name: String,
    pub pipeline_id: DbId,
    pub is_won: bool,
    pub is_lost: bool,
    pub status: String,
    pub person_id: Option<DbId>,
    pub person_first_name: Option<String>,
    pub person_last_name: Option<String>,
    pub person_email: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeal {
    #[validate(
        length(min = 1, max = 300, message = "title must be 1-300 characters"),
        custom(function = "crate::models::not_blank", message = "title must not be blank")
    )]
    pub title: String,
    pub stage_id: DbId,
    pub person_id: Option<DbId>,
    pub value: Option<f64>,
    pub expected_close_date: Option<NaiveDate>,
    #[validate(range(min = 0, max = 100, message = "probability must be between 0 and 100"))]
    pub probability: Option<i32>,
    pub notes: Option<String>,
    pub assigned_to: Option<DbId>,
}

/// Body of `PUT /deals/{id}/stage`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDealStage {
    pub stage_id: DbId,
    pub loss_reason: Option<String>,
}

/// Query parameters for the board view `GET /deals`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealBoardParams {
    pub pipeline_id: Option<DbId>,
}

/// Query parameters for `GET /deals/table`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealTableParams {
    pub pipeline_id: Option<DbId>,
    pub stage_id: Option<DbId>,
    pub person_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
