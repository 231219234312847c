//! Person (contact) models and DTOs.

use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

use super::tag::TagSummary;

/// A row from the `people` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: DbId,
    pub company_id: DbId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub status: String,
    pub assigned_to: Option<DbId>,
    pub last_contacted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A person together with the tags attached to them.
///
/// Tags are aggregated in SQL with `json_agg`, so one query serves a whole
/// page of people.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonWithTags {
    pub id: DbId,
    pub company_id: DbId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub status: String,
    pub assigned_to: Option<DbId>,
    pub last_contacted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub tags: Json<Vec<TagSummary>>,
}

/// DTO for creating a person.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePerson {
    #[validate(
        length(min = 1, max = 200, message = "firstName must be 1-200 characters"),
        custom(function = "crate::models::not_blank", message = "firstName must not be blank")
    )]
    pub first_name: String,
    pub last_name: Option<String>,
    #[validate(email(message = "email is invalid"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<DbId>,
    pub tag_ids: Option<Vec<DbId>>,
}

/// DTO for updating a person. `tagIds`, when present, replaces the tag set.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePerson {
    #[validate(
        length(min = 1, max = 200, message = "firstName must be 1-200 characters"),
        custom(function = "crate::models::not_blank", message = "firstName must not be blank")
    )]
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "email is invalid"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<DbId>,
    pub tag_ids: Option<Vec<DbId>>,
}

/// Query parameters for `GET /people`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonListParams {
    pub search: Option<String>,
    /// Comma-separated tag ids; a person matches when carrying any of them.
    pub tag_ids: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<DbId>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body of `POST /people/assign-owner`. A null `assignedTo` unassigns.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOwnerRequest {
    pub person_ids: Vec<DbId>,
    pub assigned_to: Option<DbId>,
}

/// Body of `POST /people/bulk-tag-update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTagUpdateRequest {
    pub person_ids: Vec<DbId>,
    #[serde(default)]
    pub add_tag_ids: Vec<DbId>,
    #[serde(default)]
    pub remove_tag_ids: Vec<DbId>,
}

/// Number of rows touched by a bulk operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResult {
    pub updated: u64,
}
