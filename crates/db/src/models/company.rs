//! Company (tenant) model and DTOs.

use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `companies` table. Every tenant-owned row points here.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: DbId,
    pub name: String,
    pub domain: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for signing up a new company together with its owner account.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompany {
    #[validate(
        length(min = 1, max = 200, message = "name must be 1-200 characters"),
        custom(function = "crate::models::not_blank", message = "name must not be blank")
    )]
    pub name: String,
    pub domain: Option<String>,
    #[validate(nested)]
    pub owner: CreateOwner,
}

/// Owner account created alongside a company.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOwner {
    #[validate(email(message = "owner email is invalid"))]
    pub email: String,
    pub password: String,
    #[validate(
        length(min = 1, message = "owner firstName must not be empty"),
        custom(function = "crate::models::not_blank", message = "owner firstName must not be blank")
    )]
    pub first_name: String,
    pub last_name: Option<String>,
}

/// DTO for updating a company. All fields are optional.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompany {
    #[validate(
        length(min = 1, max = 200, message = "name must be 1-200 characters"),
        custom(function = "crate::models::not_blank", message = "name must not be blank")
    )]
    pub name: Option<String>,
    pub domain: Option<String>,
}
