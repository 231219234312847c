//! Row models and request/response DTOs.
//!
//! Every serialized type uses camelCase field names to match the frontend's
//! generated clients.

pub mod activity;
pub mod api_key;
pub mod company;
pub mod deal;
pub mod import;
pub mod person;
pub mod pipeline;
pub mod settings;
pub mod tag;
pub mod task;
pub mod user;

use serde::Serialize;
use validator::ValidationError;

/// One page of a filtered list plus the total number of matching rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Rejects text with no non-whitespace content.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    match crm_core::validation::non_blank(Some(value)) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("blank")),
    }
}
