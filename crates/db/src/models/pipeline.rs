//! Pipeline and stage models.

use crm_core::pipeline::{PipelineStats, StageSpec};
use crm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `pipelines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `deal_stages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: DbId,
    pub pipeline_id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub position: i32,
    pub is_won: bool,
    pub is_lost: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A stage with the deals currently sitting in it.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub id: DbId,
    pub pipeline_id: DbId,
    pub name: String,
    pub position: i32,
    pub is_won: bool,
    pub is_lost: bool,
    pub deal_count: i64,
    pub total_value: f64,
}

/// A stage in a create or update request.
///
/// `id` is only meaningful on update, where it selects an existing stage to
/// modify in place. `position` defaults to the stage's index in the list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInput {
    pub id: Option<DbId>,
    pub name: String,
    pub position: Option<i32>,
    #[serde(default)]
    pub is_won: bool,
    #[serde(default)]
    pub is_lost: bool,
}

/// Convert request stages to domain specs, filling default positions.
pub fn stage_specs(stages: &[StageInput]) -> Vec<StageSpec> {
    stages
        .iter()
        .enumerate()
        .map(|(index, s)| StageSpec {
            id: s.id,
            name: s.name.trim().to_string(),
            position: s.position.unwrap_or(index as i32),
            is_won: s.is_won,
            is_lost: s.is_lost,
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipeline {
    #[validate(
        length(min = 1, max = 200, message = "name must be 1-200 characters"),
        custom(function = "crate::models::not_blank", message = "name must not be blank")
    )]
    pub name: String,
    pub stages: Vec<StageInput>,
}

/// DTO for updating a pipeline. A present `stages` list is the complete
/// desired stage set.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePipeline {
    #[validate(
        length(min = 1, max = 200, message = "name must be 1-200 characters"),
        custom(function = "crate::models::not_blank", message = "name must not be blank")
    )]
    pub name: Option<String>,
    pub stages: Option<Vec<StageInput>>,
}

/// A pipeline with its stages ordered by position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineWithStages {
    #[serde(flatten)]
    pub pipeline: Pipeline,
    pub stages: Vec<Stage>,
}

/// Pipeline detail view: stages with deal aggregates plus pipeline stats.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDetail {
    #[serde(flatten)]
    pub pipeline: Pipeline,
    pub stages: Vec<StageSummary>,
    pub stats: PipelineStats,
}
