//! Pipeline and stage rules: stage validation, stage-set diffing, and the
//! aggregate statistics shown on the pipeline detail view.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

/// Deal status derived from the flags of the stage it sits in.
pub const DEAL_STATUS_OPEN: &str = "open";
pub const DEAL_STATUS_WON: &str = "won";
pub const DEAL_STATUS_LOST: &str = "lost";

/// Derive a deal's status from its stage flags.
pub fn deal_status(is_won: bool, is_lost: bool) -> &'static str {
    if is_won {
        DEAL_STATUS_WON
    } else if is_lost {
        DEAL_STATUS_LOST
    } else {
        DEAL_STATUS_OPEN
    }
}

/// Check whether `status` is one of the derived deal statuses.
pub fn is_valid_deal_status(status: &str) -> bool {
    matches!(
        status,
        DEAL_STATUS_OPEN | DEAL_STATUS_WON | DEAL_STATUS_LOST
    )
}

// ---------------------------------------------------------------------------
// Stage validation
// ---------------------------------------------------------------------------

/// Minimal view of a requested stage, independent of the DTO it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub id: Option<DbId>,
    pub name: String,
    pub position: i32,
    pub is_won: bool,
    pub is_lost: bool,
}

/// Validate a full requested stage list.
///
/// Rejects an empty list, blank names, stages flagged both won and lost, and
/// the same stage id appearing twice.
pub fn validate_stages(stages: &[StageSpec]) -> Result<(), CoreError> {
    if stages.is_empty() {
        return Err(CoreError::Validation(
            "A pipeline needs at least one stage".into(),
        ));
    }

    let mut seen = HashSet::new();
    for stage in stages {
        if stage.name.trim().is_empty() {
            return Err(CoreError::Validation("Stage name must not be empty".into()));
        }
        if stage.is_won && stage.is_lost {
            return Err(CoreError::Validation(format!(
                "Stage '{}' cannot be both won and lost",
                stage.name.trim()
            )));
        }
        if let Some(id) = stage.id {
            if !seen.insert(id) {
                return Err(CoreError::Validation(format!(
                    "Stage id {id} appears more than once"
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Stage diffing
// ---------------------------------------------------------------------------

/// The result of comparing a pipeline's current stages with a requested list.
#[derive(Debug, Default, PartialEq)]
pub struct StagePlan {
    /// Requested stages that carry an existing id: update in place.
    pub updates: Vec<StageSpec>,
    /// Requested stages without an id: insert.
    pub inserts: Vec<StageSpec>,
    /// Existing stage ids absent from the request: delete (if unused).
    pub deletes: Vec<DbId>,
}

/// Diff the existing stage ids of a pipeline against the requested stages.
///
/// Updating in place keeps stage ids stable, so deals keep pointing at the
/// same stage across a rename or reorder. Returns a validation error when a
/// requested id does not belong to the pipeline.
pub fn plan_stage_changes(
    existing_ids: &[DbId],
    requested: &[StageSpec],
) -> Result<StagePlan, CoreError> {
    validate_stages(requested)?;

    let existing: HashSet<DbId> = existing_ids.iter().copied().collect();
    let mut plan = StagePlan::default();
    let mut kept = HashSet::new();

    for stage in requested {
        match stage.id {
            Some(id) if existing.contains(&id) => {
                kept.insert(id);
                plan.updates.push(stage.clone());
            }
            Some(id) => {
                return Err(CoreError::Validation(format!(
                    "Stage {id} does not belong to this pipeline"
                )));
            }
            None => plan.inserts.push(stage.clone()),
        }
    }

    plan.deletes = existing_ids
        .iter()
        .copied()
        .filter(|id| !kept.contains(id))
        .collect();

    Ok(plan)
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Aggregate deal statistics for a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub total_deals: i64,
    pub total_value: f64,
    pub average_deal_value: f64,
    pub won_deals: i64,
    pub lost_deals: i64,
    pub closed_deals: i64,
    pub win_rate: f64,
}

/// Compute pipeline statistics from raw counts.
///
/// `average_deal_value` is 0 without deals and `win_rate` is 0 without closed
/// deals, so neither ever divides by zero.
pub fn compute_stats(total_deals: i64, total_value: f64, won: i64, lost: i64) -> PipelineStats {
    let closed = won + lost;
    let average_deal_value = if total_deals > 0 {
        total_value / total_deals as f64
    } else {
        0.0
    };
    let win_rate = if closed > 0 {
        won as f64 / closed as f64 * 100.0
    } else {
        0.0
    };

    PipelineStats {
        total_deals,
        total_value,
        average_deal_value,
        won_deals: won,
        lost_deals: lost,
        closed_deals: closed,
        win_rate,
    }
}
