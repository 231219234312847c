//! Repository for the `pipelines` and `deal_stages` tables.
//!
//! Every multi-row write runs in a single transaction so a pipeline is never
//! observed with a partial stage list.

use std::collections::HashMap;

use crm_core::error::CoreError;
use crm_core::pipeline::{compute_stats, plan_stage_changes, StageSpec};
use crm_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::pipeline::{Pipeline, PipelineDetail, PipelineWithStages, Stage, StageSummary};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

const PIPELINE_COLUMNS: &str = "id, company_id, name, created_at, updated_at";

const STAGE_COLUMNS: &str =
    "id, pipeline_id, company_id, name, position, is_won, is_lost, created_at, updated_at";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of pipeline writes that are not plain database errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineWriteError {
    /// The requested stage list is invalid (unknown stage id, won+lost...).
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// Stages that would be deleted still hold deals.
    #[error("Stages {0:?} still hold deals")]
    StagesInUse(Vec<DbId>),

    /// The pipeline still holds deals and cannot be deleted.
    #[error("Pipeline still holds {0} deal(s)")]
    HasDeals(i64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Provides CRUD operations for pipelines and their stages.
pub struct PipelineRepo;

impl PipelineRepo {
    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a pipeline and its stages atomically.
    ///
    /// `stages` must already be validated.
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        name: &str,
        stages: &[StageSpec],
    ) -> Result<PipelineWithStages, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO pipelines (company_id, name) VALUES ($1, $2) RETURNING {PIPELINE_COLUMNS}"
        );
        let pipeline = sqlx::query_as::<_, Pipeline>(&query)
            .bind(company_id)
            .bind(name.trim())
            .fetch_one(&mut *tx)
            .await?;

        for stage in stages {
            Self::insert_stage(&mut tx, company_id, pipeline.id, stage).await?;
        }

        let stages = Self::stages_of(&mut tx, pipeline.id).await?;
        tx.commit().await?;

        tracing::debug!(pipeline_id = pipeline.id, stages = stages.len(), "Pipeline created");
        Ok(PipelineWithStages { pipeline, stages })
    }

    /// Rename a pipeline and/or reconcile its stages with `stages`.
    ///
    /// Stages with an id are updated in place, stages without one are
    /// inserted, and omitted stages are deleted if no deal references them.
    /// Returns `Ok(None)` when the pipeline does not exist in the company.
    pub async fn update(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
        name: Option<&str>,
        stages: Option<&[StageSpec]>,
    ) -> Result<Option<PipelineWithStages>, PipelineWriteError> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE pipelines SET name = COALESCE($3, name), updated_at = NOW()
             WHERE id = $1 AND company_id = $2
             RETURNING {PIPELINE_COLUMNS}"
        );
        let Some(pipeline) = sqlx::query_as::<_, Pipeline>(&query)
            .bind(id)
            .bind(company_id)
            .bind(name.map(str::trim))
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if let Some(requested) = stages {
            let existing_ids: Vec<DbId> = sqlx::query_scalar(
                "SELECT id FROM deal_stages WHERE pipeline_id = $1 ORDER BY id FOR UPDATE",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            let plan = plan_stage_changes(&existing_ids, requested)?;

            if !plan.deletes.is_empty() {
                let in_use: Vec<DbId> = sqlx::query_scalar(
                    "SELECT DISTINCT stage_id FROM deals WHERE stage_id = ANY($1) ORDER BY stage_id",
                )
                .bind(&plan.deletes)
                .fetch_all(&mut *tx)
                .await?;
                if !in_use.is_empty() {
                    return Err(PipelineWriteError::StagesInUse(in_use));
                }

                sqlx::query("DELETE FROM deal_stages WHERE id = ANY($1)")
                    .bind(&plan.deletes)
                    .execute(&mut *tx)
                    .await?;
            }

            for stage in &plan.updates {
                sqlx::query(
                    "UPDATE deal_stages SET name = $2, position = $3, is_won = $4, is_lost = $5
                     WHERE id = $1",
                )
                .bind(stage.id)
                .bind(&stage.name)
                .bind(stage.position)
                .bind(stage.is_won)
                .bind(stage.is_lost)
                .execute(&mut *tx)
                .await?;
            }

            for stage in &plan.inserts {
                Self::insert_stage(&mut tx, company_id, id, stage).await?;
            }

            tracing::debug!(
                pipeline_id = id,
                updated = plan.updates.len(),
                inserted = plan.inserts.len(),
                deleted = plan.deletes.len(),
                "Pipeline stages reconciled",
            );
        }

        let stages = Self::stages_of(&mut tx, id).await?;
        tx.commit().await?;
        Ok(Some(PipelineWithStages { pipeline, stages }))
    }

    /// Delete a pipeline and (by cascade) its stages.
    ///
    /// Fails with [`PipelineWriteError::HasDeals`] when any deal sits in one
    /// of its stages. Returns `false` if the pipeline does not exist.
    pub async fn delete(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<bool, PipelineWriteError> {
        let mut tx = pool.begin().await?;

        let exists: Option<DbId> = sqlx::query_scalar(
            "SELECT id FROM pipelines WHERE id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Ok(false);
        }

        let deal_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deals d JOIN deal_stages s ON s.id = d.stage_id
             WHERE s.pipeline_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if deal_count > 0 {
            return Err(PipelineWriteError::HasDeals(deal_count));
        }

        sqlx::query("DELETE FROM pipelines WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Pipeline with per-stage deal aggregates and overall statistics.
    pub async fn find_detail(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<PipelineDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE id = $1 AND company_id = $2"
        );
        let Some(pipeline) = sqlx::query_as::<_, Pipeline>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };

        let stages = sqlx::query_as::<_, StageSummary>(
            "SELECT s.id, s.pipeline_id, s.name, s.position, s.is_won, s.is_lost,
                    COUNT(d.id) AS deal_count,
                    COALESCE(SUM(COALESCE(d.value, 0)), 0)::DOUBLE PRECISION AS total_value
             FROM deal_stages s
             LEFT JOIN deals d ON d.stage_id = s.id
             WHERE s.pipeline_id = $1
             GROUP BY s.id
             ORDER BY s.position, s.id",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let total_deals = stages.iter().map(|s| s.deal_count).sum();
        let total_value = stages.iter().map(|s| s.total_value).sum();
        let won = stages.iter().filter(|s| s.is_won).map(|s| s.deal_count).sum();
        let lost = stages.iter().filter(|s| s.is_lost).map(|s| s.deal_count).sum();

        Ok(Some(PipelineDetail {
            pipeline,
            stats: compute_stats(total_deals, total_value, won, lost),
            stages,
        }))
    }

    /// List the company's pipelines, each with its ordered stages.
    pub async fn list(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<PipelineWithStages>, sqlx::Error> {
        let query = format!(
            "SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE company_id = $1 ORDER BY created_at, id"
        );
        let pipelines = sqlx::query_as::<_, Pipeline>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await?;

        let query = format!(
            "SELECT {STAGE_COLUMNS} FROM deal_stages WHERE company_id = $1 ORDER BY position, id"
        );
        let stages = sqlx::query_as::<_, Stage>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await?;

        let mut by_pipeline: HashMap<DbId, Vec<Stage>> = HashMap::new();
        for stage in stages {
            by_pipeline.entry(stage.pipeline_id).or_default().push(stage);
        }

        Ok(pipelines
            .into_iter()
            .map(|pipeline| {
                let stages = by_pipeline.remove(&pipeline.id).unwrap_or_default();
                PipelineWithStages { pipeline, stages }
            })
            .collect())
    }

    /// Find a stage by id within a company.
    pub async fn find_stage(
        pool: &PgPool,
        company_id: DbId,
        stage_id: DbId,
    ) -> Result<Option<Stage>, sqlx::Error> {
        let query =
            format!("SELECT {STAGE_COLUMNS} FROM deal_stages WHERE id = $1 AND company_id = $2");
        sqlx::query_as::<_, Stage>(&query)
            .bind(stage_id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a stage by pipeline and stage name (case-insensitive).
    pub async fn find_stage_by_names(
        conn: &mut PgConnection,
        company_id: DbId,
        pipeline_name: &str,
        stage_name: &str,
    ) -> Result<Option<Stage>, sqlx::Error> {
        sqlx::query_as::<_, Stage>(
            "SELECT s.id, s.pipeline_id, s.company_id, s.name, s.position, s.is_won, s.is_lost,
                    s.created_at, s.updated_at
             FROM deal_stages s
             JOIN pipelines p ON p.id = s.pipeline_id
             WHERE s.company_id = $1 AND lower(p.name) = lower($2) AND lower(s.name) = lower($3)
             ORDER BY p.id, s.position
             LIMIT 1",
        )
        .bind(company_id)
        .bind(pipeline_name)
        .bind(stage_name)
        .fetch_optional(conn)
        .await
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn insert_stage(
        conn: &mut PgConnection,
        company_id: DbId,
        pipeline_id: DbId,
        stage: &StageSpec,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO deal_stages (pipeline_id, company_id, name, position, is_won, is_lost)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(pipeline_id)
        .bind(company_id)
        .bind(&stage.name)
        .bind(stage.position)
        .bind(stage.is_won)
        .bind(stage.is_lost)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn stages_of(
        conn: &mut PgConnection,
        pipeline_id: DbId,
    ) -> Result<Vec<Stage>, sqlx::Error> {
        let query = format!(
            "SELECT {STAGE_COLUMNS} FROM deal_stages WHERE pipeline_id = $1 ORDER BY position, id"
        );
        sqlx::query_as::<_, Stage>(&query)
            .bind(pipeline_id)
            .fetch_all(conn)
            .await
    }
}
