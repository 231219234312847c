//! Repository for the `deals` table.

use crm_core::activity::{DEAL_CREATED, STAGE_CHANGE};
use crm_core::pipeline::{DEAL_STATUS_LOST, DEAL_STATUS_OPEN, DEAL_STATUS_WON};
use crm_core::search::{
    clamp_limit, clamp_offset, ilike_pattern, resolve_sort_column, SortOrder, DEFAULT_LIST_LIMIT,
    MAX_LIST_LIMIT,
};
use crm_core::types::DbId;
use serde_json::json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use super::ActivityRepo;
use crate::models::activity::CreateActivity;
use crate::models::deal::{CreateDeal, DealTableParams, DealView};
use crate::models::Page;

/// Denormalized deal select. `value` is coalesced to 0 on every read path.
const VIEW_SELECT: &str = "SELECT d.id, d.company_id, d.title, \
    COALESCE(d.value, 0)::DOUBLE PRECISION AS value, d.expected_close_date, d.probability, \
    d.loss_reason, d.notes, d.assigned_to, d.stage_id, s.name AS stage_name, s.pipeline_id, \
    s.is_won, s.is_lost, \
    CASE WHEN s.is_won THEN 'won' WHEN s.is_lost THEN 'lost' ELSE 'open' END AS status, \
    d.person_id, p.first_name AS person_first_name, p.last_name AS person_last_name, \
    p.email AS person_email, d.created_at, d.updated_at \
    FROM deals d \
    JOIN deal_stages s ON s.id = d.stage_id \
    LEFT JOIN people p ON p.id = d.person_id";

/// `sortBy` values accepted by the table view. The first is the default.
const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "d.created_at"),
    ("title", "d.title"),
    ("value", "d.value"),
    ("expectedCloseDate", "d.expected_close_date"),
    ("probability", "d.probability"),
    ("updatedAt", "d.updated_at"),
];

pub struct DealRepo;

impl DealRepo {
    /// Insert a deal and record a `deal_created` activity in one transaction.
    ///
    /// The stage must already be verified to belong to the company.
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        user_id: Option<DbId>,
        input: &CreateDeal,
    ) -> Result<DealView, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id = Self::insert(&mut tx, company_id, user_id, input).await?;
        let deal = Self::find_in(&mut tx, company_id, id).await?;
        tx.commit().await?;
        deal.ok_or(sqlx::Error::RowNotFound)
    }

    /// Insert a deal plus its `deal_created` activity on an open connection.
    pub async fn insert(
        conn: &mut PgConnection,
        company_id: DbId,
        user_id: Option<DbId>,
        input: &CreateDeal,
    ) -> Result<DbId, sqlx::Error> {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO deals
                (company_id, person_id, stage_id, title, value, expected_close_date,
                 probability, notes, assigned_to)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 0), COALESCE($8, ''), $9)
             RETURNING id",
        )
        .bind(company_id)
        .bind(input.person_id)
        .bind(input.stage_id)
        .bind(input.title.trim())
        .bind(input.value)
        .bind(input.expected_close_date)
        .bind(input.probability)
        .bind(&input.notes)
        .bind(input.assigned_to)
        .fetch_one(&mut *conn)
        .await?;

        let activity = CreateActivity {
            person_id: input.person_id,
            deal_id: Some(id),
            user_id,
            subject: Some(format!("Deal created: {}", input.title.trim())),
            metadata: Some(json!({ "stageId": input.stage_id })),
            ..CreateActivity::new(DEAL_CREATED)
        };
        ActivityRepo::create(conn, company_id, &activity).await?;
        Ok(id)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<DealView>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::find_in(&mut conn, company_id, id).await
    }

    /// Board view: every deal of the company (optionally one pipeline),
    /// ordered by stage position then newest first.
    pub async fn list_board(
        pool: &PgPool,
        company_id: DbId,
        pipeline_id: Option<DbId>,
    ) -> Result<Vec<DealView>, sqlx::Error> {
        let query = format!(
            "{VIEW_SELECT}
             WHERE d.company_id = $1 AND ($2::BIGINT IS NULL OR s.pipeline_id = $2)
             ORDER BY s.position, d.created_at DESC, d.id DESC"
        );
        sqlx::query_as::<_, DealView>(&query)
            .bind(company_id)
            .bind(pipeline_id)
            .fetch_all(pool)
            .await
    }

    /// Table view: filtered, sorted, paginated.
    pub async fn list_table(
        pool: &PgPool,
        company_id: DbId,
        params: &DealTableParams,
    ) -> Result<Page<DealView>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM deals d JOIN deal_stages s ON s.id = d.stage_id",
        );
        push_table_filters(&mut count, company_id, params);
        let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

        let sort_column = resolve_sort_column(params.sort_by.as_deref(), SORT_COLUMNS);
        let sort_order = SortOrder::parse(params.sort_order.as_deref());

        let mut page = QueryBuilder::<Postgres>::new(VIEW_SELECT);
        push_table_filters(&mut page, company_id, params);
        page.push(format!(" ORDER BY {sort_column} {}, d.id DESC", sort_order.sql()));
        page.push(" LIMIT ")
            .push_bind(clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT));
        page.push(" OFFSET ").push_bind(clamp_offset(params.offset));

        let items = page.build_query_as::<DealView>().fetch_all(pool).await?;
        Ok(Page { items, total })
    }

    /// Move a deal to `stage_id`, setting `loss_reason` and `updated_at`
    /// only, and record a `stage_change` activity.
    ///
    /// Returns `None` if the deal does not exist in the company. The target
    /// stage must already be verified to belong to the company.
    pub async fn update_stage(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
        stage_id: DbId,
        loss_reason: Option<&str>,
        user_id: Option<DbId>,
    ) -> Result<Option<DealView>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let previous: Option<(DbId, Option<DbId>)> = sqlx::query_as(
            "SELECT stage_id, person_id FROM deals WHERE id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((from_stage_id, person_id)) = previous else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE deals SET stage_id = $3, loss_reason = $4, updated_at = NOW()
             WHERE id = $1 AND company_id = $2",
        )
        .bind(id)
        .bind(company_id)
        .bind(stage_id)
        .bind(loss_reason)
        .execute(&mut *tx)
        .await?;

        let activity = CreateActivity {
            person_id,
            deal_id: Some(id),
            user_id,
            metadata: Some(json!({ "fromStageId": from_stage_id, "toStageId": stage_id })),
            ..CreateActivity::new(STAGE_CHANGE)
        };
        ActivityRepo::create(&mut tx, company_id, &activity).await?;

        let deal = Self::find_in(&mut tx, company_id, id).await?;
        tx.commit().await?;
        Ok(deal)
    }

    async fn find_in(
        conn: &mut PgConnection,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<DealView>, sqlx::Error> {
        let query = format!("{VIEW_SELECT} WHERE d.id = $1 AND d.company_id = $2");
        sqlx::query_as::<_, DealView>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(conn)
            .await
    }
}

fn push_table_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    company_id: DbId,
    params: &DealTableParams,
) {
    qb.push(" WHERE d.company_id = ").push_bind(company_id);

    if let Some(pipeline_id) = params.pipeline_id {
        qb.push(" AND s.pipeline_id = ").push_bind(pipeline_id);
    }
    if let Some(stage_id) = params.stage_id {
        qb.push(" AND d.stage_id = ").push_bind(stage_id);
    }
    if let Some(person_id) = params.person_id {
        qb.push(" AND d.person_id = ").push_bind(person_id);
    }
    if let Some(assigned_to) = params.assigned_to {
        qb.push(" AND d.assigned_to = ").push_bind(assigned_to);
    }
    if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(" AND d.title ILIKE ").push_bind(ilike_pattern(search));
    }
    match params.status.as_deref() {
        Some(DEAL_STATUS_WON) => {
            qb.push(" AND s.is_won");
        }
        Some(DEAL_STATUS_LOST) => {
            qb.push(" AND s.is_lost");
        }
        Some(DEAL_STATUS_OPEN) => {
            qb.push(" AND NOT s.is_won AND NOT s.is_lost");
        }
        _ => {}
    }
}
