//! Repository for the `tags` table.

use crm_core::types::DbId;
use sqlx::PgPool;

use crate::models::tag::{CreateTag, Tag, TagWithCount};

const COLUMNS: &str = "id, company_id, name, color, created_at";

pub struct TagRepo;

impl TagRepo {
    /// Insert a tag. A case-insensitive duplicate name within the company
    /// violates `uq_tags_company_name`.
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        input: &CreateTag,
    ) -> Result<Tag, sqlx::Error> {
        let query = format!(
            "INSERT INTO tags (company_id, name, color) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tag>(&query)
            .bind(company_id)
            .bind(input.name.trim())
            .bind(&input.color)
            .fetch_one(pool)
            .await
    }

    /// List the company's tags with the number of people carrying each.
    pub async fn list_with_counts(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<TagWithCount>, sqlx::Error> {
        sqlx::query_as::<_, TagWithCount>(
            "SELECT t.id, t.name, t.color, t.created_at, COUNT(pt.person_id) AS person_count
             FROM tags t
             LEFT JOIN person_tags pt ON pt.tag_id = t.id
             WHERE t.company_id = $1
             GROUP BY t.id
             ORDER BY t.name",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    /// Whether every id in `tag_ids` is a tag of the company.
    pub async fn all_owned(
        pool: &PgPool,
        company_id: DbId,
        tag_ids: &[DbId],
    ) -> Result<bool, sqlx::Error> {
        if tag_ids.is_empty() {
            return Ok(true);
        }
        let owned: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT id) FROM tags WHERE company_id = $1 AND id = ANY($2)",
        )
        .bind(company_id)
        .bind(tag_ids)
        .fetch_one(pool)
        .await?;

        let mut distinct = tag_ids.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        Ok(owned == distinct.len() as i64)
    }
}
