//! Repository for the `tasks` table.

use crm_core::types::DbId;
use sqlx::PgPool;

use crate::models::task::{CreateTask, Task, TaskListParams, UpdateTask};

const COLUMNS: &str = "id, company_id, title, description, due_date, priority, completed, \
    completed_at, person_id, deal_id, assigned_to, created_by, created_at, updated_at";

pub struct TaskRepo;

impl TaskRepo {
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        created_by: DbId,
        input: &CreateTask,
    ) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks
                (company_id, title, description, due_date, priority, person_id, deal_id,
                 assigned_to, created_by)
             VALUES ($1, $2, $3, $4, COALESCE($5, 'medium'), $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(company_id)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(input.due_date)
            .bind(&input.priority)
            .bind(input.person_id)
            .bind(input.deal_id)
            .bind(input.assigned_to)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1 AND company_id = $2");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// List tasks, open ones first, then by due date (undated last).
    pub async fn list(
        pool: &PgPool,
        company_id: DbId,
        params: &TaskListParams,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks
             WHERE company_id = $1
               AND ($2::BOOLEAN IS NULL OR completed = $2)
               AND ($3::BIGINT IS NULL OR assigned_to = $3)
               AND ($4::BIGINT IS NULL OR person_id = $4)
               AND ($5::BIGINT IS NULL OR deal_id = $5)
             ORDER BY completed, due_date ASC NULLS LAST, id DESC"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(company_id)
            .bind(params.completed)
            .bind(params.assigned_to)
            .bind(params.person_id)
            .bind(params.deal_id)
            .fetch_all(pool)
            .await
    }

    /// Update a task. Only non-`None` fields are applied. Completing a task
    /// stamps `completed_at`; reopening clears it.
    pub async fn update(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
        input: &UpdateTask,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                due_date = COALESCE($5, due_date),
                priority = COALESCE($6, priority),
                completed = COALESCE($7, completed),
                completed_at = CASE
                    WHEN $7 IS TRUE AND NOT completed THEN NOW()
                    WHEN $7 IS FALSE THEN NULL
                    ELSE completed_at
                END,
                person_id = COALESCE($8, person_id),
                deal_id = COALESCE($9, deal_id),
                assigned_to = COALESCE($10, assigned_to)
             WHERE id = $1 AND company_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(company_id)
            .bind(input.title.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.due_date)
            .bind(&input.priority)
            .bind(input.completed)
            .bind(input.person_id)
            .bind(input.deal_id)
            .bind(input.assigned_to)
            .fetch_optional(pool)
            .await
    }
}
