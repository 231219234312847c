//! Repository for the `companies` table.

use crm_core::roles::ROLE_OWNER;
use crm_core::types::DbId;
use sqlx::PgPool;

use crate::models::company::{Company, UpdateCompany};
use crate::models::user::User;

const COLUMNS: &str = "id, name, domain, created_at, updated_at";

/// Provides CRUD operations for companies.
pub struct CompanyRepo;

impl CompanyRepo {
    /// Insert a company and its owner user in one transaction.
    ///
    /// `password_hash` is already hashed by the caller. A duplicate owner
    /// email surfaces as a unique violation on `uq_users_email`.
    pub async fn create_with_owner(
        pool: &PgPool,
        name: &str,
        domain: Option<&str>,
        owner_email: &str,
        password_hash: &str,
        owner_first_name: &str,
        owner_last_name: Option<&str>,
    ) -> Result<(Company, User), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO companies (name, domain) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let company = sqlx::query_as::<_, Company>(&query)
            .bind(name)
            .bind(domain)
            .fetch_one(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO users (company_id, email, password_hash, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            super::user_repo::COLUMNS
        );
        let owner = sqlx::query_as::<_, User>(&query)
            .bind(company.id)
            .bind(owner_email)
            .bind(password_hash)
            .bind(owner_first_name)
            .bind(owner_last_name)
            .bind(ROLE_OWNER)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((company, owner))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Company>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM companies WHERE id = $1");
        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update a company. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, sqlx::Error> {
        let query = format!(
            "UPDATE companies SET
                name = COALESCE($2, name),
                domain = COALESCE($3, domain)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.domain)
            .fetch_optional(pool)
            .await
    }
}
