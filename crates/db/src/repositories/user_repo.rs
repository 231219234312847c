//! Repository for the `users` table.

use crm_core::roles::ROLE_MEMBER;
use crm_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::User;

pub(crate) const COLUMNS: &str = "id, company_id, email, password_hash, first_name, last_name, \
    role, is_active, created_at, updated_at";

/// Provides lookups for users.
pub struct UserRepo;

impl UserRepo {
    /// Add a `member` user to a company. `password_hash` is already hashed.
    pub async fn create_member(
        pool: &PgPool,
        company_id: DbId,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (company_id, email, password_hash, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(company_id)
            .bind(email)
            .bind(password_hash)
            .bind(first_name)
            .bind(last_name)
            .bind(ROLE_MEMBER)
            .fetch_one(pool)
            .await
    }

    /// Find a user by email, case-insensitively. Used by login.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND company_id = $2");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// List the company's users ordered by name.
    pub async fn list(pool: &PgPool, company_id: DbId) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE company_id = $1 ORDER BY first_name, last_name, id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    /// Whether `user_id` is a member of `company_id`.
    pub async fn belongs_to_company(
        pool: &PgPool,
        company_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND company_id = $2)",
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_one(pool)
        .await
    }
}
