//! Repository for the `people` and `person_tags` tables.

use crm_core::importer::ImportRecord;
use crm_core::search::{
    clamp_limit, clamp_offset, ilike_pattern, parse_id_list, resolve_sort_column, SortOrder,
    DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
use crm_core::types::DbId;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::person::{CreatePerson, Person, PersonListParams, PersonWithTags, UpdatePerson};
use crate::models::Page;

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

const COLUMNS: &str = "id, company_id, first_name, last_name, email, phone, job_title, status, \
    assigned_to, last_contacted_at, created_at, updated_at";

/// Person columns plus the aggregated tag list, selected from `people p`.
const WITH_TAGS_COLUMNS: &str = "p.id, p.company_id, p.first_name, p.last_name, p.email, \
    p.phone, p.job_title, p.status, p.assigned_to, p.last_contacted_at, p.created_at, \
    p.updated_at, \
    COALESCE((SELECT json_agg(json_build_object('id', t.id, 'name', t.name, 'color', t.color) \
                              ORDER BY t.name) \
              FROM person_tags pt JOIN tags t ON t.id = pt.tag_id \
              WHERE pt.person_id = p.id), '[]'::json) AS tags";

/// `sortBy` values accepted by [`PersonRepo::list`]. The first is the default.
const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "p.created_at"),
    ("firstName", "p.first_name"),
    ("lastName", "p.last_name"),
    ("email", "p.email"),
    ("lastContactedAt", "p.last_contacted_at"),
    ("status", "p.status"),
];

/// Default status for people created without one.
const DEFAULT_STATUS: &str = "lead";

/// Provides CRUD, filtering, and bulk operations for people.
pub struct PersonRepo;

impl PersonRepo {
    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    /// Insert a person and attach the given tags in one transaction.
    ///
    /// Tag ids not owned by the company are ignored.
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        input: &CreatePerson,
    ) -> Result<PersonWithTags, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO people
                (company_id, first_name, last_name, email, phone, job_title, status, assigned_to)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, '{DEFAULT_STATUS}'), $8)
             RETURNING {COLUMNS}"
        );
        let person = sqlx::query_as::<_, Person>(&query)
            .bind(company_id)
            .bind(input.first_name.trim())
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.job_title)
            .bind(&input.status)
            .bind(input.assigned_to)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(tag_ids) = &input.tag_ids {
            Self::add_tags(&mut tx, company_id, &[person.id], tag_ids).await?;
        }

        let created = Self::find_with_tags(&mut tx, company_id, person.id).await?;
        tx.commit().await?;
        created.ok_or(sqlx::Error::RowNotFound)
    }

    /// Find a person (with tags) by id within a company.
    pub async fn find_by_id(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<PersonWithTags>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::find_with_tags(&mut conn, company_id, id).await
    }

    /// Filtered, sorted, paginated listing.
    ///
    /// All filters combine with AND; `tagIds` matches people carrying at
    /// least one of the ids. NULLs sort last in both directions.
    pub async fn list(
        pool: &PgPool,
        company_id: DbId,
        params: &PersonListParams,
    ) -> Result<Page<PersonWithTags>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM people p");
        push_list_filters(&mut count, company_id, params);
        let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

        let sort_column = resolve_sort_column(params.sort_by.as_deref(), SORT_COLUMNS);
        let sort_order = SortOrder::parse(params.sort_order.as_deref());

        let mut page = QueryBuilder::<Postgres>::new(format!(
            "SELECT {WITH_TAGS_COLUMNS} FROM people p"
        ));
        push_list_filters(&mut page, company_id, params);
        page.push(format!(" ORDER BY {sort_column} {}, p.id DESC", sort_order.sql()));
        page.push(" LIMIT ")
            .push_bind(clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT));
        page.push(" OFFSET ")
            .push_bind(clamp_offset(params.offset));

        let items = page
            .build_query_as::<PersonWithTags>()
            .fetch_all(pool)
            .await?;

        Ok(Page { items, total })
    }

    /// Update a person. Only non-`None` fields are applied; `tag_ids`, when
    /// present, replaces the tag set. Returns `None` if no such person.
    pub async fn update(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
        input: &UpdatePerson,
    ) -> Result<Option<PersonWithTags>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE people SET
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                job_title = COALESCE($7, job_title),
                status = COALESCE($8, status),
                assigned_to = COALESCE($9, assigned_to)
             WHERE id = $1 AND company_id = $2
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Person>(&query)
            .bind(id)
            .bind(company_id)
            .bind(input.first_name.as_deref().map(str::trim))
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.job_title)
            .bind(&input.status)
            .bind(input.assigned_to)
            .fetch_optional(&mut *tx)
            .await?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(tag_ids) = &input.tag_ids {
            sqlx::query("DELETE FROM person_tags WHERE person_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::add_tags(&mut tx, company_id, &[id], tag_ids).await?;
        }

        let person = Self::find_with_tags(&mut tx, company_id, id).await?;
        tx.commit().await?;
        Ok(person)
    }

    /// Delete a person. Tag links cascade; deals, tasks, and activities keep
    /// their rows with the person reference nulled.
    pub async fn delete(pool: &PgPool, company_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM people WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Bulk operations
    // -----------------------------------------------------------------------

    /// Set (or clear) the owner of several people. Returns the rows updated.
    pub async fn assign_owner(
        pool: &PgPool,
        company_id: DbId,
        person_ids: &[DbId],
        assigned_to: Option<DbId>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE people SET assigned_to = $3 WHERE company_id = $1 AND id = ANY($2)",
        )
        .bind(company_id)
        .bind(person_ids)
        .bind(assigned_to)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Add and remove tags across several people in one transaction.
    ///
    /// Adding is idempotent. Returns the number of people in scope.
    pub async fn bulk_tag_update(
        pool: &PgPool,
        company_id: DbId,
        person_ids: &[DbId],
        add_tag_ids: &[DbId],
        remove_tag_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let owned: Vec<DbId> =
            sqlx::query_scalar("SELECT id FROM people WHERE company_id = $1 AND id = ANY($2)")
                .bind(company_id)
                .bind(person_ids)
                .fetch_all(&mut *tx)
                .await?;

        if !remove_tag_ids.is_empty() {
            sqlx::query("DELETE FROM person_tags WHERE person_id = ANY($1) AND tag_id = ANY($2)")
                .bind(&owned)
                .bind(remove_tag_ids)
                .execute(&mut *tx)
                .await?;
        }
        if !add_tag_ids.is_empty() {
            Self::add_tags(&mut tx, company_id, &owned, add_tag_ids).await?;
        }

        tx.commit().await?;
        Ok(owned.len() as u64)
    }

    // -----------------------------------------------------------------------
    // Connection-level helpers (run inside a caller's transaction)
    // -----------------------------------------------------------------------

    /// Find the oldest person in the company with `email` (case-insensitive).
    pub async fn find_by_email(
        conn: &mut PgConnection,
        company_id: DbId,
        email: &str,
    ) -> Result<Option<Person>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM people
             WHERE company_id = $1 AND lower(email) = lower($2)
             ORDER BY id
             LIMIT 1"
        );
        sqlx::query_as::<_, Person>(&query)
            .bind(company_id)
            .bind(email)
            .fetch_optional(conn)
            .await
    }

    /// Insert a person from an import record and attach its tags by name.
    pub async fn insert_record(
        conn: &mut PgConnection,
        company_id: DbId,
        record: &ImportRecord,
    ) -> Result<Person, sqlx::Error> {
        let query = format!(
            "INSERT INTO people (company_id, first_name, last_name, email, phone, job_title, status)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, '{DEFAULT_STATUS}'))
             RETURNING {COLUMNS}"
        );
        let person = sqlx::query_as::<_, Person>(&query)
            .bind(company_id)
            .bind(record.first_name_or_fallback())
            .bind(&record.last_name)
            .bind(&record.email)
            .bind(&record.phone)
            .bind(&record.job_title)
            .bind(&record.status)
            .fetch_one(&mut *conn)
            .await?;

        Self::attach_tags_by_name(conn, company_id, person.id, &record.tags).await?;
        Ok(person)
    }

    /// Overwrite an existing person's fields with the record's provided
    /// values and attach its tags by name.
    pub async fn merge_record(
        conn: &mut PgConnection,
        company_id: DbId,
        id: DbId,
        record: &ImportRecord,
    ) -> Result<Person, sqlx::Error> {
        let query = format!(
            "UPDATE people SET
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                phone = COALESCE($5, phone),
                job_title = COALESCE($6, job_title),
                status = COALESCE($7, status)
             WHERE id = $1 AND company_id = $2
             RETURNING {COLUMNS}"
        );
        let person = sqlx::query_as::<_, Person>(&query)
            .bind(id)
            .bind(company_id)
            .bind(&record.first_name)
            .bind(&record.last_name)
            .bind(&record.phone)
            .bind(&record.job_title)
            .bind(&record.status)
            .fetch_one(&mut *conn)
            .await?;

        Self::attach_tags_by_name(conn, company_id, person.id, &record.tags).await?;
        Ok(person)
    }

    /// Find a person by email or create a minimal one. Returns the person and
    /// whether it was created.
    pub async fn find_or_create_by_email(
        conn: &mut PgConnection,
        company_id: DbId,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(Person, bool), sqlx::Error> {
        if let Some(existing) = Self::find_by_email(&mut *conn, company_id, email).await? {
            return Ok((existing, false));
        }

        let record = ImportRecord {
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            email: Some(email.to_string()),
            phone: phone.map(str::to_string),
            ..ImportRecord::default()
        };
        let person = Self::insert_record(conn, company_id, &record).await?;
        Ok((person, true))
    }

    /// Stamp `last_contacted_at` with the current time.
    pub async fn touch_last_contacted(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE people SET last_contacted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn find_with_tags(
        conn: &mut PgConnection,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<PersonWithTags>, sqlx::Error> {
        let query = format!(
            "SELECT {WITH_TAGS_COLUMNS} FROM people p WHERE p.id = $1 AND p.company_id = $2"
        );
        sqlx::query_as::<_, PersonWithTags>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(conn)
            .await
    }

    /// Link every person in `person_ids` to every company-owned tag in
    /// `tag_ids`. Existing links are left alone.
    async fn add_tags(
        conn: &mut PgConnection,
        company_id: DbId,
        person_ids: &[DbId],
        tag_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO person_tags (person_id, tag_id)
             SELECT p.id, t.id
             FROM unnest($1::BIGINT[]) AS p(id)
             CROSS JOIN tags t
             WHERE t.company_id = $2 AND t.id = ANY($3)
             ON CONFLICT DO NOTHING",
        )
        .bind(person_ids)
        .bind(company_id)
        .bind(tag_ids)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Attach tags by name, creating missing tags for the company.
    async fn attach_tags_by_name(
        conn: &mut PgConnection,
        company_id: DbId,
        person_id: DbId,
        names: &[String],
    ) -> Result<(), sqlx::Error> {
        for name in names {
            let tag_id: DbId = sqlx::query_scalar(
                "WITH inserted AS (
                    INSERT INTO tags (company_id, name) VALUES ($1, $2)
                    ON CONFLICT (company_id, lower(name)) DO NOTHING
                    RETURNING id
                 )
                 SELECT id FROM inserted
                 UNION ALL
                 SELECT id FROM tags WHERE company_id = $1 AND lower(name) = lower($2)
                 LIMIT 1",
            )
            .bind(company_id)
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

            sqlx::query(
                "INSERT INTO person_tags (person_id, tag_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(person_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

/// Append the `WHERE` clause shared by the count and page queries.
fn push_list_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    company_id: DbId,
    params: &PersonListParams,
) {
    qb.push(" WHERE p.company_id = ").push_bind(company_id);

    if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = ilike_pattern(search);
        qb.push(" AND (p.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR (p.first_name || ' ' || COALESCE(p.last_name, '')) ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    let tag_ids = parse_id_list(params.tag_ids.as_deref());
    if !tag_ids.is_empty() {
        qb.push(" AND EXISTS (SELECT 1 FROM person_tags pt WHERE pt.person_id = p.id AND pt.tag_id = ANY(")
            .push_bind(tag_ids)
            .push("))");
    }

    if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND p.status = ").push_bind(status.to_string());
    }

    if let Some(assigned_to) = params.assigned_to {
        qb.push(" AND p.assigned_to = ").push_bind(assigned_to);
    }
}
