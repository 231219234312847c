//! Integration tests for the import job queue: creation, claiming, leases.

use crm_core::importer::DuplicateHandling;
use crm_db::repositories::{CompanyRepo, ImportRepo};
use serde_json::json;
use sqlx::PgPool;

async fn new_company(pool: &PgPool) -> i64 {
    let (company, _) =
        CompanyRepo::create_with_owner(pool, "Acme", None, "owner@acme.test", "hash", "Ada", None)
            .await
            .unwrap();
    company.id
}

async fn new_job(pool: &PgPool, company_id: i64, rows: usize) -> i64 {
    let rows: Vec<_> = (0..rows)
        .map(|i| json!({ "email": format!("p{i}@example.com") }))
        .collect();
    ImportRepo::create_job(
        pool,
        company_id,
        None,
        "people.csv",
        &json!({ "0": "email" }),
        DuplicateHandling::Skip,
        &rows,
    )
    .await
    .unwrap()
    .id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_job_inserts_numbered_pending_rows(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let job_id = new_job(&pool, company_id, 3).await;

    let job = ImportRepo::find_by_id(&pool, company_id, job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, "processing");
    assert_eq!(job.total_rows, 3);

    let rows = ImportRepo::pending_rows(&pool, job_id).await.unwrap();
    let numbers: Vec<_> = rows.iter().map(|r| r.row_number).collect();
    assert_eq!(numbers, [1, 2, 3]);
    assert_eq!(rows[0].raw_data["email"], "p0@example.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn a_claimed_job_is_not_claimed_again_within_its_lease(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let job_id = new_job(&pool, company_id, 1).await;

    let first = ImportRepo::claim_next(&pool, 300, 3).await.unwrap().unwrap();
    assert_eq!(first.id, job_id);
    assert_eq!(first.attempts, 1);
    assert!(first.claimed_at.is_some());

    assert!(ImportRepo::claim_next(&pool, 300, 3).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn an_expired_lease_is_reclaimed_until_attempts_run_out(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let job_id = new_job(&pool, company_id, 1).await;

    for attempt in 1..=2 {
        let job = ImportRepo::claim_next(&pool, 300, 2).await.unwrap().unwrap();
        assert_eq!(job.attempts, attempt);
        sqlx::query("UPDATE import_jobs SET claimed_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
            .bind(job_id)
            .execute(&pool)
            .await
            .unwrap();
    }

    assert!(ImportRepo::claim_next(&pool, 300, 2).await.unwrap().is_none());

    let failed = ImportRepo::fail_exhausted(&pool, 300, 2).await.unwrap();
    assert_eq!(failed, vec![job_id]);
    let job = ImportRepo::find_by_id(&pool, company_id, job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, "failed");
    assert!(job.error_log.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn resolving_a_row_twice_counts_it_once(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let job_id = new_job(&pool, company_id, 2).await;
    let rows = ImportRepo::pending_rows(&pool, job_id).await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    assert!(ImportRepo::resolve_row(&mut conn, job_id, rows[0].id, "error", None, Some("bad"))
        .await
        .unwrap());
    assert!(!ImportRepo::resolve_row(&mut conn, job_id, rows[0].id, "success", None, None)
        .await
        .unwrap());
    drop(conn);

    let job = ImportRepo::find_by_id(&pool, company_id, job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.processed_rows, 1);
    assert_eq!(job.error_rows, 1);
    assert_eq!(job.success_rows, 0);

    let errors = ImportRepo::list_rows(&pool, job_id, Some("error"), None, None)
        .await
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_message.as_deref(), Some("bad"));
}
