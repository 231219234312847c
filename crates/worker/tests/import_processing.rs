//! Integration tests for import processing and dispatch.
//!
//! Covers duplicate handling (skip / merge / create), per-row error
//! isolation, resumption after a partial attempt, concurrent workers on one
//! job, shutdown between rows, and dispatcher failure handling.

use std::sync::Arc;

use assert_matches::assert_matches;
use crm_core::importer::DuplicateHandling;
use crm_db::models::person::CreatePerson;
use crm_db::repositories::{CompanyRepo, ImportRepo, PersonRepo};
use crm_worker::config::DispatcherConfig;
use crm_worker::dispatcher::ImportDispatcher;
use crm_worker::processor::ImportProcessor;
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_company(pool: &PgPool) -> i64 {
    let (company, _) =
        CompanyRepo::create_with_owner(pool, "Acme", None, "owner@acme.test", "hash", "Ada", None)
            .await
            .unwrap();
    company.id
}

async fn existing_person(pool: &PgPool, company_id: i64) -> i64 {
    let input = CreatePerson {
        first_name: "Original".to_string(),
        last_name: Some("Name".to_string()),
        email: Some("dupe@example.com".to_string()),
        phone: Some("555-0100".to_string()),
        ..CreatePerson::default()
    };
    PersonRepo::create(pool, company_id, &input).await.unwrap().id
}

async fn run_import(
    pool: &PgPool,
    company_id: i64,
    handling: DuplicateHandling,
    rows: Vec<Value>,
) -> crm_db::models::import::ImportJob {
    let job = ImportRepo::create_job(
        pool,
        company_id,
        None,
        "people.csv",
        &json!({}),
        handling,
        &rows,
    )
    .await
    .unwrap();
    ImportProcessor::new(pool.clone()).process(&job).await.unwrap()
}

async fn people_count(pool: &PgPool, company_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM people WHERE company_id = $1")
        .bind(company_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn queued_job(
    pool: &PgPool,
    company_id: i64,
    rows: &[Value],
) -> crm_db::models::import::ImportJob {
    ImportRepo::create_job(
        pool,
        company_id,
        None,
        "people.csv",
        &json!({}),
        DuplicateHandling::Create,
        rows,
    )
    .await
    .unwrap()
}

fn fast_config() -> DispatcherConfig {
    DispatcherConfig {
        poll_interval: std::time::Duration::from_millis(10),
        lease_secs: 300,
        max_attempts: 3,
    }
}

// ---------------------------------------------------------------------------
// Duplicate handling
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn skip_leaves_the_existing_person_untouched(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let existing = existing_person(&pool, company_id).await;

    let job = run_import(
        &pool,
        company_id,
        DuplicateHandling::Skip,
        vec![json!({ "firstName": "Changed", "email": "DUPE@example.com" })],
    )
    .await;

    assert_eq!(job.status, "completed");
    assert_eq!(job.skipped_rows, 1);
    assert_eq!(job.success_rows, 0);
    assert_eq!(people_count(&pool, company_id).await, 1);

    let rows = ImportRepo::list_rows(&pool, job.id, None, None, None).await.unwrap();
    assert_eq!(rows[0].status, "skipped");
    assert_eq!(rows[0].person_id, Some(existing));

    let person = PersonRepo::find_by_id(&pool, company_id, existing)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(person.first_name, "Original");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn merge_updates_provided_fields_and_adds_tags(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let existing = existing_person(&pool, company_id).await;

    let job = run_import(
        &pool,
        company_id,
        DuplicateHandling::Merge,
        vec![json!({
            "firstName": "Merged",
            "email": "dupe@example.com",
            "jobTitle": "VP Sales",
            "tags": "vip; imported"
        })],
    )
    .await;

    assert_eq!(job.success_rows, 1);
    assert_eq!(people_count(&pool, company_id).await, 1);

    let person = PersonRepo::find_by_id(&pool, company_id, existing)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(person.first_name, "Merged");
    assert_eq!(person.last_name.as_deref(), Some("Name"));
    assert_eq!(person.phone.as_deref(), Some("555-0100"));
    assert_eq!(person.job_title.as_deref(), Some("VP Sales"));
    let tags: Vec<_> = person.tags.0.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tags, ["imported", "vip"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_inserts_a_second_person_with_the_same_email(pool: PgPool) {
    let company_id = new_company(&pool).await;
    existing_person(&pool, company_id).await;

    let job = run_import(
        &pool,
        company_id,
        DuplicateHandling::Create,
        vec![json!({ "email": "dupe@example.com" })],
    )
    .await;

    assert_eq!(job.success_rows, 1);
    assert_eq!(people_count(&pool, company_id).await, 2);

    let rows = ImportRepo::list_rows(&pool, job.id, None, None, None).await.unwrap();
    let created = PersonRepo::find_by_id(&pool, company_id, rows[0].person_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.first_name, "dupe");
}

// ---------------------------------------------------------------------------
// Row errors
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_rows_are_recorded_and_processing_continues(pool: PgPool) {
    let company_id = new_company(&pool).await;

    let job = run_import(
        &pool,
        company_id,
        DuplicateHandling::Skip,
        vec![
            json!({ "lastName": "NoNameNoEmail" }),
            json!({ "firstName": "Bad", "email": "not-an-email" }),
            json!({ "firstName": "Good", "email": "good@example.com" }),
        ],
    )
    .await;

    assert_eq!(job.status, "completed");
    assert_eq!(job.total_rows, 3);
    assert_eq!(job.processed_rows, 3);
    assert_eq!(job.error_rows, 2);
    assert_eq!(job.success_rows, 1);

    let errors = ImportRepo::list_rows(&pool, job.id, Some("error"), None, None)
        .await
        .unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(
        errors[0].error_message.as_deref(),
        Some("Row must include a first name or an email")
    );
    assert_matches!(errors[1].error_message.as_deref(), Some(m) if m.contains("not-an-email"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicates_within_one_file_are_skipped_after_the_first(pool: PgPool) {
    let company_id = new_company(&pool).await;

    let job = run_import(
        &pool,
        company_id,
        DuplicateHandling::Skip,
        vec![
            json!({ "firstName": "One", "email": "same@example.com" }),
            json!({ "firstName": "Two", "email": "same@example.com" }),
        ],
    )
    .await;

    assert_eq!(job.success_rows, 1);
    assert_eq!(job.skipped_rows, 1);
    assert_eq!(people_count(&pool, company_id).await, 1);
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn resumed_job_only_processes_pending_rows(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let job = ImportRepo::create_job(
        &pool,
        company_id,
        None,
        "people.csv",
        &json!({}),
        DuplicateHandling::Create,
        &[
            json!({ "firstName": "Done" }),
            json!({ "firstName": "Pending" }),
        ],
    )
    .await
    .unwrap();

    // Simulate a previous attempt that claimed the job, resolved the first
    // row and crashed, leaving its lease to expire.
    let claimed = ImportRepo::claim_next(&pool, 300, 3).await.unwrap().unwrap();
    assert_eq!(claimed.id, job.id);
    let rows = ImportRepo::pending_rows(&pool, job.id).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    ImportRepo::resolve_row(&mut conn, job.id, rows[0].id, "success", None, None)
        .await
        .unwrap();
    drop(conn);
    sqlx::query("UPDATE import_jobs SET claimed_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(job.id)
        .execute(&pool)
        .await
        .unwrap();

    let dispatcher = ImportDispatcher::new(pool.clone(), fast_config(), Arc::new(Notify::new()));
    assert_eq!(dispatcher.run_once().await.unwrap(), Some(job.id));
    assert_eq!(dispatcher.run_once().await.unwrap(), None);

    let done = ImportRepo::find_by_id(&pool, company_id, job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.status, "completed");
    assert_eq!(done.attempts, 2);
    assert_eq!(done.processed_rows, 2);
    assert_eq!(done.success_rows, 2);
    assert_eq!(people_count(&pool, company_id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn a_job_with_unknown_duplicate_handling_is_failed(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let job = ImportRepo::create_job(
        &pool,
        company_id,
        None,
        "people.csv",
        &json!({}),
        DuplicateHandling::Skip,
        &[json!({ "firstName": "Ann" })],
    )
    .await
    .unwrap();

    // Bypass the CHECK constraint to simulate a corrupted job row.
    sqlx::query("ALTER TABLE import_jobs DROP CONSTRAINT ck_import_jobs_duplicate_handling")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE import_jobs SET duplicate_handling = 'upsert' WHERE id = $1")
        .bind(job.id)
        .execute(&pool)
        .await
        .unwrap();

    let dispatcher = ImportDispatcher::new(pool.clone(), fast_config(), Arc::new(Notify::new()));
    dispatcher.run_once().await.unwrap();

    let failed = ImportRepo::find_by_id(&pool, company_id, job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status, "failed");
    assert!(failed.error_log.unwrap().contains("upsert"));
}

// ---------------------------------------------------------------------------
// Redelivery and shutdown
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn two_processors_on_one_job_apply_each_row_once(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let rows: Vec<Value> = (0..200)
        .map(|i| {
            json!({
                "firstName": format!("Person {i}"),
                "email": format!("p{i}@example.com"),
            })
        })
        .collect();
    let job = queued_job(&pool, company_id, &rows).await;

    // A lease expiry hands the same job to a second worker while the first
    // is still running.
    let first = ImportProcessor::new(pool.clone());
    let second = ImportProcessor::new(pool.clone());
    let (a, b) = tokio::join!(first.process(&job), second.process(&job));
    a.unwrap();
    b.unwrap();

    assert_eq!(people_count(&pool, company_id).await, 200);

    let done = ImportRepo::find_by_id(&pool, company_id, job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.status, "completed");
    assert_eq!(done.processed_rows, 200);
    assert_eq!(done.success_rows, 200);
    assert_eq!(done.error_rows, 0);

    let linked: i64 = sqlx::query_scalar(
        "SELECT COUNT(DISTINCT person_id) FROM import_rows WHERE import_job_id = $1",
    )
    .bind(job.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(linked, 200);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn a_row_resolved_elsewhere_is_not_applied_again(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let job = queued_job(&pool, company_id, &[json!({ "firstName": "Once" })]).await;

    // Another worker holds the row's lock mid-transaction.
    let rows = ImportRepo::pending_rows(&pool, job.id).await.unwrap();
    let mut other = pool.begin().await.unwrap();
    assert!(ImportRepo::lock_pending_row(&mut other, job.id, rows[0].id).await.unwrap());

    let seen = ImportProcessor::new(pool.clone()).process(&job).await.unwrap();
    assert_eq!(seen.status, "processing");
    assert_eq!(people_count(&pool, company_id).await, 0);

    ImportRepo::resolve_row(&mut other, job.id, rows[0].id, "success", None, None)
        .await
        .unwrap();
    other.commit().await.unwrap();

    let done = ImportProcessor::new(pool.clone()).process(&job).await.unwrap();
    assert_eq!(done.status, "completed");
    assert_eq!(done.success_rows, 1);
    assert_eq!(people_count(&pool, company_id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelled_dispatch_stops_before_the_next_row(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let job = queued_job(
        &pool,
        company_id,
        &[json!({ "firstName": "A" }), json!({ "firstName": "B" })],
    )
    .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let dispatcher = ImportDispatcher::new(pool.clone(), fast_config(), Arc::new(Notify::new()));
    assert_eq!(dispatcher.run_once_until(&cancel).await.unwrap(), Some(job.id));

    let interrupted = ImportRepo::find_by_id(&pool, company_id, job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(interrupted.status, "processing");
    assert_eq!(interrupted.processed_rows, 0);
    assert_eq!(people_count(&pool, company_id).await, 0);

    // The next holder of the job picks up every row.
    let done = ImportProcessor::new(pool.clone()).process(&interrupted).await.unwrap();
    assert_eq!(done.status, "completed");
    assert_eq!(done.success_rows, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn a_cancelled_dispatcher_returns_without_claiming(pool: PgPool) {
    let company_id = new_company(&pool).await;
    let job = queued_job(&pool, company_id, &[json!({ "firstName": "Left" })]).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let dispatcher = ImportDispatcher::new(pool.clone(), fast_config(), Arc::new(Notify::new()));
    tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher.run(cancel))
        .await
        .expect("dispatcher did not stop");

    let untouched = ImportRepo::find_by_id(&pool, company_id, job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.attempts, 0);
    assert_eq!(untouched.processed_rows, 0);
}
