//! Integration tests for people listing, tagging, and bulk operations.

use crm_db::models::person::{CreatePerson, PersonListParams, UpdatePerson};
use crm_db::models::tag::CreateTag;
use crm_db::repositories::{CompanyRepo, PersonRepo, TagRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_company(pool: &PgPool, email: &str) -> (i64, i64) {
    let (company, owner) =
        CompanyRepo::create_with_owner(pool, "Acme", None, email, "hash", "Ada", None)
            .await
            .unwrap();
    (company.id, owner.id)
}

fn person(first: &str, last: Option<&str>, email: Option<&str>) -> CreatePerson {
    CreatePerson {
        first_name: first.to_string(),
        last_name: last.map(str::to_string),
        email: email.map(str::to_string),
        ..CreatePerson::default()
    }
}

async fn tag(pool: &PgPool, company_id: i64, name: &str) -> i64 {
    TagRepo::create(
        pool,
        company_id,
        &CreateTag {
            name: name.to_string(),
            color: None,
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn search_matches_names_full_name_and_email(pool: PgPool) {
    let (company_id, _) = new_company(&pool, "owner@acme.test").await;
    PersonRepo::create(&pool, company_id, &person("Grace", Some("Hopper"), Some("grace@navy.mil")))
        .await
        .unwrap();
    PersonRepo::create(&pool, company_id, &person("Alan", Some("Turing"), Some("alan@bletchley.uk")))
        .await
        .unwrap();

    let by = |search: &str| PersonListParams {
        search: Some(search.to_string()),
        ..PersonListParams::default()
    };

    let page = PersonRepo::list(&pool, company_id, &by("grace hop")).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].first_name, "Grace");

    let page = PersonRepo::list(&pool, company_id, &by("BLETCHLEY")).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].first_name, "Alan");

    let page = PersonRepo::list(&pool, company_id, &by("%")).await.unwrap();
    assert_eq!(page.total, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn tag_filter_matches_any_listed_tag(pool: PgPool) {
    let (company_id, _) = new_company(&pool, "owner@acme.test").await;
    let vip = tag(&pool, company_id, "VIP").await;
    let partner = tag(&pool, company_id, "Partner").await;

    let with_vip = CreatePerson {
        tag_ids: Some(vec![vip]),
        ..person("Vera", None, None)
    };
    let with_partner = CreatePerson {
        tag_ids: Some(vec![partner]),
        ..person("Pat", None, None)
    };
    PersonRepo::create(&pool, company_id, &with_vip).await.unwrap();
    PersonRepo::create(&pool, company_id, &with_partner).await.unwrap();
    PersonRepo::create(&pool, company_id, &person("Nobody", None, None))
        .await
        .unwrap();

    let params = PersonListParams {
        tag_ids: Some(format!("{vip},{partner}")),
        ..PersonListParams::default()
    };
    let page = PersonRepo::list(&pool, company_id, &params).await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|p| p.tags.0.len() == 1));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sorting_puts_nulls_last_and_paginates(pool: PgPool) {
    let (company_id, _) = new_company(&pool, "owner@acme.test").await;
    for (first, last) in [("A", Some("Zed")), ("B", None), ("C", Some("Adams"))] {
        PersonRepo::create(&pool, company_id, &person(first, last, None))
            .await
            .unwrap();
    }

    let params = PersonListParams {
        sort_by: Some("lastName".to_string()),
        sort_order: Some("asc".to_string()),
        ..PersonListParams::default()
    };
    let page = PersonRepo::list(&pool, company_id, &params).await.unwrap();
    let order: Vec<_> = page.items.iter().map(|p| p.first_name.as_str()).collect();
    assert_eq!(order, ["C", "A", "B"]);

    let params = PersonListParams {
        sort_order: Some("desc".to_string()),
        ..params
    };
    let page = PersonRepo::list(&pool, company_id, &params).await.unwrap();
    let order: Vec<_> = page.items.iter().map(|p| p.first_name.as_str()).collect();
    assert_eq!(order, ["A", "C", "B"]);

    let params = PersonListParams {
        limit: Some(1),
        offset: Some(1),
        ..params
    };
    let page = PersonRepo::list(&pool, company_id, &params).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].first_name, "C");
}

// ---------------------------------------------------------------------------
// Updates and bulk operations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_replaces_tags_when_given(pool: PgPool) {
    let (company_id, _) = new_company(&pool, "owner@acme.test").await;
    let vip = tag(&pool, company_id, "VIP").await;
    let cold = tag(&pool, company_id, "Cold").await;
    let created = PersonRepo::create(
        &pool,
        company_id,
        &CreatePerson {
            tag_ids: Some(vec![vip]),
            ..person("Tina", None, None)
        },
    )
    .await
    .unwrap();

    let updated = PersonRepo::update(
        &pool,
        company_id,
        created.id,
        &UpdatePerson {
            job_title: Some("CTO".to_string()),
            tag_ids: Some(vec![cold]),
            ..UpdatePerson::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.job_title.as_deref(), Some("CTO"));
    assert_eq!(updated.first_name, "Tina");
    let names: Vec<_> = updated.tags.0.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Cold"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bulk_tag_update_is_idempotent_and_company_scoped(pool: PgPool) {
    let (acme, _) = new_company(&pool, "owner@acme.test").await;
    let (globex, _) = new_company(&pool, "owner@globex.test").await;
    let vip = tag(&pool, acme, "VIP").await;
    let mine = PersonRepo::create(&pool, acme, &person("Mine", None, None))
        .await
        .unwrap();
    let theirs = PersonRepo::create(&pool, globex, &person("Theirs", None, None))
        .await
        .unwrap();

    for _ in 0..2 {
        let touched = PersonRepo::bulk_tag_update(&pool, acme, &[mine.id, theirs.id], &[vip], &[])
            .await
            .unwrap();
        assert_eq!(touched, 1);
    }

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM person_tags")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(links, 1);

    PersonRepo::bulk_tag_update(&pool, acme, &[mine.id], &[], &[vip])
        .await
        .unwrap();
    let after = PersonRepo::find_by_id(&pool, acme, mine.id).await.unwrap().unwrap();
    assert!(after.tags.0.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assign_owner_updates_only_company_people(pool: PgPool) {
    let (acme, owner) = new_company(&pool, "owner@acme.test").await;
    let (globex, _) = new_company(&pool, "owner@globex.test").await;
    let mine = PersonRepo::create(&pool, acme, &person("Mine", None, None))
        .await
        .unwrap();
    let theirs = PersonRepo::create(&pool, globex, &person("Theirs", None, None))
        .await
        .unwrap();

    let updated = PersonRepo::assign_owner(&pool, acme, &[mine.id, theirs.id], Some(owner))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let mine = PersonRepo::find_by_id(&pool, acme, mine.id).await.unwrap().unwrap();
    assert_eq!(mine.assigned_to, Some(owner));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_tag_names_violate_the_unique_index(pool: PgPool) {
    let (company_id, _) = new_company(&pool, "owner@acme.test").await;
    tag(&pool, company_id, "VIP").await;

    let err = TagRepo::create(
        &pool,
        company_id,
        &CreateTag {
            name: "vip".to_string(),
            color: None,
        },
    )
    .await
    .unwrap_err();

    let db_err = err.as_database_error().unwrap();
    assert_eq!(db_err.constraint(), Some("uq_tags_company_name"));
}
