//! Signup, login, session and tenant-isolation tests.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::{
    body_json, build_test_app, expect_data, expect_validation_error, get, post_json, put_json,
    register_company, TEST_PASSWORD,
};

#[sqlx::test(migrations = "../../db/migrations")]
async fn signup_returns_company_and_owner_session(pool: PgPool) {
    let app = build_test_app(pool);

    let body = json!({
        "name": "Acme",
        "domain": "acme.test",
        "owner": { "email": "Ada@Acme.Test", "password": TEST_PASSWORD, "firstName": "Ada" }
    });
    let data = expect_data(
        post_json(&app, "/api/v1/companies", None, body).await,
        StatusCode::CREATED,
    )
    .await;

    assert_eq!(data["company"]["name"], "Acme");
    assert_eq!(data["user"]["email"], "ada@acme.test");
    assert_eq!(data["user"]["role"], "owner");
    assert_eq!(data["expiresIn"], 3600);
    assert!(data["accessToken"].as_str().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn signup_rejects_weak_password_and_duplicate_email(pool: PgPool) {
    let app = build_test_app(pool);

    let weak = json!({
        "name": "Acme",
        "owner": { "email": "ada@acme.test", "password": "short", "firstName": "Ada" }
    });
    let response = post_json(&app, "/api/v1/companies", None, weak).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    register_company(&app, "Acme", "ada@acme.test").await;

    let dupe = json!({
        "name": "Other",
        "owner": { "email": "ADA@acme.test", "password": TEST_PASSWORD, "firstName": "Ada" }
    });
    let response = post_json(&app, "/api/v1/companies", None, dupe).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_and_me(pool: PgPool) {
    let app = build_test_app(pool);
    let tenant = register_company(&app, "Acme", "ada@acme.test").await;

    let data = expect_data(
        post_json(
            &app,
            "/api/v1/auth/login",
            None,
            json!({ "email": "ada@acme.test", "password": TEST_PASSWORD }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    let token = data["accessToken"].as_str().unwrap().to_string();

    let me = expect_data(get(&app, "/api/v1/auth/me", Some(&token)).await, StatusCode::OK).await;
    assert_eq!(me["id"], tenant.user_id);
    assert_eq!(me["companyId"], tenant.company_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_with_wrong_password_is_401(pool: PgPool) {
    let app = build_test_app(pool);
    register_company(&app, "Acme", "ada@acme.test").await;

    let response = post_json(
        &app,
        "/api/v1/auth/login",
        None,
        json!({ "email": "ada@acme.test", "password": "not-the-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn protected_routes_require_a_token(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(&app, "/api/v1/people", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(&app, "/api/v1/people", Some("garbage")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn company_of_another_tenant_is_not_found(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    let globex = register_company(&app, "Globex", "hank@globex.test").await;

    let own = get(&app, &format!("/api/v1/companies/{}", acme.company_id), Some(&acme.token)).await;
    assert_eq!(own.status(), StatusCode::OK);

    let other = get(
        &app,
        &format!("/api/v1/companies/{}", globex.company_id),
        Some(&acme.token),
    )
    .await;
    assert_eq!(other.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn members_cannot_manage_the_company(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;

    let member = expect_data(
        post_json(
            &app,
            "/api/v1/users",
            Some(&acme.token),
            json!({ "email": "bob@acme.test", "password": TEST_PASSWORD, "firstName": "Bob" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(member["role"], "member");

    let login = expect_data(
        post_json(
            &app,
            "/api/v1/auth/login",
            None,
            json!({ "email": "bob@acme.test", "password": TEST_PASSWORD }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    let member_token = login["accessToken"].as_str().unwrap();

    let response = put_json(
        &app,
        &format!("/api/v1/companies/{}", acme.company_id),
        Some(member_token),
        json!({ "name": "Renamed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let users = expect_data(get(&app, "/api/v1/users", Some(member_token)).await, StatusCode::OK).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn whitespace_only_company_names_are_rejected(pool: PgPool) {
    let app = build_test_app(pool);

    let message = expect_validation_error(
        post_json(
            &app,
            "/api/v1/companies",
            None,
            json!({
                "name": "   ",
                "owner": {
                    "email": "ada@acme.test",
                    "password": TEST_PASSWORD,
                    "firstName": "Ada",
                }
            }),
        )
        .await,
    )
    .await;
    assert!(message.contains("name must not be blank"));

    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    expect_validation_error(
        put_json(
            &app,
            &format!("/api/v1/companies/{}", acme.company_id),
            Some(&acme.token),
            json!({ "name": "  " }),
        )
        .await,
    )
    .await;
}
