//! API key management, key-authenticated integrations and the internal
//! key validation endpoint.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use sqlx::PgPool;

use crm_api::auth::api_key::validate_api_key;
use crm_core::api_keys::KEY_PREFIX;

use common::{
    body_json, build_test_app, create_pipeline, delete, expect_data, get, post_json,
    register_company, send, Tenant, INTERNAL_TOKEN,
};

async fn create_key(app: &axum::Router, tenant: &Tenant, permissions: Value) -> (i64, String) {
    let data = expect_data(
        post_json(
            app,
            "/api/v1/api-keys",
            Some(&tenant.token),
            json!({ "name": "Website", "permissions": permissions }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    (
        data["id"].as_i64().unwrap(),
        data["key"].as_str().unwrap().to_string(),
    )
}

async fn validate_internal(app: &axum::Router, token: Option<&str>, body: Value) -> axum::http::Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/internal/validate-api-key-permissions")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("x-internal-token", token);
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn created_key_is_shown_once(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;

    let (_, key) = create_key(&app, &acme, json!(["leads:create", "contacts:read"])).await;
    assert!(key.starts_with("pbr_"));

    let keys = expect_data(get(&app, "/api/v1/api-keys", Some(&acme.token)).await, StatusCode::OK).await;
    assert_eq!(keys.as_array().unwrap().len(), 1);
    assert!(keys[0].get("key").is_none());
    assert!(keys[0].get("keyHash").is_none());
    assert!(key.starts_with(keys[0]["keyPrefix"].as_str().unwrap()));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_permissions_are_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;

    let response = post_json(
        &app,
        "/api/v1/api-keys",
        Some(&acme.token),
        json!({ "name": "Bad", "permissions": ["people:delete"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn whitespace_only_key_name_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;

    let response = post_json(
        &app,
        "/api/v1/api-keys",
        Some(&acme.token),
        json!({ "name": "   ", "permissions": ["contacts:read"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("name must not be blank"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lead_capture_creates_person_and_deal(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    create_pipeline(&app, &acme.token, &["Inbound", "Qualified"]).await;
    let (_, key) = create_key(&app, &acme, json!(["leads:create"])).await;

    let lead = json!({
        "email": "Lead@Example.com",
        "firstName": "Lee",
        "pipelineName": "Sales",
        "stageName": "Inbound",
        "dealValue": 1200.0
    });
    let first = expect_data(
        post_json(&app, "/api/v1/leads", Some(&key), lead.clone()).await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(first["personCreated"], true);
    assert!(first["dealId"].as_i64().is_some());

    let again = expect_data(
        post_json(&app, "/api/v1/webhooks/form-submission", Some(&key), json!({ "email": "lead@example.com" })).await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(again["personCreated"], false);
    assert_eq!(again["personId"], first["personId"]);

    let response = post_json(
        &app,
        "/api/v1/leads",
        Some(&key),
        json!({ "email": "x@example.com", "pipelineName": "Sales" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_permission_is_forbidden(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    let (_, key) = create_key(&app, &acme, json!(["leads:create"])).await;

    let response = get(&app, "/api/v1/contacts", Some(&key)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        &app,
        "/api/v1/webhooks/bcc-email",
        Some(&key),
        json!({ "from": "ada@acme.test", "to": ["x@example.com"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bcc_email_logs_each_recipient_once(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    let (_, key) = create_key(&app, &acme, json!(["emails:log", "contacts:read"])).await;

    let data = expect_data(
        post_json(
            &app,
            "/api/v1/webhooks/bcc-email",
            Some(&key),
            json!({
                "from": "ada@acme.test",
                "to": ["one@example.com", "ONE@example.com"],
                "cc": ["two@example.com", "not-an-address"],
                "subject": "Hello"
            }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(data["loggedCount"], 2);

    let contacts = expect_data(get(&app, "/api/v1/contacts", Some(&key)).await, StatusCode::OK).await;
    assert_eq!(contacts["total"], 2);
    assert!(contacts["items"][0]["lastContactedAt"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_and_revoked_keys_are_unauthorized(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    let (key_id, key) = create_key(&app, &acme, json!(["contacts:read"])).await;

    assert_eq!(get(&app, "/api/v1/contacts", Some(&key)).await.status(), StatusCode::OK);

    let last = if key.ends_with('a') { 'b' } else { 'a' };
    let tampered = format!("{}{last}", &key[..key.len() - 1]);
    let response = get(&app, "/api/v1/contacts", Some(&tampered)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A user session is not an API key.
    let response = get(&app, "/api/v1/contacts", Some(&acme.token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = delete(&app, &format!("/api/v1/api-keys/{key_id}"), Some(&acme.token)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&app, "/api/v1/contacts", Some(&key)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn well_formed_key_with_unknown_prefix_is_invalid(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    create_key(&app, &acme, json!(["contacts:read"])).await;

    let forged = format!("{KEY_PREFIX}{}", "0".repeat(40));
    let data = expect_data(
        validate_internal(&app, Some(INTERNAL_TOKEN), json!({ "apiKey": forged })).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(data["isValid"], false);
    assert!(data.get("companyId").is_none());

    let response = get(&app, "/api/v1/contacts", Some(&forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_key_is_rejected(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    let (key_id, key) = create_key(&app, &acme, json!(["contacts:read"])).await;
    assert!(validate_api_key(&pool, &key).await.is_valid);

    sqlx::query("UPDATE api_keys SET expires_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(key_id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(!validate_api_key(&pool, &key).await.is_valid);

    let response = get(&app, "/api/v1/contacts", Some(&key)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let data = expect_data(
        validate_internal(&app, Some(INTERNAL_TOKEN), json!({ "apiKey": key })).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(data["isValid"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lookup_failure_reports_an_invalid_key(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    let (_, key) = create_key(&app, &acme, json!(["contacts:read"])).await;
    assert!(validate_api_key(&pool, &key).await.is_valid);

    pool.close().await;

    let result = validate_api_key(&pool, &key).await;
    assert!(!result.is_valid);
    assert_eq!(result.company_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn internal_validation_requires_service_token(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    let (_, key) = create_key(&app, &acme, json!(["leads:create"])).await;

    let body = json!({ "apiKey": key, "requiredPermissions": ["leads:create"] });

    let response = validate_internal(&app, None, body.clone()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = validate_internal(&app, Some("wrong"), body.clone()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let data = expect_data(
        validate_internal(&app, Some(INTERNAL_TOKEN), body).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(data["isValid"], true);
    assert_eq!(data["companyId"], acme.company_id);
    assert_eq!(data["hasRequiredPermissions"], true);

    let data = expect_data(
        validate_internal(
            &app,
            Some(INTERNAL_TOKEN),
            json!({ "apiKey": key, "requiredPermissions": ["emails:log"] }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(data["isValid"], true);
    assert_eq!(data["hasRequiredPermissions"], false);

    let response = validate_internal(
        &app,
        Some(INTERNAL_TOKEN),
        json!({ "apiKey": "nope", "requiredPermissions": [] }),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["isValid"], false);
    assert!(json["data"].get("companyId").is_none());
}
