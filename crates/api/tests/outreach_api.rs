//! Email settings, simulated sends and open/click tracking.

mod common;

use axum::http::{header, StatusCode};
use serde_json::{json, Value};
use sqlx::PgPool;

use common::{
    body_bytes, body_json, build_test_app, create_person, expect_data, get, post_json, put_json,
    register_company, Tenant,
};

async fn connect_smtp(app: &axum::Router, tenant: &Tenant) {
    expect_data(
        put_json(
            app,
            "/api/v1/users/me/email-settings",
            Some(&tenant.token),
            json!({ "provider": "smtp", "smtpHost": "smtp.acme.test", "smtpPort": 587 }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let test = expect_data(
        post_json(app, "/api/v1/users/me/email-settings/test", Some(&tenant.token), json!({})).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(test["success"], true);
    assert_eq!(test["settings"]["isConnected"], true);
}

async fn activity_types(app: &axum::Router, token: &str, person_id: i64) -> Vec<String> {
    let data = expect_data(
        get(app, &format!("/api/v1/activities?personId={person_id}"), Some(token)).await,
        StatusCode::OK,
    )
    .await;
    data.as_array()
        .unwrap()
        .iter()
        .map(|a| a["activityType"].as_str().unwrap().to_string())
        .collect()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sending_without_connected_account_fails_softly(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;

    let data = expect_data(
        post_json(
            &app,
            "/api/v1/outreach/emails",
            Some(&acme.token),
            json!({ "to": "grace@example.com", "subject": "Hi", "body": "Hello" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(data["success"], false);
    assert_eq!(data["error"], "EMAIL_NOT_CONNECTED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn email_settings_are_validated(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;

    let response = put_json(
        &app,
        "/api/v1/users/me/email-settings",
        Some(&acme.token),
        json!({ "provider": "gmail" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json(
        &app,
        "/api/v1/users/me/email-settings",
        Some(&acme.token),
        json!({ "provider": "pigeon" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/api/v1/users/me/email-settings/test",
        Some(&acme.token),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let settings = expect_data(
        get(&app, "/api/v1/users/me/email-settings", Some(&acme.token)).await,
        StatusCode::OK,
    )
    .await;
    assert!(settings.is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sent_email_lands_on_the_timeline(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    connect_smtp(&app, &acme).await;
    let person_id = create_person(
        &app,
        &acme.token,
        json!({ "firstName": "Grace", "email": "grace@example.com" }),
    )
    .await;

    // Matched to the person by recipient address.
    let data = expect_data(
        post_json(
            &app,
            "/api/v1/outreach/emails",
            Some(&acme.token),
            json!({ "to": "Grace@Example.com", "subject": "Hi", "body": "Hello" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(data["success"], true);
    assert!(data["activityId"].as_i64().is_some());
    assert!(data.get("trackingId").is_none());

    assert_eq!(activity_types(&app, &acme.token, person_id).await, ["email_sent"]);

    let person = expect_data(
        get(&app, &format!("/api/v1/people/{person_id}"), Some(&acme.token)).await,
        StatusCode::OK,
    )
    .await;
    assert!(person["lastContactedAt"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn validated_send_reports_bad_input(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    connect_smtp(&app, &acme).await;

    let data = expect_data(
        post_json(
            &app,
            "/api/v1/outreach/emails/validated",
            Some(&acme.token),
            json!({ "to": "nobody", "subject": "Hi", "body": "Hello" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(data["success"], false);
    assert_eq!(data["error"], "VALIDATION_FAILED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn tracked_email_records_opens_and_clicks(pool: PgPool) {
    let app = build_test_app(pool);
    let acme = register_company(&app, "Acme", "ada@acme.test").await;
    connect_smtp(&app, &acme).await;
    let person_id = create_person(
        &app,
        &acme.token,
        json!({ "firstName": "Grace", "email": "grace@example.com" }),
    )
    .await;

    let data = expect_data(
        post_json(
            &app,
            "/api/v1/outreach/emails/tracked",
            Some(&acme.token),
            json!({
                "to": "grace@example.com",
                "subject": "Offer",
                "body": "<p>See <a href=\"https://acme.test/offer\">the offer</a></p>",
                "personId": person_id
            }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(data["success"], true);
    let tracking_id = data["trackingId"].as_str().unwrap().to_string();

    // Opening twice records a single open.
    for _ in 0..2 {
        let response = get(&app, &format!("/track/open/{tracking_id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
        assert!(body_bytes(response).await.starts_with(b"GIF89a"));
    }

    let response = get(
        &app,
        &format!("/track/click/{tracking_id}?url=https%3A%2F%2Facme.test%2Foffer"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "https://acme.test/offer");

    let response = get(
        &app,
        &format!("/track/click/{tracking_id}?url=https%3A%2F%2Fevil.test"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut types = activity_types(&app, &acme.token, person_id).await;
    types.sort();
    assert_eq!(types, ["email_open", "email_sent", "link_click"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_tracking_ids(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(&app, "/track/open/does-not-exist", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");

    let response = get(&app, "/track/click/does-not-exist?url=https%3A%2F%2Fa.test", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json: Value = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}
