#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio::sync::Notify;
use tower::ServiceExt;

use crm_api::auth::jwt::JwtConfig;
use crm_api::config::ServerConfig;
use crm_api::router::build_app_router;
use crm_api::state::AppState;
use crm_worker::config::DispatcherConfig;

pub const INTERNAL_TOKEN: &str = "test-internal-token";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Build a test `ServerConfig` with safe defaults.
///
/// The import dispatcher is not started (tests drive it explicitly) and
/// simulated sends never fail.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        public_base_url: "http://crm.test".to_string(),
        internal_service_token: Some(INTERNAL_TOKEN.to_string()),
        import_worker_inline: false,
        simulate_delivery_failures: false,
        dispatcher: DispatcherConfig::default(),
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        import_notify: Arc::new(Notify::new()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone()
        .oneshot(request)
        .await
        .expect("router should not fail")
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    builder(method, uri, token)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let request = builder(Method::GET, uri, token).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, token, &body)).await
}

pub async fn put_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, token, &body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let request = builder(Method::DELETE, uri, token).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Assert the status and return the `data` field of the envelope.
pub async fn expect_data(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await["data"].clone()
}

/// Assert a 400 `VALIDATION_ERROR` and return its message.
pub async fn expect_validation_error(response: Response<Body>) -> String {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    body["error"].as_str().unwrap_or_default().to_string()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A signed-up company with its owner's session.
pub struct Tenant {
    pub company_id: i64,
    pub user_id: i64,
    pub token: String,
}

/// Sign up a company through the public endpoint.
pub async fn register_company(app: &Router, name: &str, owner_email: &str) -> Tenant {
    let body = json!({
        "name": name,
        "owner": {
            "email": owner_email,
            "password": TEST_PASSWORD,
            "firstName": "Owner",
        }
    });
    let data = expect_data(
        post_json(app, "/api/v1/companies", None, body).await,
        StatusCode::CREATED,
    )
    .await;

    Tenant {
        company_id: data["company"]["id"].as_i64().unwrap(),
        user_id: data["user"]["id"].as_i64().unwrap(),
        token: data["accessToken"].as_str().unwrap().to_string(),
    }
}

/// Create a person and return its id.
pub async fn create_person(app: &Router, token: &str, body: Value) -> i64 {
    let data = expect_data(
        post_json(app, "/api/v1/people", Some(token), body).await,
        StatusCode::CREATED,
    )
    .await;
    data["id"].as_i64().unwrap()
}

/// Create a pipeline with the given stage names; returns the pipeline id and
/// stage ids in position order.
pub async fn create_pipeline(app: &Router, token: &str, stages: &[&str]) -> (i64, Vec<i64>) {
    let stages: Vec<Value> = stages.iter().map(|name| json!({ "name": name })).collect();
    let data = expect_data(
        post_json(
            app,
            "/api/v1/pipelines",
            Some(token),
            json!({ "name": "Sales", "stages": stages }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    let stage_ids = data["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    (data["id"].as_i64().unwrap(), stage_ids)
}
