//! Public email tracking endpoints hit by recipients' mail clients.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use crm_core::activity::{EMAIL_SENT, LINK_CLICK};
use crm_core::outreach::TRACKING_PIXEL_GIF;
use crm_db::models::activity::{Activity, CreateActivity};
use crm_db::repositories::ActivityRepo;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClickParams {
    pub url: String,
}

/// GET /track/open/{tracking_id}
///
/// Always answers with the pixel; the first open per email is recorded.
pub async fn track_open(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> impl IntoResponse {
    match ActivityRepo::find_by_tracking_id(&state.pool, EMAIL_SENT, &tracking_id).await {
        Ok(Some(sent)) => match ActivityRepo::record_open_once(&state.pool, &sent).await {
            Ok(true) => tracing::info!(activity_id = sent.id, "Email opened"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, activity_id = sent.id, "Failed to record open"),
        },
        Ok(None) => tracing::debug!(%tracking_id, "Open for unknown tracking id"),
        Err(e) => tracing::error!(error = %e, %tracking_id, "Tracking lookup failed"),
    }

    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
        ],
        TRACKING_PIXEL_GIF,
    )
}

/// GET /track/click/{tracking_id}?url=
///
/// Redirects only to links recorded when the email was sent.
pub async fn track_click(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
    Query(params): Query<ClickParams>,
) -> AppResult<Response> {
    let Some(sent) =
        ActivityRepo::find_by_tracking_id(&state.pool, EMAIL_SENT, &tracking_id).await?
    else {
        return Ok(unknown_tracking_id());
    };

    if !is_recorded_link(&sent, &params.url) {
        return Err(AppError::BadRequest(
            "URL is not a tracked link of this email".into(),
        ));
    }

    let mut click = CreateActivity::new(LINK_CLICK);
    click.person_id = sent.person_id;
    click.deal_id = sent.deal_id;
    click.subject = sent.subject.clone();
    click.metadata = Some(json!({
        "trackingId": tracking_id,
        "url": params.url,
        "originalActivityId": sent.id.to_string(),
    }));
    let mut conn = state.pool.acquire().await?;
    ActivityRepo::create(&mut conn, sent.company_id, &click).await?;

    tracing::info!(activity_id = sent.id, url = %params.url, "Tracked link clicked");

    Ok((StatusCode::FOUND, [(header::LOCATION, params.url)]).into_response())
}

/// Tracking ids are opaque strings, so this bypasses the numeric
/// `NotFound` error while keeping its body shape.
fn unknown_tracking_id() -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(json!({ "error": "Unknown tracking id", "code": "NOT_FOUND" })),
    )
        .into_response()
}

fn is_recorded_link(sent: &Activity, url: &str) -> bool {
    sent.metadata
        .get("links")
        .and_then(|links| links.as_array())
        .is_some_and(|links| links.iter().any(|l| l.as_str() == Some(url)))
}
