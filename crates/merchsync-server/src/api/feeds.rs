//! Feed pull and admin endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use merchsync_feed::FeedError;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub struct PullParams {
    #[serde(default)]
    secret: String,
}

#[derive(Debug, Serialize)]
pub struct RegenerateData {
    pub stream: String,
    pub rows: usize,
    pub elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct RotateSecretData {
    pub stream: String,
    pub data_url: String,
}

/// `GET /feeds/{stream}/data?secret=...`
///
/// Machine-consumed by Meta's fetcher, so failures are bare status codes
/// rather than the JSON envelope.
pub async fn pull_feed(
    State(state): State<AppState>,
    Path(stream): Path<String>,
    Query(params): Query<PullParams>,
) -> Response {
    let feed = match state.registry.get(&stream) {
        Ok(feed) => feed,
        Err(e) => return feed_error_status(&e).into_response(),
    };

    match feed.serve(&params.secret).await {
        Ok(served) => {
            let disposition = format!("attachment; filename=\"{}\"", served.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::CONTENT_LENGTH, served.bytes.len().to_string()),
                    (header::CACHE_CONTROL, "no-store".to_string()),
                ],
                served.bytes,
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(stream = %stream, error = %e, "feed pull failed");
            feed_error_status(&e).into_response()
        }
    }
}

/// `POST /api/v1/feeds/{stream}/regenerate` (bearer auth).
///
/// Rebuilds the artifact immediately and re-sends the upload notification.
pub async fn regenerate_feed(
    State(state): State<AppState>,
    Path(stream): Path<String>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RegenerateData>>, ApiError> {
    let feed = state
        .registry
        .get(&stream)
        .map_err(|e| map_feed_error(req_id.0.clone(), &e))?;

    let report = feed
        .regenerate()
        .await
        .map_err(|e| map_feed_error(req_id.0.clone(), &e))?;

    feed.send_upload_notification(&state.upload_client, &state.config.public_base_url)
        .await;

    Ok(Json(ApiResponse {
        data: RegenerateData {
            stream,
            rows: report.rows,
            elapsed_ms: report.elapsed.as_millis(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `POST /api/v1/feeds/{stream}/rotate-secret` (bearer auth).
///
/// The old pull URL stops working immediately; the artifact under the new
/// name is rebuilt lazily on the next pull.
pub async fn rotate_feed_secret(
    State(state): State<AppState>,
    Path(stream): Path<String>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RotateSecretData>>, ApiError> {
    let feed = state
        .registry
        .get(&stream)
        .map_err(|e| map_feed_error(req_id.0.clone(), &e))?;

    feed.rotate_secret()
        .await
        .map_err(|e| map_feed_error(req_id.0.clone(), &e))?;
    let data_url = feed
        .data_url(&state.config.public_base_url)
        .await
        .map_err(|e| map_feed_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: RotateSecretData { stream, data_url },
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn feed_error_status(error: &FeedError) -> StatusCode {
    StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn map_feed_error(request_id: String, error: &FeedError) -> ApiError {
    let code = match error.http_status() {
        401 => "unauthorized",
        404 => "not_found",
        _ => "internal_error",
    };
    if code == "internal_error" {
        tracing::error!(error = %error, "feed operation failed");
    }
    ApiError::new(request_id, code, error.to_string())
}
