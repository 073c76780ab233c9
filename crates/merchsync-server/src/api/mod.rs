mod feeds;
mod offers;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use merchsync_core::AppConfig;
use merchsync_feed::{FeedRegistry, UploadClient};

use crate::middleware::{request_id, require_bearer_auth, AuthState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub registry: Arc<FeedRegistry>,
    pub upload_client: Arc<UploadClient>,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn admin_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/feeds/{stream}/regenerate",
            post(feeds::regenerate_feed),
        )
        .route(
            "/api/v1/feeds/{stream}/rotate-secret",
            post(feeds::rotate_feed_secret),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/feeds/{stream}/data", get(feeds::pull_feed))
        .route(
            "/api/v1/offers",
            post(offers::create)
                .get(offers::read)
                .delete(offers::delete),
        );

    Router::new()
        .merge(public_routes)
        .merge(admin_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match merchsync_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use merchsync_core::Environment;
    use merchsync_db::settings;
    use merchsync_feed::build_registry;

    use super::*;

    fn test_config(feed_dir: &std::path::Path) -> AppConfig {
        AppConfig {
            database_url: String::new(),
            env: Environment::Development,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "info".to_string(),
            feed_dir: feed_dir.to_path_buf(),
            public_base_url: "https://shop.example.com".to_string(),
            graph_api_base: "https://graph.facebook.com/v21.0".to_string(),
            meta_access_token: None,
            http_request_timeout_secs: 5,
            ratings_feed_interval_secs: 3600,
            catalog_feed_interval_secs: 3600,
            db_max_connections: 5,
            db_min_connections: 0,
            db_acquire_timeout_secs: 5,
        }
    }

    fn test_state(pool: PgPool, feed_dir: &std::path::Path) -> AppState {
        let config = Arc::new(test_config(feed_dir));
        let registry = Arc::new(build_registry(pool.clone(), &config));
        let upload_client = Arc::new(
            UploadClient::new(config.graph_api_base.clone(), None, 5).expect("upload client"),
        );
        AppState {
            pool,
            registry,
            upload_client,
            config,
        }
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_returns_ok_with_live_database(pool: PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = AuthState::from_raw_keys("", true).expect("auth");
        let app = build_app(test_state(pool, dir.path()), auth);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
        assert!(json["meta"]["request_id"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn feed_pull_rejects_wrong_secret(pool: PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = AuthState::from_raw_keys("", true).expect("auth");
        let app = build_app(test_state(pool, dir.path()), auth);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/feeds/ratings_and_reviews/data?secret=wrong")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn feed_pull_unknown_stream_is_not_found(pool: PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = AuthState::from_raw_keys("", true).expect("auth");
        let app = build_app(test_state(pool, dir.path()), auth);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/feeds/nonexistent/data?secret=abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn feed_pull_serves_csv_with_correct_secret(pool: PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(pool.clone(), dir.path());
        let auth = AuthState::from_raw_keys("", true).expect("auth");
        let app = build_app(state, auth);

        // Pulling establishes the secret lazily; fetch it the way the feed does.
        let registry = build_registry(pool.clone(), &test_config(dir.path()));
        let feed = registry.get("ratings_and_reviews").expect("feed");
        let secret = feed.secret().await.expect("secret");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/feeds/ratings_and_reviews/data?secret={secret}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/csv; charset=utf-8")
        );
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .expect("content-disposition");
        assert!(disposition.contains("ratings_and_reviews_feed_"));

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(text.starts_with("aggregator"), "header row first: {text}");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn admin_routes_require_bearer_token(pool: PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = AuthState::from_raw_keys("admin-token", false).expect("auth");
        let app = build_app(test_state(pool, dir.path()), auth);

        let denied = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/feeds/ratings_and_reviews/regenerate")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/feeds/ratings_and_reviews/regenerate")
                    .header(header::AUTHORIZATION, "Bearer admin-token")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn rotate_secret_changes_pull_url(pool: PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(pool.clone(), dir.path());
        let auth = AuthState::from_raw_keys("", true).expect("auth");
        let app = build_app(state, auth);

        let before = settings::get(&pool, &settings::keys::feed_url_secret("product_catalog"))
            .await
            .expect("settings read");
        assert!(before.is_none());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/feeds/product_catalog/rotate-secret")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let url = json["data"]["data_url"].as_str().expect("data_url");
        let after = settings::get(&pool, &settings::keys::feed_url_secret("product_catalog"))
            .await
            .expect("settings read")
            .expect("secret stored");
        assert!(url.contains(&after));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn offers_route_without_token_is_jwt_not_found(pool: PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");

        // Both switches on so the request reaches token verification.
        settings::put(&pool, settings::keys::OFFER_MANAGEMENT_ENABLED, "true")
            .await
            .expect("put");
        settings::put(&pool, settings::keys::OFFER_MANAGEMENT_ROLLOUT, "true")
            .await
            .expect("put");

        let auth = AuthState::from_raw_keys("", true).expect("auth");
        let app = build_app(test_state(pool, dir.path()), auth);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/offers")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(
            json["errors"][0]["error_type"].as_str(),
            Some("ERROR_JWT_NOT_FOUND")
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn offers_route_reports_disabled_before_token_checks(pool: PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = AuthState::from_raw_keys("", true).expect("auth");
        let app = build_app(test_state(pool, dir.path()), auth);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/offers?jwt_params=whatever")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(
            json["errors"][0]["error_type"].as_str(),
            Some("ERROR_OFFER_MANAGEMENT_DISABLED")
        );
    }
}
