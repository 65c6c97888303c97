mod runs;
mod sources;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{guard, request_id, AccessGuard, RequestId};
use crate::runner::Runner;

#[derive(Clone)]
pub struct AppState {
    pub runner: Runner,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    #[must_use]
    pub fn new(runner: Runner) -> Self {
        Self {
            runner,
            started_at: Utc::now(),
        }
    }
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
    schedule: String,
    enabled_sources: usize,
    started_at: DateTime<Utc>,
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
            "bad_request" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn guarded_router(access: AccessGuard) -> Router<AppState> {
    Router::new()
        .route("/api/v1/trigger", post(runs::trigger_full_run))
        .route("/api/v1/trigger/urgent", post(runs::trigger_urgent_check))
        .route("/api/v1/sources", get(sources::list_sources))
        .layer(axum::middleware::from_fn_with_state(access, guard))
}

pub fn build_app(state: AppState, access: AccessGuard) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/metrics", get(runs::get_metrics));

    Router::new()
        .merge(public_routes)
        .merge(guarded_router(access))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let service = state.runner.service();
    let enabled_sources = service.sources().iter().filter(|s| s.is_enabled()).count();

    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            schedule: service.settings().schedule.to_string(),
            enabled_sources,
            started_at: state.started_at,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_service;
    use axum::body::{to_bytes, Body};
    use crate::middleware::TriggerBudget;
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_with(access: AccessGuard) -> Router {
        let runner = Runner::new(Arc::new(test_service()));
        build_app(AppState::new(runner), access)
    }

    fn open_guard() -> AccessGuard {
        AccessGuard::new(&[], TriggerBudget::per_minute(10))
    }

    fn app() -> Router {
        app_with(open_guard())
    }

    fn sources_request(key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/v1/sources");
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {key}"));
        }
        builder.body(Body::empty()).expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    #[test]
    fn api_error_conflict_maps_to_409() {
        let response = ApiError::new("req-1", "conflict", "busy").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn health_reports_ok_and_echoes_request_id() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "req-abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-request-id").map(|v| v.as_bytes()),
            Some(&b"req-abc"[..])
        );
        let json = json_body(response).await;
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["schedule"], "daily");
        assert_eq!(json["data"]["enabled_sources"], 0);
        assert_eq!(json["meta"]["request_id"], "req-abc");
    }

    #[tokio::test]
    async fn metrics_are_zero_before_the_first_run() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let json = json_body(response).await;
        assert_eq!(json["data"]["total_mentions"], 0);
        assert_eq!(json["data"]["error_count"], 0);
        assert!(json["data"]["last_run"].is_null());
        assert!(json["data"]["last_urgent_check"].is_null());
    }

    #[tokio::test]
    async fn trigger_is_accepted_and_the_run_completes() {
        let runner = Runner::new(Arc::new(test_service()));
        let app = build_app(AppState::new(runner.clone()), open_guard());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/trigger")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = json_body(response).await;
        assert_eq!(json["data"]["kind"], "full");
        assert_eq!(json["data"]["status"], "started");

        let mut finished = false;
        for _ in 0..100 {
            if runner.service().metrics_snapshot().await.last_run.is_some() {
                finished = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(finished, "triggered run never recorded metrics");
    }

    #[tokio::test]
    async fn trigger_requires_bearer_token_when_keys_are_set() {
        let app = app_with(AccessGuard::new(
            &["secret".to_owned()],
            TriggerBudget::per_minute(10),
        ));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/trigger/urgent")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("x-request-id"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/trigger/urgent")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn spent_budget_returns_429_with_retry_after() {
        let app = app_with(AccessGuard::new(&[], TriggerBudget::per_minute(1)));

        let first = app
            .clone()
            .oneshot(sources_request(None))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::OK);

        let mut second = sources_request(None);
        second
            .headers_mut()
            .insert("x-request-id", "req-throttled".parse().expect("header"));
        let second = app.oneshot(second).await.expect("response");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = second
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .expect("retry-after header");
        assert!((1..=60).contains(&retry_after));

        let json = json_body(second).await;
        assert_eq!(json["error"]["code"], "rate_limited");
        assert_eq!(json["meta"]["request_id"], "req-throttled");
    }

    #[tokio::test]
    async fn each_api_key_has_its_own_budget() {
        let app = app_with(AccessGuard::new(
            &["ops-key".to_owned(), "ci-key".to_owned()],
            TriggerBudget::per_minute(1),
        ));

        let ops = app
            .clone()
            .oneshot(sources_request(Some("ops-key")))
            .await
            .expect("response");
        assert_eq!(ops.status(), StatusCode::OK);

        let ops_again = app
            .clone()
            .oneshot(sources_request(Some("ops-key")))
            .await
            .expect("response");
        assert_eq!(ops_again.status(), StatusCode::TOO_MANY_REQUESTS);

        let ci = app
            .clone()
            .oneshot(sources_request(Some("ci-key")))
            .await
            .expect("response");
        assert_eq!(ci.status(), StatusCode::OK);

        let unknown = app
            .oneshot(sources_request(Some("nope")))
            .await
            .expect("response");
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn public_routes_skip_the_guard() {
        let app = app_with(AccessGuard::new(
            &["secret".to_owned()],
            TriggerBudget::per_minute(1),
        ));
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/api/v1/health")
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
