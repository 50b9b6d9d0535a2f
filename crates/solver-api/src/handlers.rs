//! Route handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use solver_dispatch::StatsSnapshot;

use crate::ApiState;
use crate::prometheus::render_prometheus;

/// Standard API response envelope.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Body of `GET /v1/status`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub tenant: String,
    pub control_queue: String,
    pub broker_connected: bool,
    pub counters: StatsSnapshot,
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /version
pub async fn version(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.info.name,
        "version": state.info.version,
    }))
}

/// GET /v1/status
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    let counters = state.stats.snapshot();
    ApiResponse::ok(StatusReport {
        tenant: state.info.tenant.clone(),
        control_queue: state.info.control_queue.clone(),
        broker_connected: counters.connected,
        counters,
    })
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = render_prometheus(&state.stats.snapshot());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use solver_dispatch::DispatchStats;

    use crate::{ServiceInfo, build_router};

    fn test_info() -> ServiceInfo {
        ServiceInfo {
            name: "solverd".to_string(),
            version: "0.1.0".to_string(),
            tenant: "acme".to_string(),
            control_queue: "control".to_string(),
        }
    }

    async fn get(stats: Arc<DispatchStats>, uri: &str) -> (StatusCode, String, Vec<u8>) {
        let app = build_router(test_info(), stats);
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, content_type, body)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, _, body) = get(Arc::new(DispatchStats::new()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn version_reports_name_and_version() {
        let (status, _, body) = get(Arc::new(DispatchStats::new()), "/version").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["name"], "solverd");
        assert_eq!(json["version"], "0.1.0");
    }

    #[tokio::test]
    async fn status_reports_counters() {
        let stats = Arc::new(DispatchStats::new());
        stats.record_received();
        stats.record_published();
        stats.set_connected(true);

        let (status, _, body) = get(stats, "/v1/status").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["tenant"], "acme");
        assert_eq!(json["data"]["broker_connected"], true);
        assert_eq!(json["data"]["counters"]["received"], 1);
        assert_eq!(json["data"]["counters"]["published"], 1);
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let stats = Arc::new(DispatchStats::new());
        stats.record_dropped();

        let (status, content_type, body) = get(stats, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.contains("text/plain"));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("solver_controller_messages_dropped_total 1"));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _, _) = get(Arc::new(DispatchStats::new()), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
