//! solver-api — HTTP surface of the solver controller.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Liveness |
//! | GET | `/version` | Crate name and version |
//! | GET | `/v1/status` | Dispatcher counters and broker connectivity |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;
pub mod prometheus;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use solver_dispatch::DispatchStats;

/// Static facts about this controller instance.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub tenant: String,
    pub control_queue: String,
}

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub info: Arc<ServiceInfo>,
    pub stats: Arc<DispatchStats>,
}

/// Build the API router.
pub fn build_router(info: ServiceInfo, stats: Arc<DispatchStats>) -> Router {
    let state = ApiState {
        info: Arc::new(info),
        stats,
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/v1/status", get(handlers::status))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
