//! monkey-api — the HTTP surface of kube-monkey.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness, always `ok` |
//! | GET | `/chaosmetrics` | Recent kill counts, plain text |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use monkey_metrics::MetricsCollector;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub metrics: Arc<MetricsCollector>,
}

pub fn build_router(metrics: Arc<MetricsCollector>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/chaosmetrics", get(handlers::chaos_metrics))
        .with_state(ApiState { metrics })
}
