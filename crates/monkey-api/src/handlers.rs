//! HTTP handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use tracing::warn;

use crate::ApiState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, [("content-type", TEXT_PLAIN)], "ok")
}

/// GET /chaosmetrics
pub async fn chaos_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    match state.metrics.collect(Utc::now()).await {
        Ok(counters) => (
            StatusCode::OK,
            [("content-type", TEXT_PLAIN)],
            monkey_metrics::render_text(&counters),
        ),
        Err(e) => {
            warn!(error = %e, "failed to collect chaos metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", TEXT_PLAIN)],
                e.to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chrono::{DateTime, TimeDelta};
    use monkey_cluster::{
        AuditEvent, ClusterClient, Faults, InMemoryCluster, ObjectReference,
    };
    use monkey_core::Settings;
    use monkey_metrics::MetricsCollector;
    use tower::ServiceExt;

    use super::*;
    use crate::build_router;

    fn chaos_event(name: &str, at: DateTime<Utc>) -> AuditEvent {
        AuditEvent {
            name: name.to_string(),
            namespace: "default".to_string(),
            source_component: "kube-monkey".to_string(),
            event_type: "Warning".to_string(),
            reason: "Chaos".to_string(),
            message: format!("kube-monkey killed pod {name} in deployment api"),
            involved_object: ObjectReference {
                kind: "Pod".to_string(),
                namespace: "default".to_string(),
                name: name.to_string(),
                uid: name.to_string(),
            },
            first_timestamp: at,
            last_timestamp: at,
            count: 1,
        }
    }

    async fn get(cluster: Arc<InMemoryCluster>, uri: &str) -> (StatusCode, String) {
        let metrics = Arc::new(MetricsCollector::new(cluster, &Settings::default()));
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = build_router(metrics).oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (status, body) = get(Arc::new(InMemoryCluster::new()), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn chaos_metrics_counts_recent_kills() {
        let cluster = Arc::new(InMemoryCluster::new());
        let now = Utc::now();
        cluster
            .create_event(&chaos_event("api-0", now - TimeDelta::minutes(1)))
            .await
            .unwrap();
        cluster
            .create_event(&chaos_event("api-1", now - TimeDelta::hours(2)))
            .await
            .unwrap();

        let (status, body) = get(cluster, "/chaosmetrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("pods_killed_last_5_min 1\n"));
        assert!(body.contains("pods_killed_last_60_min 1\n"));
        assert!(body.contains("pods_killed_last_24_hours 2\n"));
    }

    #[tokio::test]
    async fn chaos_metrics_reports_listing_failure() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster
            .set_faults(Faults {
                fail_list_events: true,
                ..Faults::default()
            })
            .await;

        let (status, body) = get(cluster, "/chaosmetrics").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("list events"));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _) = get(Arc::new(InMemoryCluster::new()), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
