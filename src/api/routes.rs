//! HTTP API
//!
//! # Endpoints
//!
//! - `GET /health` - liveness
//! - `GET /bet/10-plus[?limit=N]` - current next-high prediction

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::middleware::request_logging;
use crate::service::PredictionService;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub predictions: Arc<PredictionService>,
}

#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    /// Window size override
    pub limit: Option<i64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/bet/10-plus", get(get_prediction))
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create an error response with proper status code.
fn error_response(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "error": message });
    (status, Json(body)).into_response()
}

/// GET /health
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /bet/10-plus
pub async fn get_prediction(
    State(state): State<AppState>,
    Query(query): Query<PredictionQuery>,
) -> Response {
    match state.predictions.current_prediction(query.limit).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            warn!("Prediction failed: {:#}", e);
            error_response(StatusCode::BAD_GATEWAY, &format!("{e:#}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleEvaluator;
    use crate::history::{HistorySource, SnapshotHistorySource};
    use crate::service::FixedClock;
    use anyhow::anyhow;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct DownSource;

    #[async_trait::async_trait]
    impl HistorySource for DownSource {
        async fn fetch_history(&self) -> anyhow::Result<Value> {
            Err(anyhow!("connection refused"))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    fn app(source: Arc<dyn HistorySource>) -> Router {
        let now = NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(10, 3, 20)
            .unwrap();
        let service =
            PredictionService::new(source, RuleEvaluator::default(), Arc::new(FixedClock(now)));
        router(AppState {
            predictions: Arc::new(service),
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let source = Arc::new(SnapshotHistorySource::new(Value::Null));
        let (status, body) = get_json(app(source), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_prediction_endpoint() {
        let snapshot = json!({"2026-10-18": {
            "-a": "1.10x - 10:00:00",
            "-b": "23.00x - 10:00:20",
            "-c": "1.05x - 10:00:40"
        }});
        let source = Arc::new(SnapshotHistorySource::new(snapshot));
        let (status, body) = get_json(app(source), "/bet/10-plus").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decision"], "wait");
        assert_eq!(body["rule"], "fixed_delay_4min");
        assert_eq!(body["analysis"]["predicted_time"], "10:06:50");
        assert_eq!(body["recent_outcomes"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_prediction_endpoint_limit() {
        let snapshot = json!({"2026-10-18": {
            "-a": "1.10x - 10:00:00",
            "-b": "23.00x - 10:00:20",
            "-c": "1.05x - 10:00:40"
        }});
        let source = Arc::new(SnapshotHistorySource::new(snapshot));
        let (status, body) = get_json(app(source), "/bet/10-plus?limit=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rule"], "no_high_in_window");
        assert!(body["analysis"].get("predicted_time").is_none());
    }

    #[tokio::test]
    async fn test_source_failure_maps_to_bad_gateway() {
        let (status, body) = get_json(app(Arc::new(DownSource)), "/bet/10-plus").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_malformed_limit_is_rejected() {
        let source = Arc::new(SnapshotHistorySource::new(Value::Null));
        let response = app(source)
            .oneshot(
                Request::builder()
                    .uri("/bet/10-plus?limit=many")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
