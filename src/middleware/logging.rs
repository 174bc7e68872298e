//! Request logging middleware.
//!
//! One line per prediction request: method, path, the `limit` override if
//! any, status and latency. Health probes are not logged.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_server_error() {
        // usually the history store being unreachable (502)
        warn!(
            %method,
            %path,
            %query,
            status = status.as_u16(),
            latency_ms,
            "Prediction request failed"
        );
    } else if status.is_client_error() {
        info!(
            %method,
            %path,
            %query,
            status = status.as_u16(),
            latency_ms,
            "Request rejected"
        );
    } else {
        info!(
            %method,
            %path,
            %query,
            status = status.as_u16(),
            latency_ms,
            "Request completed"
        );
    }

    response
}
