//! Realtime Database REST client
//!
//! Read-only: `GET {base}/{path}.json[?auth=token]`. Base URLs are tried in
//! order and the first successful response wins.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::HistorySource;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct RtdbHistoryClient {
    client: Client,
    base_urls: Vec<String>,
    path: String,
    auth_token: Option<String>,
}

impl RtdbHistoryClient {
    pub fn new(
        base_urls: Vec<String>,
        path: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if base_urls.is_empty() {
            return Err(anyhow!("No history store URL configured"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to build history store client")?;

        Ok(Self {
            client,
            base_urls,
            path: path.into(),
            auth_token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.db_urls.clone(),
            config.history_path.clone(),
            config.auth_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    #[inline]
    fn url(&self, base: &str) -> String {
        format!("{}/{}.json", base.trim_end_matches('/'), self.path)
    }

    async fn fetch_from(&self, base: &str) -> Result<Value> {
        let mut req = self.client.get(self.url(base));
        if let Some(token) = &self.auth_token {
            req = req.query(&[("auth", token.as_str())]);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.path))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("GET {} {}: {}", self.path, status, text));
        }

        resp.json::<Value>()
            .await
            .context("Failed to parse history snapshot")
    }
}

#[async_trait::async_trait]
impl HistorySource for RtdbHistoryClient {
    async fn fetch_history(&self) -> Result<Value> {
        let mut errors = Vec::with_capacity(self.base_urls.len());

        for base in &self.base_urls {
            let started = Instant::now();
            match self.fetch_from(base).await {
                Ok(snapshot) => {
                    debug!(
                        base = %base,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "history snapshot fetched"
                    );
                    return Ok(snapshot);
                }
                Err(e) => {
                    let reason = format!("{e:#}");
                    warn!(base = %base, error = %reason, "history store request failed");
                    errors.push(format!("{base}: {reason}"));
                }
            }
        }

        Err(anyhow!("History store unavailable ({})", errors.join("; ")))
    }

    fn name(&self) -> &str {
        "rtdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn spawn_store(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(bases: Vec<String>, token: Option<&str>) -> RtdbHistoryClient {
        RtdbHistoryClient::new(
            bases,
            "aviator/historico",
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetches_snapshot_with_auth() {
        let app = Router::new().route(
            "/aviator/historico.json",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if q.get("auth").map(String::as_str) != Some("tok") {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(json!({"2026-10-18": {"a": "12x - 10:00:00"}})))
            }),
        );
        let base = spawn_store(app).await;

        let snapshot = client(vec![base.clone()], Some("tok"))
            .fetch_history()
            .await
            .unwrap();
        assert_eq!(snapshot["2026-10-18"]["a"], "12x - 10:00:00");

        assert!(client(vec![base], None).fetch_history().await.is_err());
    }

    #[tokio::test]
    async fn test_falls_through_to_next_base_url() {
        let failing = Router::new().route(
            "/aviator/historico.json",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let working = Router::new().route(
            "/aviator/historico.json",
            get(|| async { Json(Value::Null) }),
        );
        let bad = spawn_store(failing).await;
        let good = spawn_store(working).await;

        let snapshot = client(vec![bad.clone(), good], None)
            .fetch_history()
            .await
            .unwrap();
        assert!(snapshot.is_null());

        let err = client(vec![bad], None).fetch_history().await.unwrap_err();
        assert!(err.to_string().contains("History store unavailable"));
    }

    #[test]
    fn test_requires_a_base_url() {
        assert!(RtdbHistoryClient::new(vec![], "x", None, Duration::from_secs(1)).is_err());
    }
}
