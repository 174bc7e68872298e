//! Predit - next 10x+ round timing service
//!
//! Serves `GET /bet/10-plus` for the desktop dashboards.

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::{path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use predit_backend::{
    api::{self, AppState},
    config::AppConfig,
    history::{CachedHistorySource, HistorySource, RtdbHistoryClient},
    service::PredictionService,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    info!("🚀 Predit starting");
    info!(
        urls = ?config.db_urls,
        path = %config.history_path,
        window = config.window_size,
        cache_ttl_ms = config.cache_ttl_ms,
        "📊 History store configured"
    );

    let rtdb = RtdbHistoryClient::from_config(&config)?;
    let source: Arc<dyn HistorySource> = Arc::new(CachedHistorySource::new(
        rtdb,
        Duration::from_millis(config.cache_ttl_ms),
    ));

    let predictions = Arc::new(PredictionService::from_config(source, &config));
    let app = api::router(AppState { predictions });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predit_backend=info,predit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // cwd + parents
    let _ = dotenv();

    // Also try the crate root, for runs with --manifest-path from elsewhere.
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
