//! One-shot prediction
//!
//! Evaluates the current history once and prints the response as JSON.
//!
//! Usage:
//!   cargo run --bin predit-once
//!   cargo run --bin predit-once -- --snapshot ./historico.json --now "2026-10-18 21:04:00"
//!   cargo run --bin predit-once -- --limit 120 --config ./predit.toml

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use predit_backend::{
    config::{AppConfig, EvaluatorConfig},
    engine::RuleEvaluator,
    history::{HistorySource, RtdbHistoryClient, SnapshotHistorySource},
    service::{Clock, FixedClock, PredictionService, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "predit-once")]
#[command(about = "Evaluate the next 10x+ prediction once and print it as JSON")]
struct Cli {
    /// Evaluate a local JSON export of the history instead of the live store
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Window size override
    #[arg(short, long)]
    limit: Option<i64>,

    /// Evaluate as of this local time ("YYYY-MM-DD HH:MM:SS")
    #[arg(long, value_parser = parse_now)]
    now: Option<NaiveDateTime>,

    /// Evaluator TOML config (defaults to PREDIT_CONFIG_PATH / predit.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Single-line JSON output
    #[arg(long)]
    compact: bool,
}

fn parse_now(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("expected \"YYYY-MM-DD HH:MM:SS\": {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predit_backend=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(path) = &cli.config {
        config.evaluator = EvaluatorConfig::load(path)?;
    }

    let source: Arc<dyn HistorySource> = match &cli.snapshot {
        Some(path) => Arc::new(SnapshotHistorySource::from_file(path)?),
        None => Arc::new(RtdbHistoryClient::from_config(&config)?),
    };

    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(FixedClock(now)),
        None => Arc::new(SystemClock {
            utc_offset_minutes: config.utc_offset_minutes,
        }),
    };

    let evaluator = RuleEvaluator::new(config.evaluator.clone());
    let service = PredictionService::new(source, evaluator, clock)
        .with_window_limits(config.window_size, config.max_window_size);

    let response = service.current_prediction(cli.limit).await?;
    let json = if cli.compact {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };
    println!("{json}");

    Ok(())
}
