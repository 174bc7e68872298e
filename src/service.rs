//! Prediction service: the "get current prediction" entry point.
//!
//! fetch snapshot -> build window -> evaluate -> response

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::engine::{HistoryWindow, RuleEvaluator};
use crate::history::HistorySource;
use crate::models::PredictionResponse;

/// Source of "now" for evaluations.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock. Local time unless a fixed UTC offset is configured, for hosts
/// whose zone differs from the one the history was recorded in.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    pub utc_offset_minutes: Option<i32>,
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.utc_offset_minutes {
            Some(minutes) => Utc::now().naive_utc() + Duration::minutes(minutes as i64),
            None => Local::now().naive_local(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub struct PredictionService {
    source: Arc<dyn HistorySource>,
    evaluator: RuleEvaluator,
    clock: Arc<dyn Clock>,
    default_window: i64,
    max_window: i64,
}

impl PredictionService {
    pub fn new(
        source: Arc<dyn HistorySource>,
        evaluator: RuleEvaluator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            evaluator,
            clock,
            default_window: crate::engine::DEFAULT_WINDOW_SIZE as i64,
            max_window: 500,
        }
    }

    pub fn from_config(source: Arc<dyn HistorySource>, config: &AppConfig) -> Self {
        let clock = SystemClock {
            utc_offset_minutes: config.utc_offset_minutes,
        };
        Self::new(
            source,
            RuleEvaluator::new(config.evaluator.clone()),
            Arc::new(clock),
        )
        .with_window_limits(config.window_size, config.max_window_size)
    }

    pub fn with_window_limits(mut self, default_window: i64, max_window: i64) -> Self {
        self.max_window = max_window.max(1);
        self.default_window = default_window.clamp(1, self.max_window);
        self
    }

    /// Fetch, evaluate and package the current prediction. Only a failing
    /// history source produces an error.
    pub async fn current_prediction(&self, limit: Option<i64>) -> Result<PredictionResponse> {
        let limit = limit.unwrap_or(self.default_window).min(self.max_window);

        let snapshot = self
            .source
            .fetch_history()
            .await
            .with_context(|| format!("Failed to load history from {}", self.source.name()))?;

        let window = HistoryWindow::from_snapshot(&snapshot, limit);
        let now = self.clock.now();
        let analysis = self.evaluator.evaluate(&window, now);

        info!(
            rule = analysis.rule.as_str(),
            predicted_time = analysis.predicted_time.as_deref().unwrap_or("-"),
            records = window.len(),
            "🎯 prediction evaluated"
        );

        Ok(PredictionResponse::new(analysis, window.raw_lines()))
    }
}
