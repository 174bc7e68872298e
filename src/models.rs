use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Multiplier at or above which a round counts as a "high".
pub const HIGH_MULTIPLIER: f64 = 10.0;

/// One observed round outcome, as parsed from the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub timestamp: NaiveDateTime,
    pub multiplier: f64,
    /// Original line, kept verbatim for display.
    pub raw: String,
}

impl OutcomeRecord {
    pub fn is_high(&self, threshold: f64) -> bool {
        self.multiplier >= threshold
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.timestamp.time()
    }
}

/// The engine only ever estimates timing; it never signals "bet now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Wait,
}

/// Rule that produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleName {
    #[serde(rename = "no_high_in_window")]
    NoHighInWindow,
    #[serde(rename = "mirror_interval")]
    MirrorInterval,
    #[serde(rename = "fixed_delay_4min")]
    FixedDelay4Min,
    #[serde(rename = "fixed_delay_5min")]
    FixedDelay5Min,
    #[serde(rename = "statistical_fallback")]
    StatisticalFallback,
}

impl RuleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleName::NoHighInWindow => "no_high_in_window",
            RuleName::MirrorInterval => "mirror_interval",
            RuleName::FixedDelay4Min => "fixed_delay_4min",
            RuleName::FixedDelay5Min => "fixed_delay_5min",
            RuleName::StatisticalFallback => "statistical_fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    Low,
    Medium,
    High,
}

impl PressureLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 0.6 {
            PressureLevel::Low
        } else if score < 1.0 {
            PressureLevel::Medium
        } else {
            PressureLevel::High
        }
    }

    /// Multiplier applied to the estimated wait: more pressure, shorter wait.
    pub fn wait_factor(&self) -> f64 {
        match self {
            PressureLevel::High => 0.6,
            PressureLevel::Medium => 1.0,
            PressureLevel::Low => 1.4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PressureLevel::Low => "low",
            PressureLevel::Medium => "medium",
            PressureLevel::High => "high",
        }
    }
}

/// Result of one evaluation of the history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub decision: Decision,
    pub rule: RuleName,
    pub reason: String,
    /// Predicted wall-clock time of day (`HH:MM:SS`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_at: Option<NaiveDateTime>,
    /// Mirror rule only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_used_seconds: Option<i64>,
    // Statistical fallback only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_level: Option<PressureLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_gap: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_gap: Option<f64>,
}

impl PredictionResult {
    /// A bare "wait" result with no predicted time.
    pub fn wait(rule: RuleName, reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Wait,
            rule,
            reason: reason.into(),
            predicted_time: None,
            predicted_at: None,
            interval_used_seconds: None,
            pressure_level: None,
            probability_score: None,
            current_gap: None,
            average_gap: None,
        }
    }

    pub fn with_prediction(mut self, at: NaiveDateTime) -> Self {
        self.predicted_time = Some(at.format("%H:%M:%S").to_string());
        self.predicted_at = Some(at);
        self
    }

    pub fn with_interval(mut self, seconds: i64) -> Self {
        self.interval_used_seconds = Some(seconds);
        self
    }

    pub fn has_prediction(&self) -> bool {
        self.predicted_at.is_some()
    }
}

/// Payload returned by the "get current prediction" entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub message: String,
    pub decision: Decision,
    pub rule: RuleName,
    pub reason: String,
    pub analysis: PredictionResult,
    /// Raw lines of the evaluated window, oldest first
    pub recent_outcomes: Vec<String>,
}

impl PredictionResponse {
    pub fn new(analysis: PredictionResult, recent_outcomes: Vec<String>) -> Self {
        Self {
            message: "Wait".to_string(),
            decision: analysis.decision,
            rule: analysis.rule,
            reason: analysis.reason.clone(),
            analysis,
            recent_outcomes,
        }
    }
}
