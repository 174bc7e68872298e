//! Statistical Fallback Model
//!
//! Used once no time-windowed rule applies (roughly five minutes without a
//! high). Scores how "overdue" the window is from two signals:
//!
//! - pressure: rounds since the last high / median rounds between highs
//! - profile: weighted share of weak (<= 1.3x) and mid (<= 5x) rounds since
//!   the last high
//!
//! `score = 0.6 * pressure + 0.4 * profile`, bucketed into a [`PressureLevel`]
//! that scales the estimated wait.

use chrono::{Duration, NaiveDateTime};

use super::guard::ensure_future;
use crate::models::{OutcomeRecord, PressureLevel};

const DEFAULT_AVERAGE_GAP: f64 = 8.0;
const DEFAULT_STEP_SECS: i64 = 20;
const MIN_ESTIMATE_SECS: i64 = 30;

const WEAK_LOW_MAX: f64 = 1.3;
const MID_LOW_MAX: f64 = 5.0;
const WEAK_LOW_WEIGHT: f64 = 1.2;
const MID_LOW_WEIGHT: f64 = 0.6;

const PRESSURE_WEIGHT: f64 = 0.6;
const PROFILE_WEIGHT: f64 = 0.4;

/// Everything the fallback model derived from the window.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackAssessment {
    pub average_gap: f64,
    pub current_gap: usize,
    pub typical_step_secs: i64,
    pub pressure: f64,
    pub profile_score: f64,
    pub score: f64,
    pub level: PressureLevel,
    pub rounds_remaining: i64,
    pub estimated_secs: i64,
    pub predicted_at: NaiveDateTime,
}

/// Run the model. `high_indices` is ascending and ends with `last_high`.
pub fn assess(
    records: &[OutcomeRecord],
    high_indices: &[usize],
    last_high: usize,
    reference: NaiveDateTime,
    guard_step_secs: i64,
) -> FallbackAssessment {
    let gaps: Vec<f64> = high_indices
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64)
        .collect();
    let average_gap = median(gaps).unwrap_or(DEFAULT_AVERAGE_GAP);
    let current_gap = records.len() - 1 - last_high;

    let typical_step_secs = typical_step_secs(records);
    let pressure = current_gap as f64 / average_gap.max(1.0);

    let profile_score = profile_score(&records[last_high + 1..]);
    let score = round2(pressure * PRESSURE_WEIGHT + profile_score * PROFILE_WEIGHT);
    let level = PressureLevel::from_score(score);

    let rounds_remaining = ((average_gap - current_gap as f64).round_ties_even() as i64).max(1);
    let estimated_secs = ((rounds_remaining * typical_step_secs) as f64 * level.wait_factor())
        .round() as i64;
    let estimated_secs = estimated_secs.max(MIN_ESTIMATE_SECS);

    let predicted_at = ensure_future(
        reference + Duration::seconds(estimated_secs),
        reference,
        guard_step_secs,
    );

    FallbackAssessment {
        average_gap,
        current_gap,
        typical_step_secs,
        pressure,
        profile_score,
        score,
        level,
        rounds_remaining,
        estimated_secs,
        predicted_at,
    }
}

/// Median of the positive second-deltas between consecutive records,
/// truncated to whole seconds.
fn typical_step_secs(records: &[OutcomeRecord]) -> i64 {
    let deltas: Vec<f64> = records
        .windows(2)
        .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_seconds())
        .filter(|&s| s > 0)
        .map(|s| s as f64)
        .collect();

    median(deltas)
        .map(|m| m as i64)
        .unwrap_or(DEFAULT_STEP_SECS)
}

fn profile_score(lows: &[OutcomeRecord]) -> f64 {
    let weak = lows.iter().filter(|r| r.multiplier <= WEAK_LOW_MAX).count() as f64;
    let mid = lows
        .iter()
        .filter(|r| r.multiplier > WEAK_LOW_MAX && r.multiplier <= MID_LOW_MAX)
        .count() as f64;

    (weak * WEAK_LOW_WEIGHT + mid * MID_LOW_WEIGHT) / lows.len().max(1) as f64
}

/// Middle value, or the mean of the two middle values for an even count.
fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
