//! Tiered Rule Evaluator
//!
//! Picks exactly one rule per call, in strict priority order:
//!
//! 1. [`Tier::InsufficientData`] - empty window or no high in it
//! 2. [`Tier::MirrorInterval`] - within the mirror window after the last high,
//!    repeat the gap between the two last highs
//! 3. [`Tier::FixedDelay`] - fixed checkpoints after the mirror window
//! 4. [`Tier::StatisticalFallback`] - pressure model once both checkpoints passed
//!
//! Nothing is carried between calls: the tier is recomputed from
//! `(window, now)` every time, and the same inputs always give the same result.

use chrono::{Duration, NaiveDateTime, Timelike};

use super::fallback;
use super::guard::ensure_future;
use super::window::HistoryWindow;
use crate::config::EvaluatorConfig;
use crate::models::{OutcomeRecord, PredictionResult, RuleName};

/// The evaluator's decision tiers, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    InsufficientData,
    MirrorInterval,
    FixedDelay,
    StatisticalFallback,
}

/// Tiers that may decline; the statistical fallback always answers.
const TIME_WINDOWED_TIERS: [Tier; 2] = [Tier::MirrorInterval, Tier::FixedDelay];

/// Per-call view of the window once at least one high exists.
#[derive(Debug)]
struct EvalContext<'a> {
    records: &'a [OutcomeRecord],
    high_indices: Vec<usize>,
    /// `max(now, newest record)`, so predictions never target the data's past
    reference: NaiveDateTime,
}

impl<'a> EvalContext<'a> {
    fn new(window: &'a HistoryWindow, now: NaiveDateTime, high_threshold: f64) -> Option<Self> {
        let newest = window.last()?.timestamp;
        let high_indices = window.high_indices(high_threshold);
        if high_indices.is_empty() {
            return None;
        }

        Some(Self {
            records: window.records(),
            high_indices,
            reference: now.max(newest),
        })
    }

    fn last_high_index(&self) -> usize {
        self.high_indices[self.high_indices.len() - 1]
    }

    fn last_high(&self) -> &OutcomeRecord {
        &self.records[self.last_high_index()]
    }

    fn second_last_high(&self) -> Option<&OutcomeRecord> {
        let n = self.high_indices.len();
        (n >= 2).then(|| &self.records[self.high_indices[n - 2]])
    }

    fn secs_since_last_high(&self) -> i64 {
        (self.reference - self.last_high().timestamp).num_seconds()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator {
    config: EvaluatorConfig,
}

impl RuleEvaluator {
    /// Thresholds are clamped through [`EvaluatorConfig::validated`].
    pub fn new(config: EvaluatorConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    /// Evaluate the window at `now` (truncated to whole seconds).
    pub fn evaluate(&self, window: &HistoryWindow, now: NaiveDateTime) -> PredictionResult {
        let now = truncate_to_second(now);
        let Some(ctx) = EvalContext::new(window, now, self.config.high_threshold) else {
            return insufficient_data(window);
        };

        TIME_WINDOWED_TIERS
            .iter()
            .find_map(|tier| self.apply(*tier, &ctx))
            .unwrap_or_else(|| self.statistical_fallback(&ctx))
    }

    /// Which tier `evaluate` would use for these inputs.
    pub fn select_tier(&self, window: &HistoryWindow, now: NaiveDateTime) -> Tier {
        let now = truncate_to_second(now);
        let Some(ctx) = EvalContext::new(window, now, self.config.high_threshold) else {
            return Tier::InsufficientData;
        };

        TIME_WINDOWED_TIERS
            .iter()
            .copied()
            .find(|tier| self.apply(*tier, &ctx).is_some())
            .unwrap_or(Tier::StatisticalFallback)
    }

    fn apply(&self, tier: Tier, ctx: &EvalContext<'_>) -> Option<PredictionResult> {
        match tier {
            Tier::MirrorInterval => self.mirror_interval(ctx),
            Tier::FixedDelay => self.fixed_delay(ctx),
            Tier::StatisticalFallback => Some(self.statistical_fallback(ctx)),
            Tier::InsufficientData => None,
        }
    }

    fn mirror_interval(&self, ctx: &EvalContext<'_>) -> Option<PredictionResult> {
        let cfg = &self.config;
        let last = ctx.last_high();
        let second_last = ctx.second_last_high()?;

        // Lower rounds after the last high do not reset this window.
        if ctx.secs_since_last_high() >= cfg.mirror_window_secs {
            return None;
        }

        let gap = (last.timestamp - second_last.timestamp).num_seconds();
        if gap < cfg.mirror_min_gap_secs || gap > cfg.mirror_max_gap_secs {
            return None;
        }

        let candidate = last.timestamp + Duration::seconds(gap.max(cfg.mirror_window_secs));
        let predicted = ensure_future(candidate, ctx.reference, cfg.guard_step_secs);

        Some(
            PredictionResult::wait(
                RuleName::MirrorInterval,
                "Mirroring the gap between the last two highs while inside the 2:30 window.",
            )
            .with_interval(gap)
            .with_prediction(predicted),
        )
    }

    fn fixed_delay(&self, ctx: &EvalContext<'_>) -> Option<PredictionResult> {
        let cfg = &self.config;
        let anchor = ctx.last_high().timestamp + Duration::seconds(cfg.mirror_window_secs);
        let first = anchor + Duration::seconds(cfg.first_checkpoint_secs);
        let second = anchor + Duration::seconds(cfg.second_checkpoint_secs);

        let (rule, reason, checkpoint) = if ctx.reference < first {
            (
                RuleName::FixedDelay4Min,
                "Waiting 4 minutes after the fixed 2:30 window.",
                first,
            )
        } else if ctx.reference < second {
            (
                RuleName::FixedDelay5Min,
                "4+2:30 checkpoint passed without a high; moving to 5+2:30.",
                second,
            )
        } else {
            return None;
        };

        let predicted = ensure_future(checkpoint, ctx.reference, cfg.guard_step_secs);
        Some(PredictionResult::wait(rule, reason).with_prediction(predicted))
    }

    fn statistical_fallback(&self, ctx: &EvalContext<'_>) -> PredictionResult {
        let a = fallback::assess(
            ctx.records,
            &ctx.high_indices,
            ctx.last_high_index(),
            ctx.reference,
            self.config.guard_step_secs,
        );

        let mut result = PredictionResult::wait(
            RuleName::StatisticalFallback,
            "No high in the last 5 minutes; using the statistical model.",
        );
        result.pressure_level = Some(a.level);
        result.probability_score = Some(a.score);
        result.current_gap = Some(a.current_gap);
        result.average_gap = Some(a.average_gap);
        result.with_prediction(a.predicted_at)
    }
}

fn insufficient_data(window: &HistoryWindow) -> PredictionResult {
    let reason = if window.is_empty() {
        "No records available for timing analysis."
    } else {
        "No 10x+ multiplier in the window."
    };
    PredictionResult::wait(RuleName::NoHighInWindow, reason)
}

fn truncate_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}
