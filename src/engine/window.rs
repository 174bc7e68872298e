//! History Window
//!
//! Assembles parsed records from a store snapshot (`day -> {key -> line}`)
//! into a bounded, chronologically ordered window of the most recent rounds.

use serde_json::Value;
use tracing::debug;

use super::record::{parse_day, parse_value};
use crate::models::OutcomeRecord;

pub const DEFAULT_WINDOW_SIZE: usize = 60;

/// Ascending-by-timestamp slice of the most recent outcomes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryWindow {
    records: Vec<OutcomeRecord>,
}

impl HistoryWindow {
    /// Sort `records` by timestamp (stable, so ties keep arrival order) and
    /// keep the last `limit`. A non-positive limit is clamped to 1.
    pub fn from_records(mut records: Vec<OutcomeRecord>, limit: i64) -> Self {
        let limit = clamp_limit(limit);
        records.sort_by_key(|r| r.timestamp);

        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);

        Self { records }
    }

    /// Build a window from a raw store snapshot.
    ///
    /// Any shape other than an object of objects yields an empty window.
    /// Day keys that are not `YYYY-MM-DD` and lines that fail to parse are
    /// skipped.
    pub fn from_snapshot(snapshot: &Value, limit: i64) -> Self {
        let Some(days) = snapshot.as_object() else {
            return Self::default();
        };

        let records: Vec<OutcomeRecord> = days
            .iter()
            .filter_map(|(key, entries)| {
                let Some(day) = parse_day(key) else {
                    debug!(day_key = %key, "skipping history day with unparsable key");
                    return None;
                };
                Some((day, entries.as_object()?))
            })
            .flat_map(|(day, entries)| {
                entries
                    .values()
                    .filter_map(move |value| parse_value(value, day))
            })
            .collect();

        Self::from_records(records, limit)
    }

    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&OutcomeRecord> {
        self.records.last()
    }

    /// Positions of records whose multiplier reaches `threshold`.
    pub fn high_indices(&self, threshold: f64) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_high(threshold))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn raw_lines(&self) -> Vec<String> {
        self.records.iter().map(|r| r.raw.clone()).collect()
    }
}

fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit.max(1)).unwrap_or(usize::MAX)
}
