//! Record Parser
//!
//! Turns one raw history line (`"<multiplier>x - HH:MM:SS"`) plus the calendar
//! day it was stored under into an [`OutcomeRecord`]. Anything that does not
//! match is rejected with `None`; the caller skips it.

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::models::OutcomeRecord;

/// Parse a raw line stored under `day`.
///
/// The line must start with the multiplier (digits and `.` only) immediately
/// followed by `x`, then optional whitespace, `-`, optional whitespace and a
/// two-digit `HH:MM:SS` time. Text after the time is ignored.
pub fn parse_line(raw: &str, day: NaiveDate) -> Option<OutcomeRecord> {
    let number_len = raw
        .bytes()
        .take_while(|b| b.is_ascii_digit() || *b == b'.')
        .count();
    if number_len == 0 {
        return None;
    }

    let (number, rest) = raw.split_at(number_len);
    let rest = rest.strip_prefix('x')?;
    let rest = rest.trim_start().strip_prefix('-')?.trim_start();

    let time = parse_clock(rest)?;
    let multiplier: f64 = number.parse().ok()?;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return None;
    }

    Some(OutcomeRecord {
        timestamp: day.and_time(time),
        multiplier,
        raw: raw.to_string(),
    })
}

/// Parse a JSON value from the store. Non-string values are rejected.
pub fn parse_value(value: &Value, day: NaiveDate) -> Option<OutcomeRecord> {
    value.as_str().and_then(|raw| parse_line(raw, day))
}

/// Parse a `YYYY-MM-DD` day key.
pub fn parse_day(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Strict `HH:MM:SS` prefix, two digits per field.
fn parse_clock(s: &str) -> Option<NaiveTime> {
    let clock = s.get(..8)?;
    let shape_ok = clock.bytes().enumerate().all(|(i, b)| match i {
        2 | 5 => b == b':',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    NaiveTime::parse_from_str(clock, "%H:%M:%S").ok()
}
