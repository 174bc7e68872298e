//! Time-Safety Guard
//!
//! Gap arithmetic on historical timestamps can land in the past relative to
//! the reference clock (drift, zone skew, request latency). Every predicted
//! time goes through [`ensure_future`] before it is returned.

use chrono::{Duration, NaiveDateTime};

pub const DEFAULT_STEP_SECS: i64 = 30;

/// Return `candidate` if it is already after `reference`, otherwise push it
/// forward by the smallest whole number of `step_secs` steps that puts it
/// strictly after `reference`. A non-positive step falls back to 30 s.
pub fn ensure_future(
    candidate: NaiveDateTime,
    reference: NaiveDateTime,
    step_secs: i64,
) -> NaiveDateTime {
    let step = if step_secs <= 0 {
        DEFAULT_STEP_SECS
    } else {
        step_secs
    };

    if candidate > reference {
        return candidate;
    }

    let behind = (reference - candidate).num_seconds();
    let steps = behind / step + 1;
    candidate + Duration::seconds(steps * step)
}
