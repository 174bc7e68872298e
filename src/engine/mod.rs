//! Prediction engine: record parsing, window assembly, the time-safety guard
//! and the tiered rule evaluator. Pure; no I/O.

pub mod evaluator;
pub mod fallback;
pub mod guard;
pub mod record;
pub mod window;

pub use evaluator::{RuleEvaluator, Tier};
pub use fallback::FallbackAssessment;
pub use guard::ensure_future;
pub use record::{parse_line, parse_value};
pub use window::{HistoryWindow, DEFAULT_WINDOW_SIZE};
