//! Predit Backend Library
//!
//! Predicts when the next 10x+ round is likely, from the recent round
//! history kept in the realtime store. The engine is pure; the history
//! source, service and HTTP layer are thin glue around it.

pub mod api;
pub mod config;
pub mod engine;
pub mod history;
pub mod middleware;
pub mod models;
pub mod service;

pub use config::{AppConfig, EvaluatorConfig};
pub use engine::{HistoryWindow, RuleEvaluator, Tier};
pub use models::{OutcomeRecord, PredictionResponse, PredictionResult, RuleName};
pub use service::PredictionService;
