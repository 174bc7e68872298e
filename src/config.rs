//! Configuration
//!
//! Two layers:
//! - [`EvaluatorConfig`]: rule thresholds, loaded from a TOML file
//!   (`PREDIT_CONFIG_PATH`, default `predit.toml`). Defaults apply only when
//!   the file is absent; a file that fails to parse is an error.
//! - [`AppConfig`]: server, history-store and window settings from the
//!   environment (`.env` supported).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::engine::guard::DEFAULT_STEP_SECS;
use crate::engine::window::DEFAULT_WINDOW_SIZE;
use crate::models::HIGH_MULTIPLIER;

pub const DEFAULT_DB_URLS: [&str; 2] = [
    "https://multiplicadores-online-default-rtdb.europe-west1.firebasedatabase.app",
    "https://multiplicadores-online-default-rtdb.firebaseio.com",
];
pub const DEFAULT_HISTORY_PATH: &str = "aviator/historico";
const DEFAULT_CONFIG_PATH: &str = "predit.toml";

/// Thresholds used by the tiered rule evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Multiplier at or above which a round is a "high"
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,

    /// How long the mirror rule stays active after the last high (seconds)
    #[serde(default = "default_mirror_window_secs")]
    pub mirror_window_secs: i64,

    /// Smallest gap between the two last highs the mirror rule accepts (seconds)
    #[serde(default = "default_mirror_min_gap_secs")]
    pub mirror_min_gap_secs: i64,

    /// Largest gap between the two last highs the mirror rule accepts (seconds)
    #[serde(default = "default_mirror_max_gap_secs")]
    pub mirror_max_gap_secs: i64,

    /// First checkpoint, counted from the end of the mirror window (seconds)
    #[serde(default = "default_first_checkpoint_secs")]
    pub first_checkpoint_secs: i64,

    /// Second checkpoint, counted from the end of the mirror window (seconds)
    #[serde(default = "default_second_checkpoint_secs")]
    pub second_checkpoint_secs: i64,

    /// Step used to push stale predictions into the future (seconds)
    #[serde(default = "default_guard_step_secs")]
    pub guard_step_secs: i64,
}

fn default_high_threshold() -> f64 {
    HIGH_MULTIPLIER
}

fn default_mirror_window_secs() -> i64 {
    150
}

fn default_mirror_min_gap_secs() -> i64 {
    30
}

fn default_mirror_max_gap_secs() -> i64 {
    300
}

fn default_first_checkpoint_secs() -> i64 {
    240
}

fn default_second_checkpoint_secs() -> i64 {
    300
}

fn default_guard_step_secs() -> i64 {
    DEFAULT_STEP_SECS
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            high_threshold: default_high_threshold(),
            mirror_window_secs: default_mirror_window_secs(),
            mirror_min_gap_secs: default_mirror_min_gap_secs(),
            mirror_max_gap_secs: default_mirror_max_gap_secs(),
            first_checkpoint_secs: default_first_checkpoint_secs(),
            second_checkpoint_secs: default_second_checkpoint_secs(),
            guard_step_secs: default_guard_step_secs(),
        }
    }
}

/// Upper bound for every duration threshold (one day).
const MAX_THRESHOLD_SECS: i64 = 24 * 60 * 60;

impl EvaluatorConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Invalid evaluator config in {}", path.display()))?;

        let validated = config.clone().validated();
        if validated != config {
            warn!(
                "Evaluator config in {} clamped to {:?}",
                path.display(),
                validated
            );
        }
        Ok(validated)
    }

    /// Load from `PREDIT_CONFIG_PATH` (or `predit.toml`), defaulting when absent.
    pub fn from_env() -> Result<Self> {
        let path =
            std::env::var("PREDIT_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_or_default(&path)
    }

    /// Defaults when `path` does not exist; a file that exists must parse.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Using default evaluator config ({} not found)", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Clamp thresholds into a usable range.
    ///
    /// Durations land in `0..=1 day` (the guard step in `1..=1 day`), the
    /// second checkpoint never precedes the first and the mirror gap bounds
    /// stay ordered. A threshold that is not a positive finite number reverts
    /// to the default.
    pub fn validated(self) -> Self {
        let clamp = |secs: i64, min: i64| secs.clamp(min, MAX_THRESHOLD_SECS);

        let high_threshold = if self.high_threshold.is_finite() && self.high_threshold > 0.0 {
            self.high_threshold
        } else {
            default_high_threshold()
        };
        let mirror_min_gap_secs = clamp(self.mirror_min_gap_secs, 0);
        let first_checkpoint_secs = clamp(self.first_checkpoint_secs, 0);

        Self {
            high_threshold,
            mirror_window_secs: clamp(self.mirror_window_secs, 0),
            mirror_min_gap_secs,
            mirror_max_gap_secs: clamp(self.mirror_max_gap_secs, mirror_min_gap_secs),
            first_checkpoint_secs,
            second_checkpoint_secs: clamp(self.second_checkpoint_secs, first_checkpoint_secs),
            guard_step_secs: clamp(self.guard_step_secs, 1),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Store base URLs, tried in order
    pub db_urls: Vec<String>,
    pub history_path: String,
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
    /// `0` disables the read cache
    pub cache_ttl_ms: u64,
    pub window_size: i64,
    pub max_window_size: i64,
    /// Fixed offset from UTC for "now"; local time when unset
    pub utc_offset_minutes: Option<i32>,
    pub evaluator: EvaluatorConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.evaluator = EvaluatorConfig::from_env()?;
        Ok(config)
    }

    /// Build from an arbitrary key lookup. The evaluator section is left at
    /// its defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {raw}"))?,
            None => 5000,
        };

        let db_urls: Vec<String> = match (var("FIREBASE_DB_URLS"), var("FIREBASE_DB_URL")) {
            (Some(list), _) => list
                .split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            (None, Some(url)) => vec![url.trim().trim_end_matches('/').to_string()],
            (None, None) => DEFAULT_DB_URLS.iter().map(|s| s.to_string()).collect(),
        };

        let history_path = var("FIREBASE_HISTORY_PATH")
            .map(|p| p.trim().trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_HISTORY_PATH.to_string());

        let auth_token = var("FIREBASE_AUTH_TOKEN");

        let request_timeout_secs = var("HISTORY_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(10);

        let cache_ttl_ms = var("HISTORY_CACHE_TTL_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(2_000);

        let window_size = var("WINDOW_SIZE")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_WINDOW_SIZE as i64);

        let max_window_size = var("MAX_WINDOW_SIZE")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(500);

        let utc_offset_minutes = var("UTC_OFFSET_MINUTES")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .filter(|m| m.abs() < 24 * 60);

        Ok(Self {
            port,
            db_urls,
            history_path,
            auth_token,
            request_timeout_secs,
            cache_ttl_ms,
            window_size,
            max_window_size,
            utc_offset_minutes,
            evaluator: EvaluatorConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.db_urls.len(), 2);
        assert_eq!(config.history_path, "aviator/historico");
        assert_eq!(config.window_size, 60);
        assert_eq!(config.cache_ttl_ms, 2_000);
        assert!(config.auth_token.is_none());
        assert!(config.utc_offset_minutes.is_none());
        assert_eq!(config.evaluator, EvaluatorConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("FIREBASE_DB_URLS", "https://a.example/, https://b.example"),
            ("FIREBASE_HISTORY_PATH", "/game/history/"),
            ("FIREBASE_AUTH_TOKEN", "secret"),
            ("HISTORY_CACHE_TTL_MS", "0"),
            ("WINDOW_SIZE", "120"),
            ("UTC_OFFSET_MINUTES", "-180"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.db_urls, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.history_path, "game/history");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.cache_ttl_ms, 0);
        assert_eq!(config.window_size, 120);
        assert_eq!(config.utc_offset_minutes, Some(-180));
    }

    #[test]
    fn test_single_db_url() {
        let config =
            AppConfig::from_lookup(lookup(&[("FIREBASE_DB_URL", "https://only.example/")]))
                .unwrap();
        assert_eq!(config.db_urls, vec!["https://only.example"]);
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        assert!(AppConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mirror_window_secs = 120\nguard_step_secs = 15").unwrap();

        let config = EvaluatorConfig::load(file.path()).unwrap();
        assert_eq!(config.mirror_window_secs, 120);
        assert_eq!(config.guard_step_secs, 15);
        assert_eq!(config.high_threshold, 10.0);
        assert_eq!(config.second_checkpoint_secs, 300);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        assert_eq!(
            EvaluatorConfig::load_or_default("/nonexistent/predit.toml").unwrap(),
            EvaluatorConfig::default()
        );
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mirror_window_secs = \"soon\"").unwrap();

        let err = EvaluatorConfig::load_or_default(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid evaluator config"));
    }

    #[test]
    fn test_app_config_rejects_broken_evaluator_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mirror_window_secs = \"soon\"").unwrap();

        // Only this test reads PREDIT_CONFIG_PATH.
        std::env::set_var("PREDIT_CONFIG_PATH", file.path());
        let result = AppConfig::from_env();
        std::env::remove_var("PREDIT_CONFIG_PATH");

        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_thresholds_are_clamped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "high_threshold = -2.0\n\
             mirror_window_secs = -10\n\
             mirror_min_gap_secs = 400\n\
             mirror_max_gap_secs = 100\n\
             first_checkpoint_secs = 9223372036854775807\n\
             second_checkpoint_secs = 60\n\
             guard_step_secs = 0"
        )
        .unwrap();

        let config = EvaluatorConfig::load(file.path()).unwrap();
        assert_eq!(config.high_threshold, 10.0);
        assert_eq!(config.mirror_window_secs, 0);
        assert_eq!(config.mirror_min_gap_secs, 400);
        assert_eq!(config.mirror_max_gap_secs, 400);
        assert_eq!(config.first_checkpoint_secs, 86_400);
        assert_eq!(config.second_checkpoint_secs, 86_400);
        assert_eq!(config.guard_step_secs, 1);
    }

    #[test]
    fn test_defaults_are_already_valid() {
        assert_eq!(
            EvaluatorConfig::default().validated(),
            EvaluatorConfig::default()
        );
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EvaluatorConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: EvaluatorConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }
}
