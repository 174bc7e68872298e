use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use super::HistorySource;

/// Serves a fixed snapshot, e.g. a JSON export of the store.
#[derive(Debug, Clone)]
pub struct SnapshotHistorySource {
    snapshot: Value,
}

impl SnapshotHistorySource {
    pub fn new(snapshot: Value) -> Self {
        Self { snapshot }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in snapshot {}", path.display()))?;
        Ok(Self { snapshot })
    }
}

#[async_trait::async_trait]
impl HistorySource for SnapshotHistorySource {
    async fn fetch_history(&self) -> Result<Value> {
        Ok(self.snapshot.clone())
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"2026-10-18": {{"a": "1.5x - 10:00:00"}}}}"#).unwrap();

        let source = SnapshotHistorySource::from_file(file.path()).unwrap();
        let snapshot = source.fetch_history().await.unwrap();
        assert_eq!(snapshot["2026-10-18"]["a"], "1.5x - 10:00:00");
    }

    #[test]
    fn test_from_file_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(SnapshotHistorySource::from_file(file.path()).is_err());
    }
}
