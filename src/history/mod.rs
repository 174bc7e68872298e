//! History sources
//!
//! The engine only needs the raw store snapshot (`day -> {key -> line}`).
//! Where it comes from sits behind [`HistorySource`]:
//! - [`RtdbHistoryClient`]: the realtime database REST API
//! - [`CachedHistorySource`]: short-lived read cache in front of any source
//! - [`SnapshotHistorySource`]: a fixed JSON value or exported file

pub mod cache;
pub mod rtdb;
pub mod snapshot;

use anyhow::Result;
use serde_json::Value;

pub use cache::CachedHistorySource;
pub use rtdb::RtdbHistoryClient;
pub use snapshot::SnapshotHistorySource;

#[async_trait::async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch the full history snapshot. A missing or oddly shaped snapshot is
    /// not an error; transport failures are.
    async fn fetch_history(&self) -> Result<Value>;

    fn name(&self) -> &str;
}
