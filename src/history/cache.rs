//! Short-lived read cache in front of a [`HistorySource`].
//!
//! Dashboards poll every few seconds; the cache keeps bursts of polls from
//! each hitting the store. Only successful snapshots are cached.

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

use super::HistorySource;

pub struct CachedHistorySource<S> {
    inner: S,
    ttl: Duration,
    last: Mutex<Option<(Instant, Value)>>,
}

impl<S: HistorySource> CachedHistorySource<S> {
    /// A zero `ttl` disables caching.
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            last: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn fresh(&self) -> Option<Value> {
        if self.ttl.is_zero() {
            return None;
        }
        let guard = self.last.lock();
        guard
            .as_ref()
            .filter(|(fetched_at, _)| fetched_at.elapsed() < self.ttl)
            .map(|(_, snapshot)| snapshot.clone())
    }
}

#[async_trait::async_trait]
impl<S: HistorySource> HistorySource for CachedHistorySource<S> {
    async fn fetch_history(&self) -> Result<Value> {
        if let Some(snapshot) = self.fresh() {
            debug!(source = self.inner.name(), "serving cached history snapshot");
            return Ok(snapshot);
        }

        let snapshot = self.inner.fetch_history().await?;
        if !self.ttl.is_zero() {
            *self.last.lock() = Some((Instant::now(), snapshot.clone()));
        }
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
