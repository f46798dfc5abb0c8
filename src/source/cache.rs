//! TTL cache around a metric source
//!
//! The upstream APIs return whole histories and rate-limit aggressively, so
//! fetched series are kept for a TTL keyed by asset and range.

use super::MetricSource;
use crate::error::Result;
use crate::types::{Asset, DateRange, MetricSeries};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Longest TTL honoured; larger values are clamped
pub const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Entries kept per source before the soonest-expiring one is evicted
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct Cached {
    series: MetricSeries,
    expires_at: DateTime<Utc>,
}

impl Cached {
    fn fresh(&self) -> bool {
        Utc::now() <= self.expires_at
    }
}

/// Entry counts; `stale` entries stay until [`CachedSource::cleanup`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub stale: usize,
}

/// Wraps a source and memoizes successful fetches
pub struct CachedSource {
    inner: Arc<dyn MetricSource>,
    entries: RwLock<HashMap<(Asset, DateRange), Cached>>,
    ttl_secs: i64,
    capacity: usize,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn MetricSource>, ttl_secs: i64) -> Self {
        Self::with_capacity(inner, ttl_secs, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: Arc<dyn MetricSource>, ttl_secs: i64, capacity: usize) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            ttl_secs: ttl_secs.min(MAX_TTL_SECS),
            capacity: capacity.max(1),
        }
    }

    fn lookup(&self, key: &(Asset, DateRange)) -> Option<MetricSeries> {
        self.entries
            .read()
            .get(key)
            .filter(|cached| cached.fresh())
            .map(|cached| cached.series.clone())
    }

    /// Drop stale entries
    pub fn cleanup(&self) {
        self.entries.write().retain(|_, cached| cached.fresh());
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(self: Arc<Self>, every: std::time::Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                self.cleanup();
                tracing::debug!("{} cache cleanup completed", self.name());
            }
        });
    }

    fn store(&self, key: (Asset, DateRange), series: MetricSeries) {
        let cached = Cached {
            series,
            expires_at: Utc::now() + Duration::seconds(self.ttl_secs),
        };

        let mut entries = self.entries.write();
        entries.retain(|_, cached| cached.fresh());
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let soonest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.expires_at)
                .map(|(key, _)| key.clone());
            if let Some(soonest) = soonest {
                entries.remove(&soonest);
            }
        }
        entries.insert(key, cached);
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        CacheStats {
            entries: entries.len(),
            stale: entries.values().filter(|cached| !cached.fresh()).count(),
        }
    }
}

#[async_trait]
impl MetricSource for CachedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, asset: &Asset, range: &DateRange) -> Result<MetricSeries> {
        let key = (asset.clone(), *range);
        if let Some(series) = self.lookup(&key) {
            return Ok(series);
        }

        // errors are not cached; the next call retries upstream
        let series = self.inner.fetch(asset, range).await?;
        self.store(key, series.clone());
        Ok(series)
    }
}
