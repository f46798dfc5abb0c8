//! Static in-memory source
//!
//! Serves fixed series without network calls, for tests and demos.

use super::MetricSource;
use crate::error::Result;
use crate::types::{Asset, DateRange, MetricSeries};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct StaticSource {
    name: String,
    /// Served to any asset without its own series
    market_wide: Option<MetricSeries>,
    per_asset: HashMap<Asset, MetricSeries>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            market_wide: None,
            per_asset: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Same series for every asset, like the Fear & Greed index
    pub fn market_wide(name: &str, series: MetricSeries) -> Self {
        Self::new(name).with_market_wide(series)
    }

    pub fn with_market_wide(mut self, series: MetricSeries) -> Self {
        self.market_wide = Some(series);
        self
    }

    pub fn with_asset(mut self, asset: Asset, series: MetricSeries) -> Self {
        self.per_asset.insert(asset, series);
        self
    }

    /// Number of fetches served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MetricSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, asset: &Asset, range: &DateRange) -> Result<MetricSeries> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let series = self
            .per_asset
            .get(asset)
            .or(self.market_wide.as_ref())
            .cloned()
            .unwrap_or_else(|| MetricSeries::new(self.name.clone()));

        Ok(series.restrict(range))
    }
}
