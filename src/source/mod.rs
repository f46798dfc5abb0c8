//! Metric sources
//!
//! Each source fetches one metric for an asset over a date range and returns it
//! normalized to [0, 1]:
//! - Fear & Greed index (alternative.me)
//! - Google Trends search interest
//! - CoinMetrics on-chain statistics
//!
//! The [`SourceRegistry`] maps metric names to sources so callers can select
//! metrics by name at runtime.

pub mod cache;
pub mod coinmetrics;
pub mod fear_greed;
pub mod mock;
pub mod trends;


pub use cache::CachedSource;
pub use coinmetrics::{CoinMetricsClient, CoinMetricsSource};
pub use fear_greed::FearGreedSource;
pub use mock::StaticSource;
pub use trends::TrendsSource;

use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::types::{Asset, DateRange, MetricKind, MetricSeries};
use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A fetchable metric
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Source name
    fn name(&self) -> &str;

    /// Daily values for `asset` within `range`, normalized to [0, 1]
    async fn fetch(&self, asset: &Asset, range: &DateRange) -> Result<MetricSeries>;
}

/// HTTP client shared by the network sources
pub fn http_client(timeout_secs: u64) -> Result<Client> {
    let http = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("sentiment-index/", env!("CARGO_PKG_VERSION")))
        .cookie_store(true)
        .build()?;
    Ok(http)
}

/// Metric name -> source
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<MetricKind, Arc<dyn MetricSource>>,
    coinmetrics: Option<Arc<CoinMetricsClient>>,
    caches: Vec<Arc<CachedSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry wired to the live APIs named in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = http_client(config.sources.timeout_secs)?;
        let ttl = config.sources.cache_ttl_secs;
        let mut registry = Self::new();

        registry.register_cached(
            MetricKind::FearAndGreed,
            Arc::new(FearGreedSource::new(&config.sources.fear_greed_url, http.clone())),
            ttl,
        );
        registry.register_cached(
            MetricKind::Trends,
            Arc::new(TrendsSource::new(
                &config.sources.trends_url,
                http.clone(),
                config.assets.clone(),
            )),
            ttl,
        );

        let coinmetrics = Arc::new(CoinMetricsClient::new(&config.sources.coinmetrics_url, http));
        for kind in MetricKind::ALL {
            if kind.coinmetrics_code().is_some() {
                let source = CoinMetricsSource::new(Arc::clone(&coinmetrics), kind)?;
                registry.register_cached(kind, Arc::new(source), ttl);
            }
        }
        registry.set_coinmetrics(coinmetrics);

        Ok(registry)
    }

    /// Client used for raw price lookups
    pub fn set_coinmetrics(&mut self, client: Arc<CoinMetricsClient>) {
        self.coinmetrics = Some(client);
    }

    pub fn register(&mut self, kind: MetricKind, source: Arc<dyn MetricSource>) {
        self.sources.insert(kind, source);
    }

    /// Register behind a TTL cache; a non-positive TTL registers the source as is
    pub fn register_cached(&mut self, kind: MetricKind, source: Arc<dyn MetricSource>, ttl_secs: i64) {
        if ttl_secs > 0 {
            let cached = Arc::new(CachedSource::new(source, ttl_secs));
            self.caches.push(Arc::clone(&cached));
            self.register(kind, cached);
        } else {
            self.register(kind, source);
        }
    }

    /// Periodically drop stale entries from every cache registered here
    pub fn start_cache_cleanup(&self, every: Duration) {
        for cache in &self.caches {
            Arc::clone(cache).start_cleanup_task(every);
        }
        debug!("cache cleanup every {:?} for {} sources", every, self.caches.len());
    }

    pub fn get(&self, kind: MetricKind) -> Result<Arc<dyn MetricSource>> {
        self.sources
            .get(&kind)
            .cloned()
            .ok_or_else(|| IndexError::MissingMetric(kind.to_string()))
    }

    /// Registered metrics, sorted
    pub fn kinds(&self) -> Vec<MetricKind> {
        let mut kinds: Vec<_> = self.sources.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Raw CoinMetrics client, when wired to the live API
    pub fn coinmetrics(&self) -> Option<Arc<CoinMetricsClient>> {
        self.coinmetrics.clone()
    }

    /// Fetch every requested metric concurrently.
    ///
    /// Unknown metrics fail the whole call. A source that fails is logged and
    /// contributes an empty series, so its dates count as gaps.
    pub async fn fetch_weighted(
        &self,
        asset: &Asset,
        metrics: &[(MetricKind, f64)],
        range: &DateRange,
    ) -> Result<Vec<(MetricSeries, f64)>> {
        let resolved = metrics
            .iter()
            .map(|(kind, weight)| self.get(*kind).map(|source| (*kind, source, *weight)))
            .collect::<Result<Vec<_>>>()?;

        let fetches = resolved.into_iter().map(|(kind, source, weight)| async move {
            let series = match source.fetch(asset, range).await {
                Ok(mut series) => {
                    debug!("{} returned {} points for {}", kind, series.len(), asset);
                    series.name = kind.to_string();
                    series
                }
                Err(e) => {
                    warn!("{} failed for {}: {}; treating as missing", kind, asset, e);
                    MetricSeries::new(kind.to_string())
                }
            };
            (series, weight)
        });

        Ok(join_all(fetches).await)
    }
}
