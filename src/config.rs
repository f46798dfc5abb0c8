//! Configuration management

use crate::aggregate::validate_weight;
use crate::error::{IndexError, Result};
use crate::source::cache::MAX_TTL_SECS;
use crate::types::MetricKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sources: SourcesConfig,
    pub defaults: DefaultsConfig,
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Directory served under /widgets
    pub widgets_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// alternative.me API root
    pub fear_greed_url: String,
    /// CoinMetrics community API root (v4)
    pub coinmetrics_url: String,
    /// Google Trends root
    pub trends_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// How long fetched series stay cached (0 disables caching)
    pub cache_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Range length when no start date is given
    pub lookback_days: u64,
    /// Metrics used when a request names none
    pub metrics: Vec<MetricKind>,
    /// Weights aligned with `metrics`; empty means all 1.0
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Ticker -> Google Trends search keyword
    pub trends_keywords: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9200,
            widgets_dir: "widgets".to_string(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            fear_greed_url: "https://api.alternative.me".to_string(),
            coinmetrics_url: "https://community-api.coinmetrics.io/v4".to_string(),
            trends_url: "https://trends.google.com".to_string(),
            timeout_secs: 30,
            cache_ttl_secs: 300,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            lookback_days: 28, // four weeks
            metrics: vec![MetricKind::FearAndGreed, MetricKind::Trends],
            weights: Vec::new(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let trends_keywords = [
            ("BTC", "Bitcoin"),
            ("ETH", "Ethereum"),
            ("LTC", "Litecoin"),
            ("XRP", "Ripple"),
            ("BCH", "Bitcoin Cash"),
        ]
        .into_iter()
        .map(|(ticker, keyword)| (ticker.to_string(), keyword.to_string()))
        .collect();

        Self { trends_keywords }
    }
}

impl AssetsConfig {
    /// Search keyword for a ticker, falling back to the ticker itself
    pub fn trends_keyword(&self, ticker: &str) -> String {
        // env overrides arrive lower-cased
        self.trends_keywords
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(ticker))
            .map(|(_, keyword)| keyword.clone())
            .unwrap_or_else(|| ticker.to_string())
    }
}

impl DefaultsConfig {
    /// Default metrics paired with their weights
    pub fn weighted_metrics(&self) -> Vec<(MetricKind, f64)> {
        self.metrics
            .iter()
            .enumerate()
            .map(|(i, kind)| (*kind, self.weights.get(i).copied().unwrap_or(1.0)))
            .collect()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("SENTIMENT")
        .separator("__")
        .try_parsing(true)
}

impl Config {
    /// Load configuration from file, with `SENTIMENT__*` environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations, or built-in defaults when no file exists
    pub fn load_default() -> anyhow::Result<Self> {
        let paths = [
            "config.toml",
            "config.yaml",
            "~/.config/sentiment-index/config.toml",
        ];

        for path in paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::load(expanded.as_ref());
            }
        }

        tracing::info!("No configuration file found, using defaults");
        let settings = config::Config::builder()
            .add_source(environment())
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, mid-request
    pub fn validate(&self) -> Result<()> {
        if self.sources.timeout_secs == 0 {
            return Err(IndexError::Config("sources.timeout_secs must be at least 1".to_string()));
        }
        if self.sources.cache_ttl_secs > MAX_TTL_SECS {
            return Err(IndexError::Config(format!(
                "sources.cache_ttl_secs must be at most {}",
                MAX_TTL_SECS
            )));
        }
        if self.defaults.lookback_days == 0 {
            return Err(IndexError::Config("defaults.lookback_days must be at least 1".to_string()));
        }
        if self.defaults.weights.len() > self.defaults.metrics.len() {
            return Err(IndexError::Config(format!(
                "defaults.weights has {} entries for {} metrics",
                self.defaults.weights.len(),
                self.defaults.metrics.len()
            )));
        }
        for (kind, weight) in self.defaults.weighted_metrics() {
            validate_weight(kind.as_str(), weight)
                .map_err(|e| IndexError::Config(format!("defaults.weights: {}", e)))?;
        }
        Ok(())
    }
}
