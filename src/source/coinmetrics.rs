//! CoinMetrics community API client for on-chain statistics

use super::MetricSource;
use crate::error::{IndexError, Result};
use crate::types::{scale, Asset, DateRange, MetricKind, MetricSeries, DATE_FORMAT};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

const PAGE_SIZE: &str = "10000";
const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct MetricsPage {
    data: Vec<MetricsRow>,
    next_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetricsRow {
    time: String,
    #[serde(flatten)]
    metrics: HashMap<String, Value>,
}

/// Parse one page of `timeseries/asset-metrics`; returns the values of `code`
/// and the next page URL, if any
pub fn parse_page(body: &str, code: &str) -> Result<(BTreeMap<NaiveDate, f64>, Option<String>)> {
    let page: MetricsPage = serde_json::from_str(body)?;
    let mut values = BTreeMap::new();

    for row in page.data {
        let date = DateTime::parse_from_rfc3339(&row.time)
            .map_err(|e| IndexError::Parse(format!("coinmetrics time '{}': {}", row.time, e)))?
            .date_naive();

        let value = match row.metrics.get(code) {
            Some(Value::String(s)) => s.parse::<f64>().ok(),
            Some(Value::Number(n)) => n.as_f64(),
            _ => None,
        };
        if let Some(value) = value {
            values.insert(date, value);
        }
    }

    Ok((values, page.next_page_url))
}

/// Min-max scale onto [0, 1]; a flat series maps to 0.5
pub fn normalize_min_max(values: &BTreeMap<NaiveDate, f64>) -> BTreeMap<NaiveDate, f64> {
    let min = values.values().copied().fold(f64::INFINITY, f64::min);
    let max = values.values().copied().fold(f64::NEG_INFINITY, f64::max);

    values
        .iter()
        .map(|(date, value)| {
            let scaled = if max > min {
                scale(*value, min, max, 0.0, 1.0)
            } else {
                0.5
            };
            (*date, scaled)
        })
        .collect()
}

/// CoinMetrics API client
pub struct CoinMetricsClient {
    http: Client,
    base_url: String,
}

impl CoinMetricsClient {
    pub fn new(base_url: &str, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Raw daily values of metric `code` for `asset` from the start of history to `end`
    pub async fn fetch_raw(&self, asset: &Asset, code: &str, end: NaiveDate) -> Result<BTreeMap<NaiveDate, f64>> {
        let url = format!("{}/timeseries/asset-metrics", self.base_url);
        let end = end.format(DATE_FORMAT).to_string();
        let asset_id = asset.ticker().to_lowercase();

        let body = self
            .http
            .get(&url)
            .query(&[
                ("assets", asset_id.as_str()),
                ("metrics", code),
                ("frequency", "1d"),
                ("end_time", end.as_str()),
                ("page_size", PAGE_SIZE),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let (mut values, mut next) = parse_page(&body, code)?;
        let mut pages = 1;

        while let Some(next_url) = next {
            if pages >= MAX_PAGES {
                debug!("coinmetrics: stopping after {} pages for {} {}", pages, asset, code);
                break;
            }
            let body = self
                .http
                .get(&next_url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            let (more, following) = parse_page(&body, code)?;
            values.extend(more);
            next = following;
            pages += 1;
        }

        Ok(values)
    }

    /// USD price per day within `range`, unscaled
    pub async fn prices(&self, asset: &Asset, range: &DateRange) -> Result<BTreeMap<NaiveDate, f64>> {
        let mut values = self.fetch_raw(asset, "PriceUSD", range.end()).await?;
        values.retain(|date, _| range.contains(*date));
        Ok(values)
    }
}

/// One CoinMetrics metric exposed as a [`MetricSource`]
pub struct CoinMetricsSource {
    client: Arc<CoinMetricsClient>,
    kind: MetricKind,
    code: &'static str,
}

impl CoinMetricsSource {
    pub fn new(client: Arc<CoinMetricsClient>, kind: MetricKind) -> Result<Self> {
        let code = kind
            .coinmetrics_code()
            .ok_or_else(|| IndexError::MissingMetric(kind.to_string()))?;
        Ok(Self { client, kind, code })
    }
}

#[async_trait]
impl MetricSource for CoinMetricsSource {
    fn name(&self) -> &str {
        self.code
    }

    /// Scaled against the asset's whole history so values stay comparable across ranges
    async fn fetch(&self, asset: &Asset, range: &DateRange) -> Result<MetricSeries> {
        let raw = self.client.fetch_raw(asset, self.code, range.end()).await?;
        let series = MetricSeries::from_values(self.kind.to_string(), normalize_min_max(&raw));
        Ok(series.restrict(range))
    }
}
