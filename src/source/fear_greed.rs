//! Crypto Fear & Greed index from alternative.me
//!
//! The index is market-wide, so every asset receives the same series.

use super::MetricSource;
use crate::error::{IndexError, Result};
use crate::types::{scale, Asset, DateRange, MetricSeries};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;

pub const MIN_FEAR_AND_GREED: f64 = 0.0;
pub const MAX_FEAR_AND_GREED: f64 = 100.0;

/// `date_format=us` timestamps
const TIMESTAMP_FORMAT: &str = "%m-%d-%Y";

#[derive(Debug, Deserialize)]
struct FngResponse {
    #[serde(default)]
    data: Vec<FngEntry>,
    #[serde(default)]
    metadata: Option<FngMetadata>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct FngMetadata {
    error: Option<String>,
}

/// Parse the full-history response into raw index values on [0, 100]
pub fn parse_response(body: &str) -> Result<BTreeMap<NaiveDate, f64>> {
    let resp: FngResponse = serde_json::from_str(body)?;

    if let Some(error) = resp.metadata.and_then(|m| m.error) {
        return Err(IndexError::Api(format!("fear and greed: {}", error)));
    }

    resp.data
        .into_iter()
        .map(|entry| {
            let date = NaiveDate::parse_from_str(&entry.timestamp, TIMESTAMP_FORMAT).map_err(|e| {
                IndexError::Parse(format!("fear and greed timestamp '{}': {}", entry.timestamp, e))
            })?;
            let value: f64 = entry.value.trim().parse().map_err(|_| {
                IndexError::Parse(format!("fear and greed value '{}'", entry.value))
            })?;
            Ok((date, value))
        })
        .collect()
}

pub struct FearGreedSource {
    http: Client,
    base_url: String,
}

impl FearGreedSource {
    pub fn new(base_url: &str, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Entire index history, raw values on [0, 100]
    pub async fn fetch_all(&self) -> Result<BTreeMap<NaiveDate, f64>> {
        let url = format!("{}/fng/", self.base_url);
        let body = self
            .http
            .get(&url)
            .query(&[("limit", "0"), ("date_format", "us")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_response(&body)
    }
}

#[async_trait]
impl MetricSource for FearGreedSource {
    fn name(&self) -> &str {
        "fear_and_greed"
    }

    async fn fetch(&self, _asset: &Asset, range: &DateRange) -> Result<MetricSeries> {
        let values = self
            .fetch_all()
            .await?
            .into_iter()
            .filter(|(date, _)| range.contains(*date))
            .map(|(date, value)| {
                (date, scale(value, MIN_FEAR_AND_GREED, MAX_FEAR_AND_GREED, 0.0, 1.0))
            });

        Ok(MetricSeries::from_values("FEAR_AND_GREED", values))
    }
}
