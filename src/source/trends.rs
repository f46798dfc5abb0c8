//! Google Trends search interest
//!
//! Trends has no public API. The web front end first asks `explore` for a
//! signed widget request, then fetches `widgetdata/multiline` with it. Both
//! responses start with an anti-XSSI prefix that must be stripped.

use super::MetricSource;
use crate::config::AssetsConfig;
use crate::error::{IndexError, Result};
use crate::types::{scale, Asset, DateRange, MetricSeries, DATE_FORMAT};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Trends reports interest relative to the peak of the window: 100 is the
/// peak, 0 means not enough data
pub const MIN_TRENDS_VAL: f64 = 0.0;
pub const MAX_TRENDS_VAL: f64 = 100.0;

const TIMESERIES_WIDGET: &str = "TIMESERIES";

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    widgets: Vec<Widget>,
}

#[derive(Debug, Deserialize)]
struct Widget {
    id: String,
    token: Option<String>,
    request: Value,
}

#[derive(Debug, Deserialize)]
struct MultilineResponse {
    default: Timeline,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    #[serde(rename = "timelineData")]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    time: String,
    value: Vec<f64>,
}

/// Drop everything before the JSON body
pub fn strip_xssi(body: &str) -> Result<&str> {
    body.find('{')
        .map(|start| &body[start..])
        .ok_or_else(|| IndexError::Parse("trends response has no JSON body".to_string()))
}

/// Token and request of the TIMESERIES widget
pub fn parse_explore(body: &str) -> Result<(String, Value)> {
    let explore: ExploreResponse = serde_json::from_str(strip_xssi(body)?)?;
    explore
        .widgets
        .into_iter()
        .find(|w| w.id == TIMESERIES_WIDGET)
        .and_then(|w| w.token.map(|token| (token, w.request)))
        .ok_or_else(|| IndexError::Api("trends explore returned no TIMESERIES widget".to_string()))
}

/// Daily average of the raw [0, 100] interest values
pub fn parse_timeline(body: &str) -> Result<BTreeMap<NaiveDate, f64>> {
    let resp: MultilineResponse = serde_json::from_str(strip_xssi(body)?)?;
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();

    for point in resp.default.timeline_data {
        let secs: i64 = point
            .time
            .parse()
            .map_err(|_| IndexError::Parse(format!("trends time '{}'", point.time)))?;
        let date = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| IndexError::Parse(format!("trends time '{}' out of range", secs)))?
            .date_naive();

        if let Some(value) = point.value.first() {
            buckets.entry(date).or_default().push(*value);
        }
    }

    Ok(buckets
        .into_iter()
        .map(|(date, vals)| (date, vals.iter().sum::<f64>() / vals.len() as f64))
        .collect())
}

pub struct TrendsSource {
    http: Client,
    base_url: String,
    assets: AssetsConfig,
}

impl TrendsSource {
    pub fn new(base_url: &str, http: Client, assets: AssetsConfig) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            assets,
        }
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let body = self
            .http
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    /// Raw daily interest for `keyword`
    pub async fn interest_over_time(&self, keyword: &str, range: &DateRange) -> Result<BTreeMap<NaiveDate, f64>> {
        // Trends refuses API calls from clients without its session cookie
        self.http
            .get(format!("{}/?geo=US", self.base_url))
            .send()
            .await?;

        let time = format!(
            "{} {}",
            range.start().format(DATE_FORMAT),
            range.end().format(DATE_FORMAT)
        );
        let explore_req = json!({
            "comparisonItem": [{"keyword": keyword, "time": time, "geo": ""}],
            "category": 0,
            "property": "",
        })
        .to_string();

        let explore = self
            .get_text(
                &format!("{}/trends/api/explore", self.base_url),
                &[("hl", "en-US"), ("tz", "0"), ("req", explore_req.as_str())],
            )
            .await?;
        let (token, request) = parse_explore(&explore)?;
        let request = request.to_string();

        let timeline = self
            .get_text(
                &format!("{}/trends/api/widgetdata/multiline", self.base_url),
                &[
                    ("hl", "en-US"),
                    ("tz", "0"),
                    ("req", request.as_str()),
                    ("token", token.as_str()),
                ],
            )
            .await?;

        let values = parse_timeline(&timeline)?;
        debug!("trends: {} days of interest for '{}'", values.len(), keyword);
        Ok(values)
    }
}

#[async_trait]
impl MetricSource for TrendsSource {
    fn name(&self) -> &str {
        "google_trends"
    }

    async fn fetch(&self, asset: &Asset, range: &DateRange) -> Result<MetricSeries> {
        let keyword = self.assets.trends_keyword(asset.ticker());
        let values = self
            .interest_over_time(&keyword, range)
            .await?
            .into_iter()
            .filter(|(date, _)| range.contains(*date))
            .map(|(date, value)| (date, scale(value, MIN_TRENDS_VAL, MAX_TRENDS_VAL, 0.0, 1.0)));

        Ok(MetricSeries::from_values("TRENDS", values))
    }
}
