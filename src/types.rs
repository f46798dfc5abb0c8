//! Core data types shared across sources, aggregation and the API

use crate::error::{IndexError, Result};
use chrono::{Days, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Date format used on every external boundary
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| IndexError::InvalidInput(format!("invalid date '{}': {}", s, e)))
}

/// Linearly map `num` from `[init_min, init_max]` onto `[new_min, new_max]`
pub fn scale(num: f64, init_min: f64, init_max: f64, new_min: f64, new_max: f64) -> f64 {
    (num - init_min) * (new_max - new_min) / (init_max - init_min) + new_min
}

/// Every metric the index knows how to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    FearAndGreed,
    Trends,
    BlockCount,
    #[serde(rename = "TRANSACTION_CNT")]
    TransactionCount,
    DailyAddresses,
    MarketCap,
    PriceUsd,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        MetricKind::FearAndGreed,
        MetricKind::Trends,
        MetricKind::BlockCount,
        MetricKind::TransactionCount,
        MetricKind::DailyAddresses,
        MetricKind::MarketCap,
        MetricKind::PriceUsd,
    ];

    /// Name used in API parameters and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::FearAndGreed => "FEAR_AND_GREED",
            MetricKind::Trends => "TRENDS",
            MetricKind::BlockCount => "BLOCK_COUNT",
            MetricKind::TransactionCount => "TRANSACTION_CNT",
            MetricKind::DailyAddresses => "DAILY_ADDRESSES",
            MetricKind::MarketCap => "MARKET_CAP",
            MetricKind::PriceUsd => "PRICE_USD",
        }
    }

    /// CoinMetrics metric code, for on-chain kinds only
    pub fn coinmetrics_code(&self) -> Option<&'static str> {
        match self {
            MetricKind::BlockCount => Some("BlkCnt"),
            MetricKind::TransactionCount => Some("TxCnt"),
            MetricKind::DailyAddresses => Some("AdrActCnt"),
            MetricKind::MarketCap => Some("CapRealUSD"),
            MetricKind::PriceUsd => Some("PriceUSD"),
            MetricKind::FearAndGreed | MetricKind::Trends => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_uppercase();
        MetricKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| IndexError::MissingMetric(s.trim().to_string()))
    }
}

/// A cryptocurrency identified by its upper-case ticker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Asset(String);

impl Asset {
    pub fn new(ticker: &str) -> Self {
        Self(ticker.trim().to_uppercase())
    }

    pub fn ticker(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive, contiguous range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Fails with `InvalidRange` when `end` precedes `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(IndexError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering a single day
    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// The `days` days ending at (and including) `end`
    pub fn ending_at(end: NaiveDate, days: u64) -> Self {
        let start = end
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Never true; a range holds at least one day
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

/// Daily values of one metric, normalized to [0, 1], possibly with gaps
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricSeries {
    pub name: String,
    pub values: BTreeMap<NaiveDate, f64>,
}

impl MetricSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn from_values(
        name: impl Into<String>,
        values: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().collect(),
        }
    }

    /// Build from a map keyed by `YYYY-MM-DD` strings
    pub fn from_iso_map<'a>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self> {
        let values = values
            .into_iter()
            .map(|(date, value)| parse_date(date).map(|d| (d, value)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            name: name.into(),
            values,
        })
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.values.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep only the dates inside `range`
    pub fn restrict(mut self, range: &DateRange) -> Self {
        self.values.retain(|date, _| range.contains(*date));
        self
    }
}

/// Composite value for every date of a range
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateSeries {
    pub values: BTreeMap<NaiveDate, f64>,
}

impl AggregateSeries {
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.values.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values.iter().map(|(d, v)| (*d, *v))
    }
}

impl Serialize for AggregateSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (date, value) in &self.values {
            map.serialize_entry(&date.format(DATE_FORMAT).to_string(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_metric_kind_parsing_is_case_insensitive() {
        assert_eq!("fear_and_greed".parse::<MetricKind>().unwrap(), MetricKind::FearAndGreed);
        assert_eq!(" TRENDS ".parse::<MetricKind>().unwrap(), MetricKind::Trends);
        assert_eq!("Transaction_Cnt".parse::<MetricKind>().unwrap(), MetricKind::TransactionCount);
    }

    #[test]
    fn test_unknown_metric_is_missing_metric() {
        let err = "HASH_RATE".parse::<MetricKind>().unwrap_err();
        assert!(matches!(err, IndexError::MissingMetric(name) if name == "HASH_RATE"));
    }

    #[test]
    fn test_metric_kind_serialization_matches_api_names() {
        for kind in MetricKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_coinmetrics_codes() {
        assert_eq!(MetricKind::BlockCount.coinmetrics_code(), Some("BlkCnt"));
        assert_eq!(MetricKind::MarketCap.coinmetrics_code(), Some("CapRealUSD"));
        assert_eq!(MetricKind::Trends.coinmetrics_code(), None);
    }

    #[test]
    fn test_asset_is_uppercased() {
        assert_eq!(Asset::new(" btc").ticker(), "BTC");
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        let err = DateRange::new(d(2020, 1, 5), d(2020, 1, 1)).unwrap_err();
        assert!(matches!(err, IndexError::InvalidRange { .. }));
    }

    #[test]
    fn test_date_range_days_inclusive() {
        let range = DateRange::parse("2020-02-27", "2020-03-01").unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(days, vec![d(2020, 2, 27), d(2020, 2, 28), d(2020, 2, 29), d(2020, 3, 1)]);
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn test_date_range_ending_at() {
        let range = DateRange::ending_at(d(2020, 1, 28), 28);
        assert_eq!(range.start(), d(2020, 1, 1));
        assert_eq!(range.len(), 28);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(parse_date("01/02/2020"), Err(IndexError::InvalidInput(_))));
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(50.0, 0.0, 100.0, 0.0, 1.0), 0.5);
        assert_eq!(scale(0.25, 0.0, 1.0, 180.0, 0.0), 135.0);
    }

    #[test]
    fn test_series_from_iso_map_and_restrict() {
        let series = MetricSeries::from_iso_map(
            "FEAR_AND_GREED",
            [("2020-01-01", 0.1), ("2020-01-02", 0.2), ("2020-01-10", 0.9)],
        )
        .unwrap();
        let range = DateRange::parse("2020-01-01", "2020-01-05").unwrap();
        let restricted = series.restrict(&range);
        assert_eq!(restricted.len(), 2);
        assert_eq!(restricted.get(d(2020, 1, 2)), Some(0.2));
        assert_eq!(restricted.get(d(2020, 1, 10)), None);
    }

    #[test]
    fn test_aggregate_series_serializes_iso_keys() {
        let series = AggregateSeries {
            values: [(d(2020, 1, 1), 0.5), (d(2020, 1, 2), 0.25)].into_iter().collect(),
        };
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"{"2020-01-01":0.5,"2020-01-02":0.25}"#);
    }
}
