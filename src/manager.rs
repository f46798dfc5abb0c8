//! Sentiment manager
//!
//! Fetches the requested metrics per asset, aggregates them and prepares the
//! chart and gauge descriptors.

use crate::aggregate::aggregate;
use crate::error::{IndexError, Result};
use crate::render::{GaugeSpec, TimeSeriesChart};
use crate::source::SourceRegistry;
use crate::types::{AggregateSeries, Asset, DateRange, MetricKind};
use crate::weights::WeightBoard;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SentimentManager {
    registry: SourceRegistry,
}

impl SentimentManager {
    pub fn new(registry: SourceRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Composite series for one asset
    pub async fn sentiment(
        &self,
        asset: &Asset,
        metrics: &[(MetricKind, f64)],
        range: &DateRange,
    ) -> Result<AggregateSeries> {
        let weighted = self.registry.fetch_weighted(asset, metrics, range).await?;
        let series = aggregate(&weighted, range)?;
        debug!("aggregated {} days of sentiment for {}", series.len(), asset);
        Ok(series)
    }

    /// Composite series for each asset
    pub async fn historical(
        &self,
        assets: &[Asset],
        metrics: &[(MetricKind, f64)],
        range: &DateRange,
    ) -> Result<BTreeMap<Asset, AggregateSeries>> {
        let mut result = BTreeMap::new();
        for asset in assets {
            result.insert(asset.clone(), self.sentiment(asset, metrics, range).await?);
        }
        Ok(result)
    }

    /// Composite series using the board's current weights
    pub async fn historical_from_board(
        &self,
        assets: &[Asset],
        board: &WeightBoard,
        range: &DateRange,
    ) -> Result<BTreeMap<Asset, AggregateSeries>> {
        self.historical(assets, &board.snapshot(), range).await
    }

    /// Fetch once, then recompute every asset's composite whenever `board` changes.
    ///
    /// The returned handle always holds the latest composites. Board metrics must
    /// be registered; a later change naming an unregistered metric is logged and
    /// leaves the previous composites in place.
    pub async fn recompute_on_change(
        &self,
        assets: &[Asset],
        board: &WeightBoard,
        range: &DateRange,
    ) -> Result<Arc<RwLock<BTreeMap<Asset, AggregateSeries>>>> {
        for (kind, _) in board.snapshot() {
            self.registry.get(kind)?;
        }

        let all_kinds: Vec<(MetricKind, f64)> = self
            .registry
            .kinds()
            .into_iter()
            .map(|kind| (kind, 0.0))
            .collect();

        let mut fetched = HashMap::new();
        for asset in assets {
            let series = self.registry.fetch_weighted(asset, &all_kinds, range).await?;
            let by_kind: HashMap<String, _> = series
                .into_iter()
                .map(|(series, _)| (series.name.clone(), series))
                .collect();
            fetched.insert(asset.clone(), by_kind);
        }

        let compute = {
            let range = *range;
            move |weights: &[(MetricKind, f64)]| -> Result<BTreeMap<Asset, AggregateSeries>> {
                let mut out = BTreeMap::new();
                for (asset, by_kind) in &fetched {
                    let inputs = weights
                        .iter()
                        .map(|(kind, weight)| {
                            by_kind
                                .get(kind.as_str())
                                .map(|s| (s.clone(), *weight))
                                .ok_or_else(|| IndexError::MissingMetric(kind.to_string()))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    out.insert(asset.clone(), aggregate(&inputs, &range)?);
                }
                Ok(out)
            }
        };

        let latest = Arc::new(RwLock::new(compute(&board.snapshot())?));
        let handle = Arc::clone(&latest);
        board.subscribe(move |weights| match compute(weights) {
            Ok(series) => *handle.write() = series,
            Err(e) => warn!("recompute after weight change failed: {}", e),
        });

        info!("tracking weight changes for {} assets", assets.len());
        Ok(latest)
    }

    /// USD prices from CoinMetrics, unscaled
    pub async fn prices(&self, asset: &Asset, range: &DateRange) -> Result<BTreeMap<NaiveDate, f64>> {
        let client = self
            .registry
            .coinmetrics()
            .ok_or_else(|| IndexError::MissingMetric(MetricKind::PriceUsd.to_string()))?;
        client.prices(asset, range).await
    }

    /// Composite for a single day, as a gauge
    pub async fn gauge(&self, asset: &Asset, date: NaiveDate, metrics: &[(MetricKind, f64)]) -> Result<GaugeSpec> {
        let range = DateRange::single(date);
        let series = self.sentiment(asset, metrics, &range).await?;
        Ok(GaugeSpec::aggregate(series.get(date).unwrap_or(0.0)))
    }

    /// Line chart of one asset's composite
    pub fn chart(&self, asset: &Asset, series: &AggregateSeries) -> TimeSeriesChart {
        TimeSeriesChart::sentiment(asset.ticker(), series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;
    use crate::types::MetricSeries;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn range(from: u32, to: u32) -> DateRange {
        DateRange::new(d(from), d(to)).unwrap()
    }

    fn manager() -> SentimentManager {
        let mut registry = SourceRegistry::new();
        registry.register(
            MetricKind::FearAndGreed,
            Arc::new(StaticSource::market_wide(
                "fng",
                MetricSeries::from_values("fng", [(d(1), 0.2), (d(2), 0.4)]),
            )),
        );
        registry.register(
            MetricKind::Trends,
            Arc::new(
                StaticSource::new("trends")
                    .with_asset(Asset::new("BTC"), MetricSeries::from_values("t", [(d(1), 0.6), (d(3), 0.8)]))
                    .with_asset(Asset::new("ETH"), MetricSeries::from_values("t", [(d(1), 1.0)])),
            ),
        );
        SentimentManager::new(registry)
    }

    fn metrics() -> Vec<(MetricKind, f64)> {
        vec![(MetricKind::FearAndGreed, 1.0), (MetricKind::Trends, 1.0)]
    }

    #[tokio::test]
    async fn test_sentiment_fills_gaps() {
        let series = manager()
            .sentiment(&Asset::new("BTC"), &metrics(), &range(1, 4))
            .await
            .unwrap();

        assert!((series.get(d(1)).unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(series.get(d(2)), Some(0.4));
        assert_eq!(series.get(d(3)), Some(0.8));
        assert_eq!(series.get(d(4)), Some(0.0));
    }

    #[tokio::test]
    async fn test_historical_per_asset() {
        let assets = [Asset::new("BTC"), Asset::new("ETH")];
        let result = manager().historical(&assets, &metrics(), &range(1, 1)).await.unwrap();

        assert_eq!(result.len(), 2);
        assert!((result[&Asset::new("ETH")].get(d(1)).unwrap() - 0.6).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_historical_from_board() {
        let board = WeightBoard::new(&[(MetricKind::FearAndGreed, 0.0), (MetricKind::Trends, 1.0)]).unwrap();
        let result = manager()
            .historical_from_board(&[Asset::new("BTC")], &board, &range(1, 1))
            .await
            .unwrap();
        assert_eq!(result[&Asset::new("BTC")].get(d(1)), Some(0.6));
    }

    #[tokio::test]
    async fn test_recompute_on_change() {
        let board = WeightBoard::new(&[(MetricKind::FearAndGreed, 1.0)]).unwrap();
        let latest = manager()
            .recompute_on_change(&[Asset::new("BTC")], &board, &range(1, 1))
            .await
            .unwrap();
        assert_eq!(latest.read()[&Asset::new("BTC")].get(d(1)), Some(0.2));

        board.set(MetricKind::FearAndGreed, 0.0).unwrap();
        board.set(MetricKind::Trends, 1.0).unwrap();
        assert_eq!(latest.read()[&Asset::new("BTC")].get(d(1)), Some(0.6));
    }

    #[tokio::test]
    async fn test_recompute_rejects_unregistered_metrics() {
        let board = WeightBoard::new(&[(MetricKind::BlockCount, 1.0)]).unwrap();
        let result = manager()
            .recompute_on_change(&[Asset::new("BTC")], &board, &range(1, 1))
            .await;
        assert!(matches!(result, Err(IndexError::MissingMetric(name)) if name == "BLOCK_COUNT"));
    }

    #[tokio::test]
    async fn test_recompute_keeps_last_good_result() {
        let board = WeightBoard::new(&[(MetricKind::Trends, 1.0)]).unwrap();
        let latest = manager()
            .recompute_on_change(&[Asset::new("BTC")], &board, &range(1, 1))
            .await
            .unwrap();

        board.set(MetricKind::MarketCap, 1.0).unwrap();
        assert_eq!(latest.read()[&Asset::new("BTC")].get(d(1)), Some(0.6));
    }

    #[tokio::test]
    async fn test_gauge_for_single_day() {
        let gauge = manager().gauge(&Asset::new("BTC"), d(2), &metrics()).await.unwrap();
        assert_eq!(gauge.value, 0.4);
        assert_eq!(gauge.title, "Aggregate Sentiment");
    }

    #[tokio::test]
    async fn test_prices_need_coinmetrics() {
        let result = manager().prices(&Asset::new("BTC"), &range(1, 2)).await;
        assert!(matches!(result, Err(IndexError::MissingMetric(_))));
    }

    #[tokio::test]
    async fn test_negative_weight_rejected() {
        let result = manager()
            .sentiment(&Asset::new("BTC"), &[(MetricKind::Trends, -1.0)], &range(1, 1))
            .await;
        assert!(matches!(result, Err(IndexError::InvalidWeight { .. })));
    }

    #[test]
    fn test_chart() {
        let series = AggregateSeries {
            values: [(d(1), 0.5)].into_iter().collect(),
        };
        let chart = manager().chart(&Asset::new("ltc"), &series);
        assert_eq!(chart.series_name, "LTC");
        assert_eq!(chart.points.len(), 1);
    }
}
