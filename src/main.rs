//! Crypto Sentiment Index
//!
//! Serves and prints weighted sentiment scores for crypto assets.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sentiment_index::{
    api,
    config::Config,
    source::SourceRegistry,
    types::{parse_date, AggregateSeries, Asset, DateRange, MetricKind},
    SentimentManager,
};
use std::collections::BTreeMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sentiment-index")]
#[command(about = "Weighted crypto sentiment from Fear & Greed, Google Trends and on-chain data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (defaults are searched when omitted)
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print composite sentiment per day as JSON
    Sentiment {
        /// Coin tickers, e.g. BTC ETH
        #[arg(required = true)]
        coins: Vec<String>,
        /// First day (YYYY-MM-DD); defaults to the configured lookback
        #[arg(long)]
        start: Option<String>,
        /// Last day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        end: Option<String>,
        /// Comma-separated metric names
        #[arg(short, long)]
        metrics: Option<String>,
        /// Comma-separated weights aligned with --metrics
        #[arg(short, long)]
        weights: Option<String>,
        /// Emit a chart descriptor instead of the raw mapping
        #[arg(long)]
        chart: bool,
    },
    /// Print one day's composite as a gauge
    Gauge {
        coin: String,
        /// Day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(short, long)]
        metrics: Option<String>,
        #[arg(short, long)]
        weights: Option<String>,
    },
    /// Print USD prices per day
    Price {
        coin: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sentiment_index=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let registry = SourceRegistry::from_config(&config)?;
    let manager = SentimentManager::new(registry);

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            api::serve(&config, manager).await
        }
        Commands::Sentiment {
            coins,
            start,
            end,
            metrics,
            weights,
            chart,
        } => {
            let range = resolve_range(&config, start.as_deref(), end.as_deref())?;
            let metrics = resolve_metrics(&config, metrics.as_deref(), weights.as_deref())?;
            let assets: Vec<Asset> = coins.iter().map(|c| Asset::new(c)).collect();

            tracing::info!(
                "Computing sentiment for {} assets from {} to {}",
                assets.len(),
                range.start(),
                range.end()
            );
            let result = manager.historical(&assets, &metrics, &range).await?;

            if chart {
                let charts: Vec<_> = result
                    .iter()
                    .map(|(asset, series)| manager.chart(asset, series))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&charts)?);
            } else {
                let by_ticker: BTreeMap<String, &AggregateSeries> = result
                    .iter()
                    .map(|(asset, series)| (asset.to_string(), series))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&by_ticker)?);
            }
            Ok(())
        }
        Commands::Gauge {
            coin,
            date,
            metrics,
            weights,
        } => {
            let date = match date.as_deref() {
                Some(raw) => parse_date(raw)?,
                None => today(),
            };
            let metrics = resolve_metrics(&config, metrics.as_deref(), weights.as_deref())?;
            let gauge = manager.gauge(&Asset::new(&coin), date, &metrics).await?;
            println!("{}", serde_json::to_string_pretty(&gauge)?);
            Ok(())
        }
        Commands::Price { coin, start, end } => {
            let range = resolve_range(&config, start.as_deref(), end.as_deref())?;
            let prices = manager.prices(&Asset::new(&coin), &range).await?;
            for (date, price) in prices {
                println!("{}  ${:.2}", date, price);
            }
            Ok(())
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn resolve_range(config: &Config, start: Option<&str>, end: Option<&str>) -> anyhow::Result<DateRange> {
    let end = match end {
        Some(raw) => parse_date(raw)?,
        None => today(),
    };
    let range = match start {
        Some(raw) => DateRange::new(parse_date(raw)?, end)?,
        None => DateRange::ending_at(end, config.defaults.lookback_days),
    };
    Ok(range)
}

fn resolve_metrics(
    config: &Config,
    metrics: Option<&str>,
    weights: Option<&str>,
) -> anyhow::Result<Vec<(MetricKind, f64)>> {
    match metrics {
        Some(raw) => api::parse_metrics(raw, weights).map_err(anyhow::Error::msg),
        None => Ok(config.defaults.weighted_metrics()),
    }
}
