//! Crypto Sentiment Index
//!
//! Combines Fear & Greed, Google Trends and on-chain metrics into one weighted
//! daily sentiment score per asset, served over HTTP.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod manager;
pub mod render;
pub mod source;
pub mod types;
pub mod weights;


pub use aggregate::aggregate;
pub use error::{IndexError, Result};
pub use manager::SentimentManager;
pub use types::{AggregateSeries, Asset, DateRange, MetricKind, MetricSeries};
