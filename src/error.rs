//! Error types for the sentiment index

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Invalid date range: end {end} precedes start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid weight for {metric}: {weight}")]
    InvalidWeight { metric: String, weight: f64 },

    #[error("Metric not available: {0}")]
    MissingMetric(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IndexError {
    /// True for errors caused by caller input rather than an upstream failure.
    /// `Parse` covers malformed upstream payloads, so it is not one of them.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IndexError::InvalidRange { .. }
                | IndexError::InvalidWeight { .. }
                | IndexError::MissingMetric(_)
                | IndexError::InvalidInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
