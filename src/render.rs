//! Chart and gauge descriptors
//!
//! Drawing happens in the browser widgets; this module only describes what to
//! draw so the descriptors can be shipped as JSON.

use crate::types::{scale, AggregateSeries, DATE_FORMAT};
use serde::Serialize;

const RED: &str = "#c80000";
const ORANGE: &str = "#c84b00";
const OLIVE: &str = "#646400";
const LIME: &str = "#64a000";
const GREEN: &str = "#00c800";

/// Half-circle gauge with labelled sectors and a needle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeSpec {
    pub title: String,
    /// Sector labels, lowest first
    pub labels: Vec<String>,
    /// Sector colours, aligned with `labels`
    pub colors: Vec<String>,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    /// Needle angle in degrees; 180 points at `min`, 0 at `max`
    pub needle_angle: f64,
}

impl GaugeSpec {
    pub fn new(title: &str, labels: &[&str], colors: &[&str], value: f64, min: f64, max: f64) -> Self {
        let needle_angle = if max > min {
            scale(value.clamp(min, max), min, max, 180.0, 0.0)
        } else {
            90.0
        };

        Self {
            title: title.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            colors: colors.iter().map(|s| s.to_string()).collect(),
            value,
            min,
            max,
            needle_angle,
        }
    }

    /// Composite sentiment on [0, 1]
    pub fn aggregate(value: f64) -> Self {
        Self::new(
            "Aggregate Sentiment",
            &["—", "0", "+"],
            &[RED, OLIVE, GREEN],
            value,
            0.0,
            1.0,
        )
    }

    /// Fear & Greed index on [0, 100]
    pub fn fear_and_greed(value: f64) -> Self {
        Self::new(
            "Fear and Greed",
            &["Extreme Fear", "Fear", "Greed", "Extreme Greed"],
            &[RED, ORANGE, LIME, GREEN],
            value,
            0.0,
            100.0,
        )
    }

    /// Generic low/medium/high gauge
    pub fn neutral(title: &str, value: f64, min: f64, max: f64) -> Self {
        Self::new(title, &["Low", "Medium", "High"], &[RED, OLIVE, GREEN], value, min, max)
    }
}

/// Single line chart over dates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesChart {
    pub title: String,
    pub series_name: String,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub value: f64,
}

impl TimeSeriesChart {
    /// Chart of a composite series, fixed to the [0, 1] axis
    pub fn sentiment(series_name: &str, series: &AggregateSeries) -> Self {
        Self {
            title: "Aggregate Sentiment".to_string(),
            series_name: series_name.to_string(),
            y_min: Some(0.0),
            y_max: Some(1.0),
            points: series
                .iter()
                .map(|(date, value)| ChartPoint {
                    date: date.format(DATE_FORMAT).to_string(),
                    value,
                })
                .collect(),
        }
    }
}
