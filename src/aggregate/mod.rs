//! Weighted sentiment aggregation
//!
//! Combines several per-metric daily series into one composite series. For each
//! date, metrics without a reading hand their weight evenly to the metrics that
//! do have one, and the composite is the weighted mean of the present readings.
//!
//! ```text
//!   FEAR_AND_GREED  0.2 (w=1) ──┐
//!   TRENDS          0.6 (w=1) ──┼──► redistribute ──► 0.2·1.5 + 0.6·1.5
//!   BLOCK_COUNT      -   (w=1) ──┘     missing w        ─────────────────  = 0.4
//!                                                             3
//! ```
//!
//! Every function here is pure; callers may invoke them from any thread.

pub mod instantaneous;


pub use instantaneous::{instantaneous, GaugeReading};

use crate::error::{IndexError, Result};
use crate::types::{AggregateSeries, DateRange, MetricSeries};

/// Combine weighted series into a composite value for every date of `range`.
///
/// A date with no reading in any series gets `0.0`. Non-finite readings count
/// as missing.
pub fn aggregate(series_list: &[(MetricSeries, f64)], range: &DateRange) -> Result<AggregateSeries> {
    for (series, weight) in series_list {
        validate_weight(&series.name, *weight)?;
    }

    let values = range
        .days()
        .map(|date| {
            let pairs: Vec<(Option<f64>, f64)> = series_list
                .iter()
                .map(|(series, weight)| (series.get(date).filter(|v| v.is_finite()), *weight))
                .collect();
            (date, composite(&pairs))
        })
        .collect();

    Ok(AggregateSeries { values })
}

/// Weights must be finite and non-negative
pub fn validate_weight(metric: &str, weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(IndexError::InvalidWeight {
            metric: metric.to_string(),
            weight,
        })
    }
}

/// Composite for a single date from `(value, weight)` pairs, `None` meaning missing.
///
/// Weights are assumed already validated. They are rescaled by the largest
/// weight first, so every intermediate sum stays finite.
pub fn composite(pairs: &[(Option<f64>, f64)]) -> f64 {
    let largest = pairs.iter().map(|(_, weight)| *weight).fold(0.0, f64::max);
    if largest <= 0.0 {
        return 0.0;
    }

    let present: Vec<(f64, f64)> = pairs
        .iter()
        .filter_map(|(value, weight)| value.map(|v| (v, *weight / largest)))
        .collect();

    if present.is_empty() {
        return 0.0;
    }

    let missing_weight = ordered_sum(
        pairs
            .iter()
            .filter(|(value, _)| value.is_none())
            .map(|(_, weight)| *weight / largest),
    );
    let share = missing_weight / present.len() as f64;

    let redistributed: Vec<(f64, f64)> = present
        .into_iter()
        .map(|(value, weight)| (value, weight + share))
        .collect();

    let total = ordered_sum(redistributed.iter().map(|(_, weight)| *weight));
    if total <= 0.0 {
        return 0.0;
    }

    ordered_sum(
        redistributed
            .iter()
            .map(|(value, weight)| value * (weight / total)),
    )
}

/// Sum in a canonical order so permuted inputs give bit-identical results
fn ordered_sum(terms: impl Iterator<Item = f64>) -> f64 {
    let mut terms: Vec<f64> = terms.collect();
    terms.sort_by(f64::total_cmp);
    terms.into_iter().sum()
}
