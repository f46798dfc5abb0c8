//! Single-reading sentiment gauge

use super::{composite, validate_weight};
use crate::error::{IndexError, Result};
use crate::render::GaugeSpec;
use crate::types::scale;

/// A raw reading on its native scale, e.g. Fear & Greed on [0, 100]
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeReading {
    pub name: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl GaugeReading {
    pub fn new(name: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            value,
            min,
            max,
        }
    }

    /// Reading rescaled onto [0, 1]
    pub fn normalized(&self) -> Result<f64> {
        if !(self.max - self.min).is_normal() {
            return Err(IndexError::InvalidInput(format!(
                "{} has an empty scale [{}, {}]",
                self.name, self.min, self.max
            )));
        }
        Ok(scale(self.value, self.min, self.max, 0.0, 1.0))
    }
}

/// Weighted mean of the normalized readings, as an "Aggregate Sentiment" gauge
pub fn instantaneous(readings: &[(GaugeReading, f64)]) -> Result<GaugeSpec> {
    let mut pairs = Vec::with_capacity(readings.len());
    for (reading, weight) in readings {
        validate_weight(&reading.name, *weight)?;
        let value = reading.normalized()?;
        pairs.push((Some(value).filter(|v| v.is_finite()), *weight));
    }

    Ok(GaugeSpec::aggregate(composite(&pairs)))
}
