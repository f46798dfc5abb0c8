//! Observable metric weights
//!
//! Interactive front ends adjust weights one at a time and expect the composite
//! to follow. The board stores the current weights and tells every subscriber
//! about each change; the aggregation itself stays stateless.

use crate::aggregate::validate_weight;
use crate::error::Result;
use crate::types::MetricKind;
use parking_lot::RwLock;
use std::sync::Arc;

pub const MAX_WEIGHT: f64 = 1.0;
pub const WEIGHT_STEP: f64 = 0.05;

type Subscriber = Arc<dyn Fn(&[(MetricKind, f64)]) + Send + Sync>;

/// Ordered metric weights with change notification
#[derive(Clone, Default)]
pub struct WeightBoard {
    weights: Arc<RwLock<Vec<(MetricKind, f64)>>>,
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
}

impl WeightBoard {
    pub fn new(initial: &[(MetricKind, f64)]) -> Result<Self> {
        for (kind, weight) in initial {
            validate_weight(kind.as_str(), *weight)?;
        }
        Ok(Self {
            weights: Arc::new(RwLock::new(initial.to_vec())),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Current weights, in insertion order
    pub fn snapshot(&self) -> Vec<(MetricKind, f64)> {
        self.weights.read().clone()
    }

    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        self.weights
            .read()
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, w)| *w)
    }

    /// Register a callback invoked with the full weight set after every change
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&[(MetricKind, f64)]) + Send + Sync + 'static,
    {
        self.subscribers.write().push(Arc::new(callback));
    }

    /// Set one weight, adding the metric if absent, then notify subscribers
    pub fn set(&self, kind: MetricKind, weight: f64) -> Result<()> {
        validate_weight(kind.as_str(), weight)?;

        let snapshot = {
            let mut weights = self.weights.write();
            match weights.iter_mut().find(|(k, _)| *k == kind) {
                Some(entry) => entry.1 = weight,
                None => weights.push((kind, weight)),
            }
            weights.clone()
        };

        // no lock held while callbacks run; they may read or subscribe
        let subscribers = self.subscribers.read().clone();
        for subscriber in &subscribers {
            subscriber(&snapshot);
        }
        Ok(())
    }

    /// Move a weight by `steps` slider increments, clamped to [0, MAX_WEIGHT]
    pub fn nudge(&self, kind: MetricKind, steps: i32) -> Result<f64> {
        let current = self.get(kind).unwrap_or(0.0);
        let next = (current + steps as f64 * WEIGHT_STEP).clamp(0.0, MAX_WEIGHT);
        self.set(kind, next)?;
        Ok(next)
    }
}
