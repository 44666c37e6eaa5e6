/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! k-nearest-neighbour regression over a bounded memory of instances.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use super::{squared_distance, Learner};
use crate::instance::Instance;
use crate::measurement::Measurement;

/// Predicts the mean target of the `k` stored instances closest to the query.
///
/// Memory holds at most `limit` instances; the oldest is dropped first.
/// Distance ties keep the earlier-stored instance. Predicts 0.0 until trained.
#[derive(Clone, Debug)]
pub struct KnnRegressor {
    k: usize,
    limit: usize,
    memory: VecDeque<(Vec<f64>, f64)>,
    weight_seen: f64,
}

impl KnnRegressor {
    /// `k` neighbours over at most `limit` stored instances (both clamped to ≥ 1).
    pub fn new(k: usize, limit: usize) -> Self {
        Self {
            k: k.max(1),
            limit: limit.max(1),
            memory: VecDeque::new(),
            weight_seen: 0.0,
        }
    }

    /// Number of instances currently stored.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

impl Default for KnnRegressor {
    fn default() -> Self {
        Self::new(1, 1000)
    }
}

impl Learner for KnnRegressor {
    fn reset(&mut self) {
        self.memory.clear();
        self.weight_seen = 0.0;
    }

    fn train(&mut self, instance: &Instance) {
        if instance.weight() <= 0.0 {
            return;
        }
        self.weight_seen += instance.weight();
        if self.memory.len() == self.limit {
            self.memory.pop_front();
        }
        self.memory
            .push_back((instance.features().collect(), instance.class_value()));
    }

    fn predict(&self, instance: &Instance) -> f64 {
        if self.memory.is_empty() {
            return 0.0;
        }
        let mut ranked: Vec<(f64, f64)> = self
            .memory
            .iter()
            .map(|(features, target)| {
                (squared_distance(features.iter().copied(), instance.features()), *target)
            })
            .collect();
        // Stable sort: equal distances keep insertion order.
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(core::cmp::Ordering::Equal));
        let n = self.k.min(ranked.len());
        ranked[..n].iter().map(|(_, t)| t).sum::<f64>() / n as f64
    }

    fn training_weight_seen(&self) -> f64 {
        self.weight_seen
    }

    fn boxed_copy(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }

    fn measurements(&self) -> Vec<Measurement> {
        alloc::vec![Measurement::new("stored instances", self.memory.len() as f64)]
    }
}
