/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Turn a batch regressor into an online learner over a sliding window.
//!
//! Every training step appends the instance (evicting the oldest once the
//! window holds `width` instances) and, once at least `min_instances` are
//! buffered, refits the batch regressor from scratch on the whole window.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use super::Learner;
use crate::instance::Instance;
use crate::measurement::Measurement;

/// A regressor that can only be fitted on a complete batch.
pub trait BatchRegressor: core::fmt::Debug {
    /// Discard the previous fit and fit on `instances`.
    fn fit(&mut self, instances: &[Instance]);

    /// Predict with the current fit.
    fn predict(&self, instance: &Instance) -> f64;
}

/// Online wrapper refitting `R` on the most recent `width` instances.
#[derive(Clone, Debug)]
pub struct SlidingWindowLearner<R> {
    regressor: R,
    prototype: R,
    width: usize,
    min_instances: usize,
    buffer: VecDeque<Instance>,
    fitted: bool,
    weight_seen: f64,
}

impl<R: BatchRegressor + Clone> SlidingWindowLearner<R> {
    /// Window of `width` instances, refitting once `min_instances` are held.
    ///
    /// `width` clamps to ≥ 1 and `min_instances` to `1..=width`.
    pub fn new(regressor: R, width: usize, min_instances: usize) -> Self {
        let width = width.max(1);
        Self {
            prototype: regressor.clone(),
            regressor,
            width,
            min_instances: min_instances.clamp(1, width),
            buffer: VecDeque::with_capacity(width.min(1024)),
            fitted: false,
            weight_seen: 0.0,
        }
    }

    /// Instances currently held in the window.
    pub fn window_len(&self) -> usize {
        self.buffer.len()
    }

    /// The wrapped regressor.
    pub fn regressor(&self) -> &R {
        &self.regressor
    }
}

impl<R: BatchRegressor + Clone + 'static> Learner for SlidingWindowLearner<R> {
    fn reset(&mut self) {
        self.regressor = self.prototype.clone();
        self.buffer.clear();
        self.fitted = false;
        self.weight_seen = 0.0;
    }

    fn train(&mut self, instance: &Instance) {
        if instance.weight() <= 0.0 {
            return;
        }
        self.weight_seen += instance.weight();
        if self.buffer.len() == self.width {
            self.buffer.pop_front();
        }
        self.buffer.push_back(instance.clone());

        if self.buffer.len() >= self.min_instances {
            let batch = self.buffer.make_contiguous();
            self.regressor = self.prototype.clone();
            self.regressor.fit(batch);
            self.fitted = true;
        }
    }

    fn predict(&self, instance: &Instance) -> f64 {
        if !self.fitted {
            return 0.0;
        }
        self.regressor.predict(instance)
    }

    fn training_weight_seen(&self) -> f64 {
        self.weight_seen
    }

    fn boxed_copy(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }

    fn measurements(&self) -> Vec<Measurement> {
        alloc::vec![Measurement::new("window size", self.buffer.len() as f64)]
    }
}
