/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Learn in log space: `x ↦ ln(1 + x)` on every numeric attribute.
//!
//! Numeric attributes are assumed ≥ 0. Predictions are mapped back with
//! `exp(p) − 1`; a back-converted prediction that is NaN or infinite is
//! replaced by [`UNLOG_FALLBACK`].

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::Learner;
use crate::instance::Instance;
use crate::measurement::Measurement;

/// Substitute for predictions that overflow when leaving log space.
pub const UNLOG_FALLBACK: f64 = 1_000_000.0;

/// Wraps a learner so that it trains and predicts on log-transformed values.
#[derive(Clone, Debug)]
pub struct LogLearner<L> {
    inner: L,
}

impl<L: Learner> LogLearner<L> {
    /// Wrap `inner`.
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    /// The wrapped learner.
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

/// `ln(1 + x)` applied to the numeric attributes of `instance`.
pub fn log_instance(instance: &Instance) -> Instance {
    let schema = instance.schema().clone();
    instance.map_values(|i, v| match schema.attribute(i) {
        Some(att) if att.is_numeric() => libm::log1p(v),
        _ => v,
    })
}

/// Inverse of the target transform, with the non-finite fallback.
pub fn unlog_prediction(p: f64) -> f64 {
    let v = libm::expm1(p);
    if v.is_finite() {
        v
    } else {
        UNLOG_FALLBACK
    }
}

impl<L: Learner + Clone + 'static> Learner for LogLearner<L> {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn train(&mut self, instance: &Instance) {
        self.inner.train(&log_instance(instance));
    }

    fn predict(&self, instance: &Instance) -> f64 {
        let p = self.inner.predict(&log_instance(instance));
        if instance.is_regression() {
            unlog_prediction(p)
        } else {
            p
        }
    }

    fn training_weight_seen(&self) -> f64 {
        self.inner.training_weight_seen()
    }

    fn boxed_copy(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }

    fn measurements(&self) -> Vec<Measurement> {
        self.inner.measurements()
    }
}
