/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Regression learner capability and the learners shipped with the crate.
//!
//! Any type implementing [`Learner`] can back a pool slot. The ensemble only
//! relies on the contract below; it never inspects a learner's internals.
//!
//! | Type | What it does |
//! |------|--------------|
//! | [`KnnRegressor`] | Mean target of the k nearest stored instances |
//! | [`SlidingWindowLearner`] | Refits a [`BatchRegressor`] on the last `width` instances |
//! | [`LeastSquares`] | Ridge-regularised linear batch regressor |
//! | [`LogLearner`] | Trains the inner learner in `ln(1 + x)` space |
//!
//! # Contract
//!
//! - `train` ignores instances with weight ≤ 0 and otherwise adds the weight
//!   to [`Learner::training_weight_seen`].
//! - `has_trained()` is `training_weight_seen() > 0`.
//! - `predict` on an untrained learner returns a finite neutral value.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::instance::Instance;
use crate::measurement::Measurement;

pub mod knn;
pub mod linear;
pub mod log_transform;
pub mod window;

pub use knn::KnnRegressor;
pub use linear::LeastSquares;
pub use log_transform::LogLearner;
pub use window::{BatchRegressor, SlidingWindowLearner};

/// Online regression model.
pub trait Learner: core::fmt::Debug {
    /// Forget everything learnt so far.
    fn reset(&mut self);

    /// Learn from one labelled instance.
    fn train(&mut self, instance: &Instance);

    /// Predict the target of `instance`.
    fn predict(&self, instance: &Instance) -> f64;

    /// Total weight of the instances learnt from since the last reset.
    fn training_weight_seen(&self) -> f64;

    /// Whether at least one instance has been learnt from.
    fn has_trained(&self) -> bool {
        self.training_weight_seen() > 0.0
    }

    /// Independent copy of this learner, state included.
    fn boxed_copy(&self) -> Box<dyn Learner>;

    /// Learner-specific diagnostics.
    fn measurements(&self) -> Vec<Measurement> {
        Vec::new()
    }
}

/// Builds the prototype learner every slot is copied from.
pub type LearnerFactory = Box<dyn Fn() -> Box<dyn Learner>>;

/// Squared Euclidean distance between two feature iterators.
pub(crate) fn squared_distance(
    a: impl Iterator<Item = f64>,
    b: impl Iterator<Item = f64>,
) -> f64 {
    a.zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
