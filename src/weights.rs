/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Window-local multiplicative weights and mapping-function retraining.
//!
//! For each replay instance, oldest first, every trained slot's calibrated
//! prediction is scored by absolute error. The first minimum found wins, so
//! ties go to the lowest pool position. Every other trained slot is
//! multiplied by `β_CC`, or `β_WC` for the WC slot. The trained weights are
//! normalised once the whole window has been replayed.
//!
//! ```text
//! w_i ← w_i · β_i   for every trained loser i
//! w_i ← w_i / Σ_trained w_j
//! ```

use log::debug;

use crate::config::WindowMode;
use crate::pool::LearnerPool;
use crate::replay::ReplayWindow;

/// Applies the multiplicative update over a replay window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightUpdater {
    beta_cc: f64,
    beta_wc: f64,
}

impl WeightUpdater {
    /// Updater with the given loser multipliers.
    pub fn new(beta_cc: f64, beta_wc: f64) -> Self {
        Self { beta_cc, beta_wc }
    }

    /// Recompute the pool weights from `window`.
    ///
    /// In [`WindowMode::Sliding`] every weight is first reset to 1.0, so the
    /// result depends on the window alone. [`WindowMode::Legacy`] keeps
    /// accumulating on top of the current weights.
    pub fn recompute(&self, pool: &mut LearnerPool, window: &ReplayWindow, mode: WindowMode) {
        if mode == WindowMode::Sliding {
            pool.fill_weights(1.0);
        }
        let wc = pool.wc_position();
        for instance in window.iter() {
            let target = instance.class_value();
            let mut winner: Option<(usize, f64)> = None;
            for position in 0..pool.len() {
                if !pool.is_trained(position) {
                    continue;
                }
                let prediction = pool.calibrated_prediction(position, instance).unwrap_or_else(|e| {
                    debug!("weights: position {} contributes 0: {}", position, e);
                    0.0
                });
                let error = libm::fabs(prediction - target);
                if error.is_nan() {
                    continue;
                }
                if winner.map_or(true, |(_, min)| error < min) {
                    winner = Some((position, error));
                }
            }
            let winner = winner.map(|(p, _)| p);
            for position in 0..pool.len() {
                if Some(position) == winner || !pool.is_trained(position) {
                    continue;
                }
                let beta = if position == wc { self.beta_wc } else { self.beta_cc };
                pool.scale_weight(position, beta);
            }
        }
        pool.normalise();
    }
}

/// Retrain every mapping function whose learner has been trained, in order,
/// over the instances of `window`.
///
/// In [`WindowMode::Sliding`] each mapping function is reset before the
/// replay. It is always re-bound to its own slot first.
pub fn retrain_mappings(pool: &mut LearnerPool, window: &ReplayWindow, mode: WindowMode) {
    pool.for_each_mapping(|slot, learner, mapping| {
        if !learner.has_trained() {
            return;
        }
        if mode == WindowMode::Sliding {
            mapping.reset();
        }
        mapping.bind(slot);
        for instance in window.iter() {
            if let Err(e) = mapping.train(learner, instance) {
                debug!("mapping: slot {} skipped an instance: {}", slot.0, e);
            }
        }
    });
}
