/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Mapping functions: calibrate a CC learner's output into WC units.
//!
//! A mapping function is bound to one pool slot and is always handed that
//! slot's learner explicitly; it never owns the learner.
//!
//! # [`LinearMapping`]
//!
//! A single multiplicative factor `b`, learnt as an exponential moving
//! average of the ratio between the true target and the wrapped prediction:
//!
//! ```text
//! ratio = target / p        (1.0 when p == 0)
//! first update:   b = ratio
//! later updates:  b = (1 − η)·b + η·ratio
//! prediction:     b · p
//! ```

use alloc::boxed::Box;

use crate::error::OatesError;
use crate::instance::Instance;
use crate::learner::Learner;
use crate::pool::SlotId;

/// Online calibration of one slot learner's predictions.
pub trait MappingFunction: core::fmt::Debug {
    /// Attach to the learner of `slot`.
    fn bind(&mut self, slot: SlotId);

    /// Slot currently bound, if any.
    fn bound(&self) -> Option<SlotId>;

    /// Return to the initial state. Also clears the binding.
    fn reset(&mut self);

    /// Learn from one WC instance given the bound slot's learner.
    ///
    /// Fails without updating if unbound or if the target is not numeric.
    fn train(&mut self, learner: &dyn Learner, instance: &Instance) -> Result<(), OatesError>;

    /// Calibrated prediction of `learner` for `instance`.
    fn predict(&self, learner: &dyn Learner, instance: &Instance) -> Result<f64, OatesError>;

    /// Total weight of the instances learnt from since the last reset.
    fn training_weight_seen(&self) -> f64;

    /// Calibration factor, for mapping functions that have one.
    fn factor(&self) -> Option<f64> {
        None
    }

    /// Independent copy, state included.
    fn boxed_copy(&self) -> Box<dyn MappingFunction>;
}

/// Builds the prototype mapping function every CC slot is copied from.
pub type MappingFactory = Box<dyn Fn() -> Box<dyn MappingFunction>>;

/// Configuration for [`LinearMapping`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearMappingConfig {
    /// Learning rate η of the factor update, in [0, 1]. Default 0.1.
    pub learning_rate: f64,
}

impl Default for LinearMappingConfig {
    fn default() -> Self {
        Self { learning_rate: 0.1 }
    }
}

impl LinearMappingConfig {
    /// Reject a learning rate outside [0, 1].
    pub fn validate(&self) -> Result<(), OatesError> {
        if !(0.0..=1.0).contains(&self.learning_rate) {
            return Err(OatesError::InvalidParameter {
                name: "learning_rate".into(),
                reason: alloc::format!("{} is outside [0, 1]", self.learning_rate),
            });
        }
        Ok(())
    }
}

/// Multiplicative calibration factor learnt by exponential moving average.
#[derive(Clone, Debug)]
pub struct LinearMapping {
    learning_rate: f64,
    b: f64,
    instances_seen: u64,
    weight_seen: f64,
    slot: Option<SlotId>,
}

impl LinearMapping {
    /// Fresh mapping with `b = 1.0`.
    pub fn new(config: LinearMappingConfig) -> Result<Self, OatesError> {
        config.validate()?;
        Ok(Self {
            learning_rate: config.learning_rate,
            b: 1.0,
            instances_seen: 0,
            weight_seen: 0.0,
            slot: None,
        })
    }

    /// Current factor `b`.
    pub fn b(&self) -> f64 {
        self.b
    }

    fn check(&self, instance: &Instance) -> Result<(), OatesError> {
        if self.slot.is_none() {
            return Err(OatesError::MappingNotBound);
        }
        if !instance.is_regression() {
            return Err(OatesError::NotRegression {
                attribute: instance.schema().class_attribute().name.clone(),
            });
        }
        Ok(())
    }
}

impl Default for LinearMapping {
    fn default() -> Self {
        Self {
            learning_rate: LinearMappingConfig::default().learning_rate,
            b: 1.0,
            instances_seen: 0,
            weight_seen: 0.0,
            slot: None,
        }
    }
}

impl MappingFunction for LinearMapping {
    fn bind(&mut self, slot: SlotId) {
        self.slot = Some(slot);
    }

    fn bound(&self) -> Option<SlotId> {
        self.slot
    }

    fn reset(&mut self) {
        self.b = 1.0;
        self.instances_seen = 0;
        self.weight_seen = 0.0;
        self.slot = None;
    }

    fn train(&mut self, learner: &dyn Learner, instance: &Instance) -> Result<(), OatesError> {
        self.check(instance)?;
        if instance.weight() <= 0.0 {
            return Ok(());
        }
        let p = learner.predict(instance);
        let ratio = if p != 0.0 { instance.class_value() / p } else { 1.0 };
        self.b = if self.instances_seen == 0 {
            ratio
        } else {
            (1.0 - self.learning_rate) * self.b + self.learning_rate * ratio
        };
        self.instances_seen += 1;
        self.weight_seen += instance.weight();
        Ok(())
    }

    fn predict(&self, learner: &dyn Learner, instance: &Instance) -> Result<f64, OatesError> {
        self.check(instance)?;
        Ok(self.b * learner.predict(instance))
    }

    fn training_weight_seen(&self) -> f64 {
        self.weight_seen
    }

    fn factor(&self) -> Option<f64> {
        Some(self.b)
    }

    fn boxed_copy(&self) -> Box<dyn MappingFunction> {
        Box::new(self.clone())
    }
}
