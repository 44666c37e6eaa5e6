/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Leader clustering: fixed-radius balls around the first instance that
//! falls outside every existing ball.
//!
//! No segment exists during the warm-up. Once `warmup` instances have been
//! seen, the buffered ones are placed in arrival order and clustering
//! continues online. Segments are only ever appended, up to `max_segments`.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::{Segment, SegmentClusterer};
use crate::error::OatesError;
use crate::instance::Instance;
use crate::learner::squared_distance;

/// Configuration for [`LeaderClusterer`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaderConfig {
    /// Ball radius in feature space. Must be > 0.
    pub radius: f64,
    /// Instances seen before the first segment may form.
    pub warmup: usize,
    /// Upper bound on the number of segments. Must be ≥ 1.
    pub max_segments: usize,
}

impl Default for LeaderConfig {
    fn default() -> Self {
        Self { radius: 1.0, warmup: 0, max_segments: 8 }
    }
}

impl LeaderConfig {
    /// Reject a non-positive radius or a zero segment cap.
    pub fn validate(&self) -> Result<(), OatesError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(OatesError::InvalidParameter {
                name: "radius".into(),
                reason: alloc::format!("{} is not a positive finite radius", self.radius),
            });
        }
        if self.max_segments == 0 {
            return Err(OatesError::InvalidParameter {
                name: "max_segments".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// A ball of fixed radius around a leader instance.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaderBall {
    /// Feature values of the leader.
    pub centre: Vec<f64>,
    radius_sq: f64,
}

impl Segment for LeaderBall {
    fn inclusion_probability(&self, instance: &Instance) -> f64 {
        let d = squared_distance(self.centre.iter().copied(), instance.features());
        if d <= self.radius_sq {
            1.0
        } else {
            0.0
        }
    }
}

/// Online leader clusterer with a warm-up period.
#[derive(Debug)]
pub struct LeaderClusterer {
    config: LeaderConfig,
    seen: usize,
    warming: Vec<Instance>,
    balls: Vec<Box<dyn Segment>>,
}

impl LeaderClusterer {
    /// Validate `config` and start with no segments.
    pub fn new(config: LeaderConfig) -> Result<Self, OatesError> {
        config.validate()?;
        Ok(Self { config, seen: 0, warming: Vec::new(), balls: Vec::new() })
    }

    /// Instances trained on since the last reset.
    pub fn seen(&self) -> usize {
        self.seen
    }

    fn place(&mut self, instance: &Instance) {
        if self.balls.len() >= self.config.max_segments {
            return;
        }
        if self.balls.iter().any(|b| b.inclusion_probability(instance) > 0.0) {
            return;
        }
        self.balls.push(Box::new(LeaderBall {
            centre: instance.features().collect(),
            radius_sq: self.config.radius * self.config.radius,
        }));
    }
}

impl SegmentClusterer for LeaderClusterer {
    fn reset(&mut self) {
        self.seen = 0;
        self.warming.clear();
        self.balls.clear();
    }

    fn train(&mut self, instance: &Instance) {
        self.seen += 1;
        if self.seen <= self.config.warmup {
            self.warming.push(instance.clone());
            if self.seen < self.config.warmup {
                return;
            }
            let buffered = core::mem::take(&mut self.warming);
            for inst in &buffered {
                self.place(inst);
            }
            return;
        }
        self.place(instance);
    }

    fn segments(&self) -> &[Box<dyn Segment>] {
        &self.balls
    }
}
