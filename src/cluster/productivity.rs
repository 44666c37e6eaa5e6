/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Productivity split clusterer.
//!
//! Productivity is `effort / size`, read from two configured attributes
//! (`f64::MAX` when size is 0). Sorted thresholds `t₁ < … < tₖ` define
//! `k + 1` bands, left-exclusive and right-inclusive:
//!
//! ```text
//! (0⁺, t₁]  (t₁, t₂]  …  (tₖ, MAX]
//! ```
//!
//! Bands exist from construction and training does not change them, so every
//! CC slot is created when the ensemble is reset.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use heapless::Vec as HVec;
use log::debug;

use super::{Segment, SegmentClusterer};
use crate::error::OatesError;
use crate::instance::Instance;

/// Lower bound of the first band: the smallest positive subnormal `f64`.
const SMALLEST_POSITIVE: f64 = 5e-324;

/// Maximum number of productivity thresholds.
pub const MAX_THRESHOLDS: usize = 16;

/// Configuration for [`ProductivitySplitClusterer`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProductivitySplitConfig {
    /// Thresholds separated by `;`, e.g. `"2.85;6.6"`.
    pub thresholds: String,
    /// Index of the effort attribute (0-based).
    pub effort_index: usize,
    /// Index of the size attribute (0-based).
    pub size_index: usize,
}

impl Default for ProductivitySplitConfig {
    fn default() -> Self {
        Self { thresholds: "2.85;6.6".into(), effort_index: 16, size_index: 15 }
    }
}

/// One productivity band.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductivityBand {
    /// Exclusive lower bound.
    pub left: f64,
    /// Inclusive upper bound.
    pub right: f64,
    effort_index: usize,
    size_index: usize,
}

impl ProductivityBand {
    /// Productivity of `instance` under this band's attribute indices.
    ///
    /// `None` when either index is out of range for the instance.
    pub fn productivity(&self, instance: &Instance) -> Option<f64> {
        let values = instance.values();
        let size = *values.get(self.size_index)?;
        let effort = *values.get(self.effort_index)?;
        Some(if size != 0.0 { effort / size } else { f64::MAX })
    }
}

impl Segment for ProductivityBand {
    fn inclusion_probability(&self, instance: &Instance) -> f64 {
        match self.productivity(instance) {
            Some(prod) if prod > self.left && prod <= self.right => 1.0,
            Some(_) => 0.0,
            None => {
                debug!(
                    "productivity: effort {} / size {} out of range for {} attributes",
                    self.effort_index,
                    self.size_index,
                    instance.num_attributes()
                );
                0.0
            }
        }
    }
}

/// Splits CC data into fixed productivity bands.
#[derive(Debug)]
pub struct ProductivitySplitClusterer {
    thresholds: HVec<f64, MAX_THRESHOLDS>,
    effort_index: usize,
    size_index: usize,
    bands: Vec<Box<dyn Segment>>,
}

impl ProductivitySplitClusterer {
    /// Parse and sort the thresholds, then build the bands.
    pub fn new(config: &ProductivitySplitConfig) -> Result<Self, OatesError> {
        let thresholds = parse_thresholds(&config.thresholds)?;
        let mut clusterer = Self {
            thresholds,
            effort_index: config.effort_index,
            size_index: config.size_index,
            bands: Vec::new(),
        };
        clusterer.build_bands();
        Ok(clusterer)
    }

    /// Sorted thresholds.
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    fn band(&self, left: f64, right: f64) -> Box<dyn Segment> {
        Box::new(ProductivityBand {
            left,
            right,
            effort_index: self.effort_index,
            size_index: self.size_index,
        })
    }

    fn build_bands(&mut self) {
        self.bands.clear();
        if self.thresholds.is_empty() {
            return;
        }
        let mut bounds: Vec<f64> = Vec::with_capacity(self.thresholds.len() + 2);
        bounds.push(SMALLEST_POSITIVE);
        bounds.extend(self.thresholds.iter().copied());
        bounds.push(f64::MAX);
        let bands: Vec<Box<dyn Segment>> =
            bounds.windows(2).map(|w| self.band(w[0], w[1])).collect();
        self.bands = bands;
    }
}

fn parse_thresholds(raw: &str) -> Result<HVec<f64, MAX_THRESHOLDS>, OatesError> {
    let mut out: HVec<f64, MAX_THRESHOLDS> = HVec::new();
    for part in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let t: f64 = part.parse().map_err(|_| OatesError::InvalidParameter {
            name: "thresholds".into(),
            reason: alloc::format!("'{}' is not a number", part),
        })?;
        out.push(t).map_err(|_| OatesError::InvalidParameter {
            name: "thresholds".into(),
            reason: alloc::format!("more than {} thresholds", MAX_THRESHOLDS),
        })?;
    }
    out.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
    Ok(out)
}

impl SegmentClusterer for ProductivitySplitClusterer {
    fn reset(&mut self) {
        self.build_bands();
    }

    fn train(&mut self, _instance: &Instance) {}

    fn segments(&self) -> &[Box<dyn Segment>] {
        &self.bands
    }
}
