/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Read-only diagnostics: named measurements and a per-slot snapshot.
//!
//! Neither type feeds back into learning. Reporting collaborators consume
//! them; with the `serde` feature both serialise for transport.

use alloc::string::String;
use alloc::vec::Vec;

/// A single named diagnostic value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    /// Human-readable name, e.g. `"weight 2"`.
    pub name: String,
    /// Current value.
    pub value: f64,
}

impl Measurement {
    /// Create a measurement.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self { name: name.into(), value }
    }
}

/// State of one pool slot at snapshot time.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotRecord {
    /// Pool position (WC slot is last).
    pub position: usize,
    /// Segment index for CC slots, `None` for the WC slot.
    pub segment: Option<usize>,
    /// Current adaptive weight.
    pub weight: f64,
    /// Calibration factor of the mapping function, if it exposes one.
    pub factor: Option<f64>,
    /// Whether the slot's learner has been trained at least once.
    pub trained: bool,
}

/// Snapshot of the whole ensemble, in pool order.
///
/// ```rust,ignore
/// let snapshot = oates.snapshot();
/// let json = serde_json::to_string(&snapshot).unwrap();
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnsembleSnapshot {
    /// Number of WC instances processed.
    pub step: u64,
    /// Number of CC slots plus the WC slot.
    pub pool_size: usize,
    /// Current length of the replay window.
    pub replay_len: usize,
    /// CC instances read ahead but not yet trainable.
    pub backlog_len: usize,
    /// CC instances waiting for a segment.
    pub pending_len: usize,
    /// Per-slot state.
    pub slots: Vec<SlotRecord>,
}

impl EnsembleSnapshot {
    /// Sum of the weights of trained slots.
    pub fn trained_weight_sum(&self) -> f64 {
        self.slots.iter().filter(|s| s.trained).map(|s| s.weight).sum()
    }
}
