/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Segment clustering of the CC instance space.
//!
//! A [`SegmentClusterer`] partitions CC instances into an ordered list of
//! segments. The list may grow as training proceeds, but existing segments
//! never move to a different index and are never removed within a run.
//!
//! | Type | Segments |
//! |------|----------|
//! | [`ProductivitySplitClusterer`] | Fixed productivity (`effort / size`) bands, present from reset |
//! | [`LeaderClusterer`] | Fixed-radius balls created online after a warm-up |

use alloc::boxed::Box;

use crate::instance::Instance;

pub mod leader;
pub mod productivity;

pub use leader::{LeaderClusterer, LeaderConfig};
pub use productivity::{ProductivitySplitClusterer, ProductivitySplitConfig};

/// One region of the CC instance space.
pub trait Segment: core::fmt::Debug {
    /// 1.0 if `instance` (timestamp stripped) belongs to this segment, else 0.0.
    fn inclusion_probability(&self, instance: &Instance) -> f64;
}

/// Online clusterer producing an ordered, append-only list of segments.
pub trait SegmentClusterer: core::fmt::Debug {
    /// Forget everything learnt so far.
    fn reset(&mut self);

    /// Learn from one CC instance (timestamp stripped).
    fn train(&mut self, instance: &Instance);

    /// Current segments, in index order.
    fn segments(&self) -> &[Box<dyn Segment>];

    /// Number of current segments.
    fn segment_count(&self) -> usize {
        self.segments().len()
    }
}

/// Builds the clusterer used for a run.
pub type ClustererFactory = Box<dyn Fn() -> Box<dyn SegmentClusterer>>;

/// Index of the segment `instance` belongs to.
///
/// Picks the maximum inclusion probability, lowest index first on ties.
/// `None` when there are no segments or every segment reports 0.
pub fn assign_segment(segments: &[Box<dyn Segment>], instance: &Instance) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, segment) in segments.iter().enumerate() {
        let p = segment.inclusion_probability(instance);
        if best.map_or(true, |(_, max)| p > max) {
            best = Some((i, p));
        }
    }
    best.filter(|&(_, p)| p > 0.0).map(|(i, _)| i)
}
