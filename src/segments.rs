/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Routing of CC instances through the clusterer into pool slots.
//!
//! Every CC instance (timestamp stripped) trains the clusterer first. New
//! segments reported by the clusterer grow the pool before the instance is
//! assigned. An instance no segment claims waits in the pending queue; it has
//! already trained the clusterer, so later attempts only retry assignment.

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{debug, info};

use crate::cluster::{assign_segment, SegmentClusterer};
use crate::instance::Instance;
use crate::pool::{Bootstrap, LearnerPool};

/// Owns the clusterer and the pending-segment queue.
#[derive(Debug)]
pub struct SegmentTrainer {
    clusterer: Box<dyn SegmentClusterer>,
    observed: usize,
    pending: Vec<Instance>,
}

impl SegmentTrainer {
    /// Reset `clusterer` and create slots for any segment it starts with.
    pub fn new(mut clusterer: Box<dyn SegmentClusterer>, pool: &mut LearnerPool) -> Self {
        clusterer.reset();
        let mut trainer = Self { clusterer, observed: 0, pending: Vec::new() };
        trainer.sync(pool);
        trainer
    }

    /// Segments seen so far.
    pub fn segment_count(&self) -> usize {
        self.observed
    }

    /// Instances waiting for a segment.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The clusterer.
    pub fn clusterer(&self) -> &dyn SegmentClusterer {
        self.clusterer.as_ref()
    }

    /// Learn from one CC instance with its timestamp already removed.
    pub fn train(&mut self, pool: &mut LearnerPool, instance: Instance, bootstrap: Bootstrap) {
        self.clusterer.train(&instance);
        self.sync(pool);
        match assign_segment(self.clusterer.segments(), &instance) {
            Some(segment) => train_segment(pool, segment, &instance, bootstrap),
            None => self.pending.push(instance),
        }
        self.replay_pending(pool, bootstrap);
    }

    fn sync(&mut self, pool: &mut LearnerPool) {
        let count = self.clusterer.segment_count();
        let added = count.saturating_sub(self.observed);
        if added > 0 {
            pool.add_segments(added);
            info!("segments: {} -> {}, pool size {}", self.observed, count, pool.len());
            self.observed = count;
        }
    }

    fn replay_pending(&mut self, pool: &mut LearnerPool, bootstrap: Bootstrap) {
        if self.pending.is_empty() {
            return;
        }
        let segments = self.clusterer.segments();
        self.pending.retain(|instance| match assign_segment(segments, instance) {
            Some(segment) => {
                train_segment(pool, segment, instance, bootstrap);
                false
            }
            None => true,
        });
    }
}

fn train_segment(pool: &mut LearnerPool, segment: usize, instance: &Instance, bootstrap: Bootstrap) {
    match pool.slot_for_segment(segment) {
        Some(slot) => pool.train_slot(slot, instance, bootstrap),
        None => debug!("segments: no slot for segment {}", segment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Segment;
    use crate::instance::Schema;
    use crate::learner::KnnRegressor;
    use crate::mapping::LinearMapping;
    use alloc::sync::Arc;
    use alloc::vec;

    /// Segment `k` claims instances whose first value rounds to `k`.
    #[derive(Debug)]
    struct Bucket(usize);

    impl Segment for Bucket {
        fn inclusion_probability(&self, instance: &Instance) -> f64 {
            if libm::round(instance.value(0)) as usize == self.0 {
                1.0
            } else {
                0.0
            }
        }
    }

    /// Grows one bucket per training call, after `delay` calls.
    #[derive(Debug)]
    struct Growing {
        calls: usize,
        delay: usize,
        buckets: Vec<Box<dyn Segment>>,
    }

    impl SegmentClusterer for Growing {
        fn reset(&mut self) {
            self.calls = 0;
            self.buckets.clear();
        }
        fn train(&mut self, _instance: &Instance) {
            self.calls += 1;
            if self.calls > self.delay {
                let k = self.buckets.len();
                self.buckets.push(Box::new(Bucket(k)));
            }
        }
        fn segments(&self) -> &[Box<dyn Segment>] {
            &self.buckets
        }
    }

    fn pool() -> LearnerPool {
        LearnerPool::new(Box::new(KnnRegressor::new(1, 10)), Box::new(LinearMapping::default()))
    }

    fn inst(x: f64) -> Instance {
        let schema = Arc::new(Schema::numeric("cc", 2, 1).unwrap());
        Instance::new(schema, vec![x, 1.0]).unwrap()
    }

    fn growing(delay: usize) -> Box<dyn SegmentClusterer> {
        Box::new(Growing { calls: 0, delay, buckets: Vec::new() })
    }

    #[test]
    fn test_growth_prepends_and_keeps_wc_last() {
        let mut p = pool();
        let wc = p.slot_at(0).unwrap();
        let mut t = SegmentTrainer::new(growing(0), &mut p);
        assert_eq!(p.len(), 1);
        for x in [0.0, 1.0, 2.0] {
            t.train(&mut p, inst(x), Bootstrap::BeforeFirstStep);
            assert_eq!(p.slot_at(p.wc_position()), Some(wc));
        }
        assert_eq!(t.segment_count(), 3);
        assert_eq!(t.clusterer().segment_count(), 3);
        assert_eq!(p.len(), 4);
        assert_eq!(p.segment(0), Some(2));
        assert_eq!(p.segment(2), Some(0));
        assert!((0..3).all(|pos| p.is_trained(pos)));
    }

    #[test]
    fn test_unassigned_instances_wait_then_replay() {
        let mut p = pool();
        let mut t = SegmentTrainer::new(growing(2), &mut p);
        t.train(&mut p, inst(0.0), Bootstrap::BeforeFirstStep);
        t.train(&mut p, inst(0.0), Bootstrap::BeforeFirstStep);
        assert_eq!(t.pending_len(), 2);
        assert_eq!(p.len(), 1);
        t.train(&mut p, inst(0.0), Bootstrap::BeforeFirstStep);
        assert_eq!(t.pending_len(), 0);
        assert_eq!(p.learner(0).unwrap().training_weight_seen(), 3.0);
    }

    #[test]
    fn test_unclaimed_instance_stays_pending() {
        let mut p = pool();
        let mut t = SegmentTrainer::new(growing(0), &mut p);
        t.train(&mut p, inst(7.0), Bootstrap::BeforeFirstStep);
        assert_eq!(t.pending_len(), 1);
        assert_eq!(p.trained_count(), 0);
    }

    #[test]
    fn test_first_training_seeds_weight() {
        let mut p = pool();
        let mut t = SegmentTrainer::new(growing(0), &mut p);
        t.train(&mut p, inst(0.0), Bootstrap::BeforeFirstStep);
        assert_eq!(p.weight(0), Some(0.5));
    }
}
