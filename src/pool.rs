/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! The learner pool: one calibrated slot per CC segment plus the WC slot.
//!
//! Slots live in an arena and are addressed by [`SlotId`], which never
//! changes once issued. Pool *positions* are a separate ordered list: new CC
//! slots are inserted at the front, so segment indices reported low to high
//! by the clusterer appear in reverse pool order, and the WC slot is always
//! the last position.
//!
//! # Invariants
//!
//! - one weight per slot; `len() == cc_len() + 1`.
//! - the WC slot is position `len() - 1` and carries no mapping function.
//! - the slot serving segment `s` is fixed from the moment `s` appears.

use alloc::boxed::Box;
use alloc::vec::Vec;

use hashbrown::HashMap;
use log::debug;

use crate::error::OatesError;
use crate::instance::Instance;
use crate::learner::Learner;
use crate::mapping::MappingFunction;

// ─── Slot ───────────────────────────────────────────────────────────────────

/// Stable identifier of a pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

#[derive(Debug)]
struct Slot {
    learner: Box<dyn Learner>,
    /// `None` for the WC slot.
    mapping: Option<Box<dyn MappingFunction>>,
    weight: f64,
    segment: Option<usize>,
}

/// How the weight of a slot is seeded on its first training event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bootstrap {
    /// No WC instance has been processed yet: `1 / pool size`.
    BeforeFirstStep,
    /// At least one WC step has run: `1 / trained slots`.
    AfterFirstStep,
}

// ─── LearnerPool ────────────────────────────────────────────────────────────

/// Ordered collection of calibrated CC slots and the WC slot.
#[derive(Debug)]
pub struct LearnerPool {
    slots: Vec<Slot>,
    order: Vec<SlotId>,
    segment_slots: HashMap<usize, SlotId>,
    learner_prototype: Box<dyn Learner>,
    mapping_prototype: Box<dyn MappingFunction>,
}

impl LearnerPool {
    /// Pool holding only a fresh WC slot with weight 1.0.
    pub fn new(
        mut learner_prototype: Box<dyn Learner>,
        mut mapping_prototype: Box<dyn MappingFunction>,
    ) -> Self {
        learner_prototype.reset();
        mapping_prototype.reset();
        let wc = Slot {
            learner: learner_prototype.boxed_copy(),
            mapping: None,
            weight: 1.0,
            segment: None,
        };
        Self {
            slots: alloc::vec![wc],
            order: alloc::vec![SlotId(0)],
            segment_slots: HashMap::new(),
            learner_prototype,
            mapping_prototype,
        }
    }

    /// Number of slots, WC slot included.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always `false`: the WC slot exists from construction.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of CC slots.
    pub fn cc_len(&self) -> usize {
        self.order.len() - 1
    }

    /// Position of the WC slot.
    pub fn wc_position(&self) -> usize {
        self.order.len() - 1
    }

    /// Slot at pool position `position`.
    pub fn slot_at(&self, position: usize) -> Option<SlotId> {
        self.order.get(position).copied()
    }

    /// Slot serving segment `segment`.
    pub fn slot_for_segment(&self, segment: usize) -> Option<SlotId> {
        self.segment_slots.get(&segment).copied()
    }

    /// Current pool position of `slot`.
    pub fn position_of(&self, slot: SlotId) -> Option<usize> {
        self.order.iter().position(|&id| id == slot)
    }

    /// Prepend `k` fresh CC slots for the next `k` segment indices.
    ///
    /// Each slot gets a copy of both prototypes, weight 1.0, and a mapping
    /// function bound to it. Existing slots keep their weights and learners.
    pub fn add_segments(&mut self, k: usize) {
        for _ in 0..k {
            let segment = self.segment_slots.len();
            let id = SlotId(self.slots.len());
            let mut mapping = self.mapping_prototype.boxed_copy();
            mapping.bind(id);
            self.slots.push(Slot {
                learner: self.learner_prototype.boxed_copy(),
                mapping: Some(mapping),
                weight: 1.0,
                segment: Some(segment),
            });
            self.order.insert(0, id);
            self.segment_slots.insert(segment, id);
            debug!("pool: segment {} -> slot {}, pool size {}", segment, id.0, self.len());
        }
    }

    /// Number of slots whose learner has been trained at least once.
    pub fn trained_count(&self) -> usize {
        self.slots.iter().filter(|s| s.learner.has_trained()).count()
    }

    /// Whether the slot at `position` has been trained.
    pub fn is_trained(&self, position: usize) -> bool {
        self.slot(position).is_some_and(|s| s.learner.has_trained())
    }

    /// Weight of the slot at `position`.
    pub fn weight(&self, position: usize) -> Option<f64> {
        self.slot(position).map(|s| s.weight)
    }

    /// Weights in pool order.
    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.order.iter().map(|id| self.slots[id.0].weight)
    }

    /// Overwrite the weight at `position`.
    pub fn set_weight(&mut self, position: usize, weight: f64) {
        if let Some(slot) = self.slot_mut(position) {
            slot.weight = weight;
        }
    }

    /// Multiply the weight at `position` by `factor`.
    pub fn scale_weight(&mut self, position: usize, factor: f64) {
        if let Some(slot) = self.slot_mut(position) {
            slot.weight *= factor;
        }
    }

    /// Set every weight, trained or not, to `weight`.
    pub fn fill_weights(&mut self, weight: f64) {
        for slot in &mut self.slots {
            slot.weight = weight;
        }
    }

    /// Divide each trained weight by the sum of the trained weights.
    ///
    /// Untrained weights are left as they are. A zero sum falls back to a
    /// uniform `1 / trained` split.
    pub fn normalise(&mut self) {
        let trained = self.trained_count();
        if trained == 0 {
            return;
        }
        let sum: f64 = self
            .slots
            .iter()
            .filter(|s| s.learner.has_trained())
            .map(|s| s.weight)
            .sum();
        let uniform = 1.0 / trained as f64;
        for slot in self.slots.iter_mut().filter(|s| s.learner.has_trained()) {
            slot.weight = if sum > 0.0 { slot.weight / sum } else { uniform };
        }
    }

    /// Segment served by the slot at `position`; `None` for the WC slot.
    pub fn segment(&self, position: usize) -> Option<usize> {
        self.slot(position).and_then(|s| s.segment)
    }

    /// Calibration factor of the mapping function at `position`.
    pub fn factor(&self, position: usize) -> Option<f64> {
        self.slot(position).and_then(|s| s.mapping.as_ref()).and_then(|m| m.factor())
    }

    /// Learner at `position`.
    pub fn learner(&self, position: usize) -> Option<&dyn Learner> {
        self.slot(position).map(|s| s.learner.as_ref())
    }

    /// Mapping function at `position`; `None` for the WC slot.
    pub fn mapping(&self, position: usize) -> Option<&dyn MappingFunction> {
        self.slot(position).and_then(|s| s.mapping.as_deref())
    }

    /// Train the learner of `slot`, seeding its weight on the first event.
    ///
    /// Instances with weight ≤ 0 are ignored.
    pub fn train_slot(&mut self, slot: SlotId, instance: &Instance, bootstrap: Bootstrap) {
        if instance.weight() <= 0.0 {
            return;
        }
        if slot.0 >= self.slots.len() {
            return;
        }
        let index = slot.0;
        if !self.slots[index].learner.has_trained() {
            let trained = self.trained_count();
            let seeded = match bootstrap {
                Bootstrap::AfterFirstStep if trained > 0 => 1.0 / trained as f64,
                _ => 1.0 / self.len() as f64,
            };
            debug!("pool: slot {} trained for the first time, weight {}", index, seeded);
            self.slots[index].weight = seeded;
        }
        self.slots[index].learner.train(instance);
    }

    /// Train the WC learner. Its weight is handled by the controller.
    pub fn train_wc(&mut self, instance: &Instance) {
        let id = self.order[self.wc_position()];
        self.slots[id.0].learner.train(instance);
    }

    /// Calibrated prediction of the slot at `position`.
    ///
    /// CC slots answer through their mapping function, the WC slot through
    /// its raw learner.
    pub fn calibrated_prediction(&self, position: usize, instance: &Instance) -> Result<f64, OatesError> {
        let slot = self.slot(position).ok_or_else(|| OatesError::InvalidParameter {
            name: "position".into(),
            reason: alloc::format!("{} is outside a pool of {}", position, self.len()),
        })?;
        match &slot.mapping {
            Some(mapping) => mapping.predict(slot.learner.as_ref(), instance),
            None => Ok(slot.learner.predict(instance)),
        }
    }

    /// Visit every CC slot with its learner and mapping function.
    pub fn for_each_mapping(
        &mut self,
        mut f: impl FnMut(SlotId, &dyn Learner, &mut Box<dyn MappingFunction>),
    ) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Some(mapping) = slot.mapping.as_mut() {
                f(SlotId(i), slot.learner.as_ref(), mapping);
            }
        }
    }

    fn slot(&self, position: usize) -> Option<&Slot> {
        self.order.get(position).map(|id| &self.slots[id.0])
    }

    fn slot_mut(&mut self, position: usize) -> Option<&mut Slot> {
        let id = *self.order.get(position)?;
        self.slots.get_mut(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Schema;
    use crate::learner::KnnRegressor;
    use crate::mapping::LinearMapping;
    use alloc::sync::Arc;
    use alloc::vec;

    fn pool() -> LearnerPool {
        LearnerPool::new(Box::new(KnnRegressor::new(1, 100)), Box::new(LinearMapping::default()))
    }

    fn inst(x: f64, y: f64) -> Instance {
        let schema = Arc::new(Schema::numeric("t", 2, 1).unwrap());
        Instance::new(schema, vec![x, y]).unwrap()
    }

    #[test]
    fn test_new_pool_is_wc_only() {
        let p = pool();
        assert_eq!(p.len(), 1);
        assert_eq!(p.cc_len(), 0);
        assert_eq!(p.weight(0), Some(1.0));
        assert!(p.mapping(0).is_none());
    }

    #[test]
    fn test_segments_prepend_and_keep_wc_last() {
        let mut p = pool();
        let wc = p.slot_at(0).unwrap();
        p.add_segments(1);
        p.add_segments(2);
        assert_eq!(p.len(), 4);
        assert_eq!(p.slot_at(3), Some(wc));
        assert_eq!(p.segment(0), Some(2));
        assert_eq!(p.segment(1), Some(1));
        assert_eq!(p.segment(2), Some(0));
        assert_eq!(p.segment(3), None);
        for pos in 0..3 {
            assert_eq!(p.mapping(pos).unwrap().bound(), p.slot_at(pos));
            assert_eq!(p.weight(pos), Some(1.0));
        }
    }

    #[test]
    fn test_segment_slot_is_stable_across_growth() {
        let mut p = pool();
        p.add_segments(1);
        let first = p.slot_for_segment(0).unwrap();
        p.train_slot(first, &inst(1.0, 5.0), Bootstrap::BeforeFirstStep);
        p.add_segments(3);
        assert_eq!(p.slot_for_segment(0), Some(first));
        let pos = p.position_of(first).unwrap();
        assert_eq!(pos, 3);
        assert!(p.is_trained(pos));
        assert_eq!(p.trained_count(), 1);
    }

    #[test]
    fn test_bootstrap_before_first_step_uses_pool_size() {
        let mut p = pool();
        p.add_segments(3);
        let id = p.slot_for_segment(1).unwrap();
        p.train_slot(id, &inst(1.0, 1.0), Bootstrap::BeforeFirstStep);
        assert_eq!(p.weight(p.position_of(id).unwrap()), Some(0.25));
    }

    #[test]
    fn test_bootstrap_after_first_step_uses_trained_count() {
        let mut p = pool();
        p.add_segments(3);
        p.train_wc(&inst(0.0, 1.0));
        let a = p.slot_for_segment(0).unwrap();
        p.train_slot(a, &inst(1.0, 1.0), Bootstrap::AfterFirstStep);
        assert_eq!(p.weight(p.position_of(a).unwrap()), Some(1.0));
        let b = p.slot_for_segment(2).unwrap();
        p.train_slot(b, &inst(1.0, 1.0), Bootstrap::AfterFirstStep);
        assert_eq!(p.weight(p.position_of(b).unwrap()), Some(0.5));
        // second training keeps the weight
        p.set_weight(p.position_of(b).unwrap(), 0.7);
        p.train_slot(b, &inst(2.0, 1.0), Bootstrap::AfterFirstStep);
        assert_eq!(p.weight(p.position_of(b).unwrap()), Some(0.7));
    }

    #[test]
    fn test_after_first_step_without_trained_slots_falls_back() {
        let mut p = pool();
        p.add_segments(1);
        let id = p.slot_for_segment(0).unwrap();
        p.train_slot(id, &inst(1.0, 1.0), Bootstrap::AfterFirstStep);
        assert_eq!(p.weight(0), Some(0.5));
    }

    #[test]
    fn test_non_positive_weight_is_ignored() {
        let mut p = pool();
        p.add_segments(1);
        let id = p.slot_for_segment(0).unwrap();
        p.train_slot(id, &inst(1.0, 1.0).with_weight(0.0), Bootstrap::BeforeFirstStep);
        assert!(!p.is_trained(0));
        assert_eq!(p.weight(0), Some(1.0));
    }

    #[test]
    fn test_normalise_only_touches_trained() {
        let mut p = pool();
        p.add_segments(2);
        p.train_wc(&inst(0.0, 1.0));
        let id = p.slot_for_segment(0).unwrap();
        p.train_slot(id, &inst(0.0, 1.0), Bootstrap::BeforeFirstStep);
        p.set_weight(1, 3.0);
        p.set_weight(2, 1.0);
        p.normalise();
        assert_eq!(p.weight(0), Some(1.0));
        assert!((p.weight(1).unwrap() - 0.75).abs() < 1e-12);
        assert!((p.weight(2).unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_normalise_zero_sum_goes_uniform() {
        let mut p = pool();
        p.add_segments(1);
        p.train_wc(&inst(0.0, 1.0));
        p.train_slot(p.slot_for_segment(0).unwrap(), &inst(0.0, 1.0), Bootstrap::BeforeFirstStep);
        p.fill_weights(0.0);
        p.normalise();
        assert_eq!(p.weight(0), Some(0.5));
        assert_eq!(p.weight(1), Some(0.5));
    }

    #[test]
    fn test_calibrated_prediction_paths() {
        let mut p = pool();
        p.add_segments(1);
        p.train_wc(&inst(0.0, 7.0));
        p.train_slot(p.slot_for_segment(0).unwrap(), &inst(0.0, 2.0), Bootstrap::BeforeFirstStep);
        assert_eq!(p.calibrated_prediction(1, &inst(0.0, 0.0)), Ok(7.0));
        assert_eq!(p.calibrated_prediction(0, &inst(0.0, 0.0)), Ok(2.0));
        assert!(p.calibrated_prediction(5, &inst(0.0, 0.0)).is_err());
    }
}
