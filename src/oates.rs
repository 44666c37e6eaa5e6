/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! The OATES controller and its builder.
//!
//! Per WC instance, in order:
//!
//! 1. validate (numeric target, CC/WC attribute counts) and lazily align the
//!    CC class index and the timestamp-free schema;
//! 2. CC catch-up, mapping-function retrain, weight recompute (skipped after
//!    the first step in [`WindowMode::Legacy`]);
//! 3. on sampled steps (`step % period == 0`) append the instance to the
//!    replay window, otherwise give back its training weight;
//! 4. on sampled steps recompute weights, retrain mapping functions, train
//!    the WC learner, and on step 0 seed the WC weight with `1 / trained`;
//! 5. advance the step.
//!
//! [`Oates::predict`] runs step 2 and returns `Σ w_i · p_i` over trained slots.
//! Neither entry point returns an error; failures are logged and degrade to
//! a skipped instance or a zero contribution.

use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::{debug, error, warn};

use crate::cluster::{ClustererFactory, SegmentClusterer};
use crate::config::{OatesConfig, WindowMode};
use crate::error::OatesError;
use crate::instance::{Instance, Schema, Timestamp};
use crate::learner::{Learner, LearnerFactory};
use crate::mapping::{LinearMapping, MappingFactory, MappingFunction};
use crate::measurement::{EnsembleSnapshot, Measurement, SlotRecord};
use crate::merger::StreamMerger;
use crate::pool::{Bootstrap, LearnerPool};
use crate::replay::ReplayWindow;
use crate::segments::SegmentTrainer;
use crate::source::InstanceSource;
use crate::weights::{retrain_mappings, WeightUpdater};

// ─── Builder ────────────────────────────────────────────────────────────────

/// Collects the factories, the CC source, and the configuration of a run.
///
/// The mapping function defaults to [`LinearMapping::default`]; the learner,
/// the clusterer, and the CC source are required.
pub struct OatesBuilder {
    config: OatesConfig,
    learner: Option<LearnerFactory>,
    mapping: Option<MappingFactory>,
    clusterer: Option<ClustererFactory>,
    source: Option<Box<dyn InstanceSource>>,
}

impl Default for OatesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OatesBuilder {
    /// Builder with [`OatesConfig::default`].
    pub fn new() -> Self {
        Self { config: OatesConfig::default(), learner: None, mapping: None, clusterer: None, source: None }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: OatesConfig) -> Self {
        self.config = config;
        self
    }

    /// Set `beta_wc`.
    pub fn beta_wc(mut self, beta: f64) -> Self {
        self.config.beta_wc = beta;
        self
    }

    /// Set `beta_cc`.
    pub fn beta_cc(mut self, beta: f64) -> Self {
        self.config.beta_cc = beta;
        self
    }

    /// Set the WC sampling period.
    pub fn period(mut self, period: usize) -> Self {
        self.config.period = period;
        self
    }

    /// Set the replay window capacity.
    pub fn replay_window_size(mut self, size: usize) -> Self {
        self.config.replay_window_size = size;
        self
    }

    /// Factory for the learner of every slot.
    pub fn learner(mut self, factory: impl Fn() -> Box<dyn Learner> + 'static) -> Self {
        self.learner = Some(Box::new(factory));
        self
    }

    /// Factory for the mapping function of every CC slot.
    pub fn mapping(mut self, factory: impl Fn() -> Box<dyn MappingFunction> + 'static) -> Self {
        self.mapping = Some(Box::new(factory));
        self
    }

    /// Factory for the segment clusterer.
    pub fn clusterer(mut self, factory: impl Fn() -> Box<dyn SegmentClusterer> + 'static) -> Self {
        self.clusterer = Some(Box::new(factory));
        self
    }

    /// The CC stream.
    pub fn cc_source(mut self, source: impl InstanceSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Validate and return a controller that has already been reset.
    pub fn build(self) -> Result<Oates, OatesError> {
        self.config.validate()?;
        let learner = self.learner.ok_or_else(|| missing("learner"))?;
        let clusterer = self.clusterer.ok_or_else(|| missing("clusterer"))?;
        let source = self.source.ok_or_else(|| missing("cc_source"))?;
        let mapping: MappingFactory = match self.mapping {
            Some(factory) => factory,
            None => Box::new(|| Box::new(LinearMapping::default()) as Box<dyn MappingFunction>),
        };
        Ok(Oates::new(self.config, learner, mapping, clusterer, source))
    }
}

fn missing(name: &str) -> OatesError {
    OatesError::InvalidParameter { name: name.into(), reason: "no value supplied".into() }
}

// ─── Controller ─────────────────────────────────────────────────────────────

/// Online ensemble transferring CC knowledge into WC predictions.
pub struct Oates {
    config: OatesConfig,
    learner_factory: LearnerFactory,
    mapping_factory: MappingFactory,
    clusterer_factory: ClustererFactory,
    updater: WeightUpdater,
    pool: LearnerPool,
    segments: SegmentTrainer,
    merger: StreamMerger,
    replay: ReplayWindow,
    stripped: Option<Arc<Schema>>,
    cc_class_set: bool,
    halted: bool,
    step: u64,
    training_weight_seen: f64,
}

impl core::fmt::Debug for Oates {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Oates")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("step", &self.step)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

impl Oates {
    fn new(
        config: OatesConfig,
        learner_factory: LearnerFactory,
        mapping_factory: MappingFactory,
        clusterer_factory: ClustererFactory,
        source: Box<dyn InstanceSource>,
    ) -> Self {
        let mut pool = LearnerPool::new(learner_factory(), mapping_factory());
        let segments = SegmentTrainer::new(clusterer_factory(), &mut pool);
        let mut merger = StreamMerger::new(source);
        merger.restart();
        Self {
            updater: WeightUpdater::new(config.beta_cc, config.beta_wc),
            replay: ReplayWindow::new(config.replay_window_size),
            config,
            learner_factory,
            mapping_factory,
            clusterer_factory,
            pool,
            segments,
            merger,
            stripped: None,
            cc_class_set: false,
            halted: false,
            step: 0,
            training_weight_seen: 0.0,
        }
    }

    /// Start a new run: fresh WC slot, fresh clusterer (with slots for any
    /// segment it starts with), CC source rewound, every queue cleared.
    pub fn reset(&mut self) {
        self.pool = LearnerPool::new((self.learner_factory)(), (self.mapping_factory)());
        self.segments = SegmentTrainer::new((self.clusterer_factory)(), &mut self.pool);
        self.merger.restart();
        self.replay.clear();
        self.stripped = None;
        self.cc_class_set = false;
        self.halted = false;
        self.step = 0;
        self.training_weight_seen = 0.0;
    }

    /// Learn from one WC instance (trailing timestamp attribute included).
    pub fn train(&mut self, instance: &Instance) {
        if instance.weight() <= 0.0 {
            return;
        }
        let Some((timestamp, stripped)) = self.prepare(instance, "training") else {
            return;
        };
        self.training_weight_seen += instance.weight();

        if self.refresh_due() {
            self.refresh(timestamp);
        }

        let mode = self.config.mode();
        let sampled = self.step % self.config.period as u64 == 0;
        if !sampled {
            self.training_weight_seen -= instance.weight();
        } else {
            self.replay.push(stripped.clone());
            self.updater.recompute(&mut self.pool, &self.replay, mode);
            retrain_mappings(&mut self.pool, &self.replay, mode);
            self.pool.train_wc(&stripped);
            if self.step == 0 {
                let trained = self.pool.trained_count().max(1);
                self.pool.set_weight(self.pool.wc_position(), 1.0 / trained as f64);
                self.pool.normalise();
            }
        }
        self.step += 1;
    }

    /// Weighted prediction for one WC instance (timestamp included).
    ///
    /// Returns 0.0 when the instance cannot be processed.
    pub fn predict(&mut self, instance: &Instance) -> f64 {
        let Some((timestamp, stripped)) = self.prepare(instance, "prediction") else {
            return 0.0;
        };
        if self.refresh_due() {
            self.refresh(timestamp);
        }
        let mut votes = 0.0;
        for position in 0..self.pool.len() {
            if !self.pool.is_trained(position) {
                continue;
            }
            let weight = self.pool.weight(position).unwrap_or(0.0);
            match self.pool.calibrated_prediction(position, &stripped) {
                Ok(p) => votes += p * weight,
                Err(e) => debug!("predict: position {} contributes 0: {}", position, e),
            }
        }
        votes
    }

    /// Number of slots, WC slot included.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Weight of the slot at `position`.
    pub fn weight(&self, position: usize) -> Option<f64> {
        self.pool.weight(position)
    }

    /// Calibration factor of the CC slot at `position`.
    pub fn factor(&self, position: usize) -> Option<f64> {
        self.pool.factor(position)
    }

    /// The learner pool, read-only.
    pub fn pool(&self) -> &LearnerPool {
        &self.pool
    }

    /// WC instances processed since the last reset.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Weight of the WC instances actually used for training.
    pub fn training_weight_seen(&self) -> f64 {
        self.training_weight_seen
    }

    /// Whether a schema mismatch has stopped this run.
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// The configuration of this run.
    pub fn config(&self) -> &OatesConfig {
        &self.config
    }

    /// Named diagnostics in reporting order.
    pub fn measurements(&self) -> Vec<Measurement> {
        let mut out = alloc::vec![Measurement::new("ensemble size", self.pool.len() as f64)];
        for position in 0..self.pool.len() {
            if let Some(learner) = self.pool.learner(position) {
                out.extend(learner.measurements().into_iter().map(|m| {
                    Measurement::new(format!("learner {}'s {}", position, m.name), m.value)
                }));
            }
        }
        for (position, weight) in self.pool.weights().enumerate() {
            out.push(Measurement::new(format!("weight {}", position), weight));
        }
        for position in 0..self.pool.cc_len() {
            if let Some(b) = self.pool.factor(position) {
                out.push(Measurement::new(format!("factor b {}", position), b));
            }
        }
        out
    }

    /// Per-slot state, in pool order.
    pub fn snapshot(&self) -> EnsembleSnapshot {
        let slots = (0..self.pool.len())
            .map(|position| SlotRecord {
                position,
                segment: self.pool.segment(position),
                weight: self.pool.weight(position).unwrap_or(0.0),
                factor: self.pool.factor(position),
                trained: self.pool.is_trained(position),
            })
            .collect();
        EnsembleSnapshot {
            step: self.step,
            pool_size: self.pool.len(),
            replay_len: self.replay.len(),
            backlog_len: self.merger.backlog_len(),
            pending_len: self.segments.pending_len(),
            slots,
        }
    }

    fn refresh_due(&self) -> bool {
        match self.config.mode() {
            WindowMode::Sliding => true,
            WindowMode::Legacy => self.step == 0,
        }
    }

    /// CC catch-up, then mapping retrain and weight recompute over the window.
    fn refresh(&mut self, until: Timestamp) {
        let mode = self.config.mode();
        let bootstrap = if self.step == 0 { Bootstrap::BeforeFirstStep } else { Bootstrap::AfterFirstStep };
        if let Some(schema) = self.stripped.clone() {
            let pool = &mut self.pool;
            let segments = &mut self.segments;
            let caught_up = self.merger.catch_up(until, |cc| match strip_cc(&cc, &schema) {
                Ok(cc) => segments.train(pool, cc, bootstrap),
                Err(e) => warn!("CC instance skipped: {}", e),
            });
            if caught_up > 0 {
                debug!("catch-up: {} CC instances before {} ms", caught_up, until.millis());
            }
        }
        retrain_mappings(&mut self.pool, &self.replay, mode);
        self.updater.recompute(&mut self.pool, &self.replay, mode);
    }

    /// Validate `instance` and return its timestamp and stripped copy.
    fn prepare(&mut self, instance: &Instance, task: &str) -> Option<(Timestamp, Instance)> {
        if self.halted {
            return None;
        }
        match self.check(instance) {
            Ok(prepared) => Some(prepared),
            Err(e @ OatesError::SchemaMismatch { .. }) => {
                error!("halting {}: {}", task, e);
                self.halted = true;
                None
            }
            Err(e) => {
                warn!("skipping {}: {}", task, e);
                None
            }
        }
    }

    fn check(&mut self, instance: &Instance) -> Result<(Timestamp, Instance), OatesError> {
        if !instance.is_regression() {
            return Err(OatesError::NotRegression {
                attribute: instance.schema().class_attribute().name.clone(),
            });
        }
        if !self.cc_class_set {
            let cc = self.merger.source().header().num_attributes();
            if instance.num_attributes() != cc {
                return Err(OatesError::SchemaMismatch { wc: instance.num_attributes(), cc });
            }
            self.merger.source_mut().set_class_index(instance.schema().class_index())?;
            self.cc_class_set = true;
        }
        let schema = match &self.stripped {
            Some(schema) => Arc::clone(schema),
            None => {
                let schema = Arc::new(instance.schema().without_last()?);
                self.stripped = Some(Arc::clone(&schema));
                schema
            }
        };
        Ok((instance.timestamp()?, instance.without_timestamp(&schema)?))
    }
}

fn strip_cc(instance: &Instance, schema: &Arc<Schema>) -> Result<Instance, OatesError> {
    if !instance.is_regression() {
        return Err(OatesError::NotRegression {
            attribute: instance.schema().class_attribute().name.clone(),
        });
    }
    instance.without_timestamp(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ProductivitySplitClusterer, ProductivitySplitConfig};
    use crate::learner::KnnRegressor;
    use crate::mapping::LinearMappingConfig;
    use crate::source::VecSource;
    use alloc::vec;

    /// Rows `[x, size, effort, timestamp]` with effort as the target.
    /// Productivity bands (0, 1], (1, 2], (2, MAX].
    fn oates(cc_rows: Vec<Vec<f64>>) -> Oates {
        let header = Schema::numeric("cc", 4, 0).unwrap();
        OatesBuilder::new()
            .beta_wc(0.6)
            .beta_cc(0.5)
            .period(1)
            .replay_window_size(3)
            .learner(|| Box::new(KnnRegressor::new(1, 100)))
            .mapping(|| Box::new(LinearMapping::new(LinearMappingConfig { learning_rate: 0.1 }).unwrap()))
            .clusterer(|| {
                Box::new(
                    ProductivitySplitClusterer::new(&ProductivitySplitConfig {
                        thresholds: "1.0;2.0".into(),
                        effort_index: 2,
                        size_index: 1,
                    })
                    .unwrap(),
                )
            })
            .cc_source(VecSource::new(header, cc_rows).unwrap())
            .build()
            .unwrap()
    }

    fn wc(values: [f64; 4]) -> Instance {
        let schema = Arc::new(Schema::numeric("wc", 4, 2).unwrap());
        Instance::new(schema, values.to_vec()).unwrap()
    }

    fn stripped(values: [f64; 3]) -> Instance {
        let schema = Arc::new(Schema::numeric("wc", 3, 2).unwrap());
        Instance::new(schema, values.to_vec()).unwrap()
    }

    #[test]
    fn test_reset_creates_band_slots() {
        let o = oates(Vec::new());
        assert_eq!(o.pool_size(), 4);
        assert_eq!(o.pool().cc_len(), 3);
        assert!(!o.cc_class_set);
        for position in 0..4 {
            assert_eq!(o.weight(position), Some(1.0));
        }
        for position in 0..3 {
            assert_eq!(o.pool().mapping(position).unwrap().bound(), o.pool().slot_at(position));
        }
    }

    #[test]
    fn test_prediction_blends_trained_slots() {
        let mut o = oates(Vec::new());
        let cc_slot = o.pool.slot_at(1).unwrap();
        o.pool.train_slot(cc_slot, &stripped([1.0, 2.0, 3.0]), Bootstrap::BeforeFirstStep);
        o.pool.set_weight(1, 1.0);
        o.pool.train_wc(&stripped([10.0, 20.0, 30.0]));
        o.stripped = Some(Arc::new(Schema::numeric("wc", 3, 2).unwrap()));
        o.replay.push(stripped([1.0, 2.0, 3.0]));

        let p = o.predict(&wc([1.0, 2.0, 3.0, 4.0]));
        let expected = 3.0 * 1.0 / 1.6 + 30.0 * 0.6 / 1.6;
        assert!((p - expected).abs() < 1e-6);
    }

    #[test]
    fn test_schema_mismatch_halts_until_reset() {
        let header = Schema::numeric("cc", 5, 0).unwrap();
        let mut o = OatesBuilder::new()
            .learner(|| Box::new(KnnRegressor::default()))
            .clusterer(|| Box::new(ProductivitySplitClusterer::new(&ProductivitySplitConfig::default()).unwrap()))
            .cc_source(VecSource::empty(header))
            .build()
            .unwrap();
        o.train(&wc([1.0, 2.0, 3.0, 4.0]));
        assert!(o.halted());
        assert_eq!(o.step(), 0);
        assert_eq!(o.predict(&wc([1.0, 2.0, 3.0, 4.0])), 0.0);
        o.reset();
        assert!(!o.halted());
    }

    #[test]
    fn test_missing_factories_rejected() {
        let err = OatesBuilder::new().build().unwrap_err();
        assert!(matches!(err, OatesError::InvalidParameter { ref name, .. } if name == "learner"));
        let err = OatesBuilder::new().period(0).build().unwrap_err();
        assert!(matches!(err, OatesError::InvalidParameter { ref name, .. } if name == "period"));
    }

    #[test]
    fn test_unsampled_steps_do_not_count_weight() {
        let header = Schema::numeric("cc", 4, 0).unwrap();
        let mut o = OatesBuilder::new()
            .period(2)
            .learner(|| Box::new(KnnRegressor::default()))
            .clusterer(|| Box::new(ProductivitySplitClusterer::new(&ProductivitySplitConfig::default()).unwrap()))
            .cc_source(VecSource::empty(header))
            .build()
            .unwrap();
        for t in 0..5 {
            o.train(&wc([1.0, 1.0, 1.0, t as f64]));
        }
        assert_eq!(o.step(), 5);
        assert_eq!(o.training_weight_seen(), 3.0);
        assert_eq!(o.snapshot().replay_len, 3);
    }

    #[test]
    fn test_builder_settings_reach_config() {
        let o = OatesBuilder::new()
            .beta_wc(0.25)
            .beta_cc(0.75)
            .period(4)
            .replay_window_size(1)
            .learner(|| Box::new(KnnRegressor::default()))
            .clusterer(|| Box::new(ProductivitySplitClusterer::new(&ProductivitySplitConfig::default()).unwrap()))
            .cc_source(VecSource::empty(Schema::numeric("cc", 4, 0).unwrap()))
            .build()
            .unwrap();
        let expected = OatesConfig { beta_wc: 0.25, beta_cc: 0.75, period: 4, replay_window_size: 1 };
        assert_eq!(o.config(), &expected);
        assert_eq!(o.config().mode(), WindowMode::Legacy);
    }
}
