/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! # oates
//!
//! Online ensemble regression that borrows from an abundant cross-context
//! (CC) stream to predict a scarce within-context (WC) stream.
//!
//! ---
//!
//! Both streams carry a trailing timestamp attribute. Before a WC instance is
//! learnt from or predicted for, every CC instance strictly earlier than it
//! is routed through a segment clusterer into one learner per segment. Each
//! CC learner is wrapped in a mapping function that rescales its output into
//! WC units, and every slot carries an adaptive weight recomputed over a
//! bounded replay window of recent WC instances.
//!
//! ## The pipeline
//!
//! ```text
//! CC source → StreamMerger → SegmentClusterer → LearnerPool ─┐
//!                  ↑                              (CC slots)  │
//!            WC timestamp                                     ├→ Σ wᵢ · pᵢ
//!                  │                                          │
//! WC instance ─────┴→ ReplayWindow → MappingFunction ─────────┤
//!                                  → WeightUpdater            │
//!                  └→ WC learner ─────────────────────────────┘
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`instance`] | [`Schema`], [`Instance`], [`Timestamp`] | Immutable schemas, labelled instances, timestamp stripping |
//! | [`learner`] | [`Learner`], [`learner::KnnRegressor`] | Regression learner capability and bundled learners |
//! | [`mapping`] | [`MappingFunction`], [`LinearMapping`] | Calibration of CC predictions into WC units |
//! | [`cluster`] | [`SegmentClusterer`], [`cluster::ProductivitySplitClusterer`] | Segmentation of the CC instance space |
//! | [`pool`] | [`LearnerPool`], [`SlotId`] | Calibrated CC slots plus the WC slot |
//! | [`merger`] | [`merger::StreamMerger`] | Chronological CC catch-up with backlog |
//! | [`weights`] | [`weights::WeightUpdater`] | Window-local multiplicative weights |
//! | [`oates`] | [`Oates`], [`OatesBuilder`] | The per-instance controller |
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut oates = OatesBuilder::new()
//!     .period(1)
//!     .replay_window_size(500)
//!     .learner(|| Box::new(KnnRegressor::new(1, 1000)))
//!     .clusterer(|| Box::new(ProductivitySplitClusterer::new(&Default::default()).unwrap()))
//!     .cc_source(cc)
//!     .build()?;
//! let y = oates.predict(&wc_instance);
//! oates.train(&wc_instance);
//! ```
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` by default and needs `alloc`. Enable the `std`
//! feature to forward `std` to `log` and `thiserror`, and the `serde`
//! feature to serialise configurations and [`EnsembleSnapshot`].
//!
//! ## License
//!
//! Business Source License 1.1.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod cluster;
pub mod config;
pub mod error;
pub mod instance;
pub mod learner;
pub mod mapping;
pub mod measurement;
pub mod merger;
pub mod oates;
pub mod pool;
pub mod replay;
pub mod segments;
pub mod source;
pub mod weights;

pub use cluster::{Segment, SegmentClusterer};
pub use config::{OatesConfig, WindowMode};
pub use error::OatesError;
pub use instance::{Attribute, AttributeKind, Instance, Schema, Timestamp};
pub use learner::Learner;
pub use mapping::{LinearMapping, LinearMappingConfig, MappingFunction};
pub use measurement::{EnsembleSnapshot, Measurement, SlotRecord};
pub use oates::{Oates, OatesBuilder};
pub use pool::{LearnerPool, SlotId};
pub use source::{InstanceSource, VecSource};
