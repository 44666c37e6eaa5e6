/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Error type shared by every module.
//!
//! Nothing in this enum crosses the [`crate::Oates`] boundary: the controller
//! logs and degrades instead. Components below it propagate with `?`.

use alloc::string::String;

use thiserror::Error;

/// Errors raised while wiring or running the ensemble.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OatesError {
    /// CC and WC streams disagree on the attribute count. Fatal for the run.
    #[error("CC stream has {cc} attributes but the WC stream has {wc}")]
    SchemaMismatch {
        /// Attribute count of the WC instance.
        wc: usize,
        /// Attribute count of the CC stream header.
        cc: usize,
    },

    /// The target attribute is nominal; only regression is supported.
    #[error("target attribute '{attribute}' is nominal: only regression is supported")]
    NotRegression {
        /// Name of the offending target attribute.
        attribute: String,
    },

    /// A mapping function was used before a learner was bound to it.
    #[error("mapping function used before a learner was bound")]
    MappingNotBound,

    /// A value vector does not fit its schema.
    #[error("expected {expected} values, got {actual}")]
    LengthMismatch {
        /// Attribute count of the schema.
        expected: usize,
        /// Length of the supplied values.
        actual: usize,
    },

    /// A configuration value is out of range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An instance has no attribute to read a timestamp from.
    #[error("instance has no timestamp attribute")]
    MissingTimestamp,
}
