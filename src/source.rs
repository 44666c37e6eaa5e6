/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Sequential, re-readable instance sources for the CC stream.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::OatesError;
use crate::instance::{Instance, Schema};

/// A stream of instances that can be rewound to its start.
///
/// Instances returned by [`InstanceSource::next`] follow the current
/// [`InstanceSource::header`], including any class index set afterwards.
pub trait InstanceSource: core::fmt::Debug {
    /// Whether another instance is available.
    fn has_next(&self) -> bool;

    /// Next instance, or `None` once exhausted.
    fn next(&mut self) -> Option<Instance>;

    /// Rewind to the first instance.
    fn restart(&mut self);

    /// Schema of the instances in this stream.
    fn header(&self) -> &Arc<Schema>;

    /// Change the target attribute of subsequent instances.
    fn set_class_index(&mut self, class_index: usize) -> Result<(), OatesError>;
}

/// In-memory source over pre-loaded value rows.
#[derive(Clone, Debug)]
pub struct VecSource {
    header: Arc<Schema>,
    rows: Vec<Vec<f64>>,
    cursor: usize,
}

impl VecSource {
    /// Source over `rows`. Every row must match the header width.
    pub fn new(header: Schema, rows: Vec<Vec<f64>>) -> Result<Self, OatesError> {
        if let Some(row) = rows.iter().find(|r| r.len() != header.num_attributes()) {
            return Err(OatesError::LengthMismatch {
                expected: header.num_attributes(),
                actual: row.len(),
            });
        }
        Ok(Self { header: Arc::new(header), rows, cursor: 0 })
    }

    /// Source with no instances.
    pub fn empty(header: Schema) -> Self {
        Self { header: Arc::new(header), rows: Vec::new(), cursor: 0 }
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when the source holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl InstanceSource for VecSource {
    fn has_next(&self) -> bool {
        self.cursor < self.rows.len()
    }

    fn next(&mut self) -> Option<Instance> {
        let row = self.rows.get(self.cursor)?;
        self.cursor += 1;
        Instance::new(Arc::clone(&self.header), row.clone()).ok()
    }

    fn restart(&mut self) {
        self.cursor = 0;
    }

    fn header(&self) -> &Arc<Schema> {
        &self.header
    }

    fn set_class_index(&mut self, class_index: usize) -> Result<(), OatesError> {
        if class_index != self.header.class_index() {
            self.header = Arc::new(self.header.with_class_index(class_index)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn source() -> VecSource {
        let header = Schema::numeric("cc", 3, 0).unwrap();
        VecSource::new(header, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_reads_in_order_then_exhausts() {
        let mut s = source();
        assert_eq!(s.next().unwrap().values(), &[1.0, 2.0, 3.0]);
        assert!(s.has_next());
        assert_eq!(s.next().unwrap().values(), &[4.0, 5.0, 6.0]);
        assert!(!s.has_next());
        assert!(s.next().is_none());
    }

    #[test]
    fn test_restart_rewinds() {
        let mut s = source();
        s.next();
        s.next();
        s.restart();
        assert_eq!(s.next().unwrap().value(0), 1.0);
    }

    #[test]
    fn test_class_index_applies_to_later_instances() {
        let mut s = source();
        s.set_class_index(1).unwrap();
        assert_eq!(s.next().unwrap().class_value(), 2.0);
        assert!(s.set_class_index(7).is_err());
    }

    #[test]
    fn test_row_width_checked() {
        let header = Schema::numeric("cc", 2, 0).unwrap();
        let err = VecSource::new(header, vec![vec![1.0]]).unwrap_err();
        assert_eq!(err, OatesError::LengthMismatch { expected: 2, actual: 1 });
    }
}
