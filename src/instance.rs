/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Attribute schemas and labelled instances shared by both streams.
//!
//! A [`Schema`] is immutable once built. The WC and CC streams carry one extra
//! trailing timestamp attribute; [`Schema::without_last`] derives the schema
//! that every learner actually sees, and [`Instance::without_timestamp`]
//! applies the same transform to values.
//!
//! # Invariants
//!
//! - `values.len() == schema.num_attributes()` for every [`Instance`].
//! - `class_index < num_attributes()` for every [`Schema`].

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::OatesError;

// ─── Attributes ─────────────────────────────────────────────────────────────

/// Kind of a single attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeKind {
    /// Real-valued attribute. The only kind accepted as a regression target.
    Numeric,
    /// Enumerated attribute; the value is the index into `values`.
    Nominal {
        /// Declared labels, in index order.
        values: Vec<String>,
    },
}

/// A named attribute of a [`Schema`].
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    /// Attribute name as declared by the stream header.
    pub name: String,
    /// Numeric or nominal.
    pub kind: AttributeKind,
}

impl Attribute {
    /// Numeric attribute with the given name.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: AttributeKind::Numeric }
    }

    /// Nominal attribute with the given labels.
    pub fn nominal(name: impl Into<String>, values: Vec<String>) -> Self {
        Self { name: name.into(), kind: AttributeKind::Nominal { values } }
    }

    /// `true` for [`AttributeKind::Numeric`].
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, AttributeKind::Numeric)
    }
}

// ─── Schema ─────────────────────────────────────────────────────────────────

/// Ordered attribute layout of a stream plus the index of its target attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    relation: String,
    attributes: Vec<Attribute>,
    class_index: usize,
}

impl Schema {
    /// Build a schema. Fails if `class_index` is out of range.
    pub fn new(
        relation: impl Into<String>,
        attributes: Vec<Attribute>,
        class_index: usize,
    ) -> Result<Self, OatesError> {
        if class_index >= attributes.len() {
            return Err(OatesError::InvalidParameter {
                name: "class_index".into(),
                reason: alloc::format!(
                    "{} is out of range for {} attributes",
                    class_index,
                    attributes.len()
                ),
            });
        }
        Ok(Self { relation: relation.into(), attributes, class_index })
    }

    /// All-numeric schema with attributes named `a0, a1, ...`.
    pub fn numeric(relation: impl Into<String>, num_attributes: usize, class_index: usize) -> Result<Self, OatesError> {
        let attributes = (0..num_attributes)
            .map(|i| Attribute::numeric(alloc::format!("a{}", i)))
            .collect();
        Self::new(relation, attributes, class_index)
    }

    /// Relation name.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Number of attributes, target and timestamp included.
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    /// Attribute at `index`.
    pub fn attribute(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    /// Index of the target attribute.
    pub fn class_index(&self) -> usize {
        self.class_index
    }

    /// The target attribute.
    pub fn class_attribute(&self) -> &Attribute {
        &self.attributes[self.class_index]
    }

    /// Copy of this schema with a different target attribute.
    pub fn with_class_index(&self, class_index: usize) -> Result<Self, OatesError> {
        Self::new(self.relation.clone(), self.attributes.clone(), class_index)
    }

    /// Copy of this schema with the trailing attribute removed.
    ///
    /// Used to derive the timestamp-free schema learners are trained on. The
    /// class index is kept, so the trailing attribute must not be the target.
    pub fn without_last(&self) -> Result<Self, OatesError> {
        let mut attributes = self.attributes.clone();
        attributes.pop();
        Self::new(self.relation.clone(), attributes, self.class_index)
    }
}

// ─── Instance ───────────────────────────────────────────────────────────────

/// One labelled example: attribute values under a shared [`Schema`].
#[derive(Clone, Debug)]
pub struct Instance {
    schema: Arc<Schema>,
    values: Vec<f64>,
    weight: f64,
}

impl Instance {
    /// Build an instance with weight 1.0. Fails on a length mismatch.
    pub fn new(schema: Arc<Schema>, values: Vec<f64>) -> Result<Self, OatesError> {
        if values.len() != schema.num_attributes() {
            return Err(OatesError::LengthMismatch {
                expected: schema.num_attributes(),
                actual: values.len(),
            });
        }
        Ok(Self { schema, values, weight: 1.0 })
    }

    /// Same instance with a different training weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Schema this instance follows.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// All attribute values in schema order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of attribute `index`.
    ///
    /// # Panics
    ///
    /// If `index` is out of range; use [`Instance::values`] with `get` when
    /// the index comes from configuration.
    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Training weight. Instances with weight ≤ 0 are never learnt from.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Number of attributes.
    pub fn num_attributes(&self) -> usize {
        self.values.len()
    }

    /// Target value.
    pub fn class_value(&self) -> f64 {
        self.values[self.schema.class_index()]
    }

    /// `true` when the target attribute is numeric.
    pub fn is_regression(&self) -> bool {
        self.schema.class_attribute().is_numeric()
    }

    /// Input values, i.e. every attribute except the target.
    pub fn features(&self) -> impl Iterator<Item = f64> + '_ {
        let class_index = self.schema.class_index();
        self.values
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != class_index)
            .map(|(_, v)| *v)
    }

    /// Timestamp carried in the trailing attribute, truncated to whole seconds.
    pub fn timestamp(&self) -> Result<Timestamp, OatesError> {
        self.values
            .last()
            .map(|&v| Timestamp::from_seconds(v))
            .ok_or(OatesError::MissingTimestamp)
    }

    /// Copy of this instance with the trailing timestamp value dropped,
    /// re-homed onto `schema` (normally `self.schema().without_last()`).
    pub fn without_timestamp(&self, schema: &Arc<Schema>) -> Result<Self, OatesError> {
        let mut values = self.values.clone();
        values.pop();
        Ok(Self::new(Arc::clone(schema), values)?.with_weight(self.weight))
    }

    /// Copy of this instance with every value passed through `f`.
    pub fn map_values(&self, mut f: impl FnMut(usize, f64) -> f64) -> Self {
        let values = self.values.iter().enumerate().map(|(i, &v)| f(i, v)).collect();
        Self { schema: Arc::clone(&self.schema), values, weight: self.weight }
    }
}

// ─── Timestamp ──────────────────────────────────────────────────────────────

/// Point in time, in epoch milliseconds, derived from a seconds attribute.
///
/// Fractional seconds are truncated before conversion, so `10.2` and `10.9`
/// name the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Convert a seconds value as stored in an attribute.
    pub fn from_seconds(seconds: f64) -> Self {
        Self((seconds as i64).saturating_mul(1000))
    }

    /// Epoch milliseconds.
    pub fn millis(self) -> i64 {
        self.0
    }

    /// Strictly earlier than `other`.
    pub fn is_before(self, other: Self) -> bool {
        self.0 < other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn wc_schema() -> Arc<Schema> {
        Arc::new(Schema::numeric("wc", 4, 2).unwrap())
    }

    #[test]
    fn test_schema_rejects_class_index_out_of_range() {
        assert!(Schema::numeric("x", 3, 3).is_err());
    }

    #[test]
    fn test_without_last_keeps_class_index() {
        let s = wc_schema().without_last().unwrap();
        assert_eq!(s.num_attributes(), 3);
        assert_eq!(s.class_index(), 2);
        assert_eq!(s.relation(), "wc");
    }

    #[test]
    fn test_instance_length_mismatch() {
        let err = Instance::new(wc_schema(), vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, OatesError::LengthMismatch { expected: 4, actual: 2 }));
    }

    #[test]
    fn test_features_skip_class() {
        let inst = Instance::new(wc_schema(), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let f: Vec<f64> = inst.features().collect();
        assert_eq!(f, vec![1.0, 2.0, 4.0]);
        assert_eq!(inst.class_value(), 3.0);
    }

    #[test]
    fn test_without_timestamp_drops_trailing_value() {
        let schema = wc_schema();
        let stripped = Arc::new(schema.without_last().unwrap());
        let inst = Instance::new(schema, vec![1.0, 2.0, 3.0, 4.0]).unwrap().with_weight(2.0);
        let out = inst.without_timestamp(&stripped).unwrap();
        assert_eq!(out.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(out.weight(), 2.0);
        assert_eq!(out.class_value(), 3.0);
    }

    #[test]
    fn test_timestamp_truncates_fractional_seconds() {
        assert_eq!(Timestamp::from_seconds(10.2), Timestamp::from_seconds(10.9));
        assert!(Timestamp::from_seconds(9.9).is_before(Timestamp::from_seconds(10.0)));
        assert!(!Timestamp::from_seconds(10.0).is_before(Timestamp::from_seconds(10.0)));
        assert_eq!(Timestamp::from_seconds(3.0).millis(), 3000);
    }

    #[test]
    fn test_nominal_target_is_not_regression() {
        let schema = Arc::new(
            Schema::new(
                "c",
                vec![
                    Attribute::numeric("x"),
                    Attribute::nominal("y", vec!["a".into(), "b".into()]),
                ],
                1,
            )
            .unwrap(),
        );
        let inst = Instance::new(schema, vec![0.5, 1.0]).unwrap();
        assert!(!inst.is_regression());
    }
}
