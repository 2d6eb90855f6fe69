//! Datasets whose values are computed rather than stored.

use qdataset_traits::names;
use qdataset_traits::{config, MutablePropertyDataSet, PropertyValue, QDataSet, Units};

use crate::store::PropertyStore;

fn check_rank1(len: usize, idx: &[usize]) -> usize {
    assert_eq!(idx.len(), 1, "rank 1 dataset accessed with {} indices", idx.len());
    if config::range_checking() {
        assert!(
            idx[0] < len,
            "index {} out of bounds for dimension 0 of length {}",
            idx[0],
            len
        );
    }
    idx[0]
}

/// `value(i) = i` for `i` in `0..len`.
#[derive(Debug, Clone)]
pub struct IndexGenDataSet {
    len: usize,
    props: PropertyStore,
}

impl IndexGenDataSet {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            props: PropertyStore::new(),
        }
    }
}

impl QDataSet for IndexGenDataSet {
    fn rank(&self) -> usize {
        1
    }

    fn length(&self, _outer: &[usize]) -> usize {
        self.len
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        check_rank1(self.len, idx) as f64
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.props.get(name).cloned()
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        self.props.get_at(name, i).cloned().or_else(|| self.property(name))
    }

    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        Some(self)
    }
}

impl_mutable_properties!(IndexGenDataSet);

/// Uniform tags `start + i * cadence`, typically a time axis.
///
/// Carries `UNITS`, a rank-0 `CADENCE` and `MONOTONIC` (when the cadence is
/// not negative).
#[derive(Debug, Clone)]
pub struct TagGenDataSet {
    len: usize,
    start: f64,
    cadence: f64,
    props: PropertyStore,
}

impl TagGenDataSet {
    pub fn new(len: usize, cadence: f64, start: f64, units: Units) -> Self {
        let mut props = PropertyStore::new();
        let mut step = Rank0DataSet::new(cadence);
        step.props.put(names::UNITS, units.clone().into()).ok();
        props.put(names::UNITS, units.into()).ok();
        props.put(names::CADENCE, step.into_ref().into()).ok();
        if cadence >= 0.0 {
            props.put(names::MONOTONIC, true.into()).ok();
        }
        Self {
            len,
            start,
            cadence,
            props,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn cadence(&self) -> f64 {
        self.cadence
    }
}

impl QDataSet for TagGenDataSet {
    fn rank(&self) -> usize {
        1
    }

    fn length(&self, _outer: &[usize]) -> usize {
        self.len
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        self.start + check_rank1(self.len, idx) as f64 * self.cadence
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.props.get(name).cloned()
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        self.props.get_at(name, i).cloned().or_else(|| self.property(name))
    }

    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        Some(self)
    }
}

impl_mutable_properties!(TagGenDataSet);

/// A scalar with properties. Contexts and cadences are rank-0 datasets.
#[derive(Debug, Clone)]
pub struct Rank0DataSet {
    value: f64,
    props: PropertyStore,
}

impl Rank0DataSet {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            props: PropertyStore::new(),
        }
    }

    /// Scalar `value` in `units`.
    pub fn with_units(value: f64, units: Units) -> Self {
        let mut ds = Self::new(value);
        ds.props.put(names::UNITS, units.into()).ok();
        ds
    }

    /// The value at `idx` of `src` as a scalar carrying every dimension
    /// property of `src`.
    pub fn sample(src: &dyn QDataSet, idx: &[usize]) -> Self {
        let mut ds = Self::new(src.value(idx));
        for name in names::DIMENSION_PROPERTIES {
            if let Some(v) = src.property(name) {
                ds.props.put(name, v).ok();
            }
        }
        ds
    }

    pub fn get(&self) -> f64 {
        self.value
    }

    pub fn into_ref(self) -> qdataset_traits::DataSetRef {
        std::sync::Arc::new(self)
    }
}

impl QDataSet for Rank0DataSet {
    fn rank(&self) -> usize {
        0
    }

    fn length(&self, _outer: &[usize]) -> usize {
        panic!("length requested from rank 0 dataset")
    }

    fn value(&self, idx: &[usize]) -> f64 {
        assert!(idx.is_empty(), "rank 0 dataset accessed with {} indices", idx.len());
        self.value
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.props.get(name).cloned()
    }

    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        Some(self)
    }
}

impl_mutable_properties!(Rank0DataSet);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_index_gen() {
        let d = IndexGenDataSet::new(5);
        assert_eq!(d.rank(), 1);
        assert_eq!(d.len(), 5);
        assert_relative_eq!(d.value(&[3]), 3.0);
        assert!(d.try_value(&[5]).is_err());
    }

    #[test]
    fn test_tag_gen_properties() {
        let t = TagGenDataSet::new(10, 0.5, 100.0, Units::new("s"));
        assert_relative_eq!(t.value(&[4]), 102.0);
        assert_eq!(t.property(names::MONOTONIC), Some(true.into()));
        let cadence = t
            .property(names::CADENCE)
            .and_then(|v| v.into_dataset())
            .unwrap();
        assert_eq!(cadence.rank(), 0);
        assert_relative_eq!(cadence.value(&[]), 0.5);
        assert_eq!(cadence.property(names::UNITS), Some(Units::new("s").into()));
    }

    #[test]
    fn test_rank0_sample_keeps_dimension_properties() {
        let t = TagGenDataSet::new(3, 1.0, 0.0, Units::new("s"));
        let s = Rank0DataSet::sample(&t, &[2]);
        assert_relative_eq!(s.get(), 2.0);
        assert_eq!(s.property(names::UNITS), Some(Units::new("s").into()));
        assert_eq!(s.property(names::CADENCE), None);
    }

    #[test]
    fn test_sealed_generated_dataset() {
        let mut d = IndexGenDataSet::new(2);
        d.put_property(names::LABEL, "i".into()).unwrap();
        d.make_immutable();
        assert!(d.put_property(names::LABEL, "j".into()).is_err());
    }
}
