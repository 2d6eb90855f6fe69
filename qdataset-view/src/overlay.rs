use qdataset_traits::{DataSetRef, MutablePropertyDataSet, PropertyValue, QDataSet, Result};

use crate::store::{Lookup, PropertyStore};

/// A dataset with a writable property layer on top of a shared source.
///
/// Values and lengths come from the source. Every name not set or masked
/// on the overlay falls through to the source.
#[derive(Debug, Clone)]
pub struct PropertyOverlay {
    src: DataSetRef,
    props: PropertyStore,
}

impl PropertyOverlay {
    pub fn new(src: DataSetRef) -> Self {
        Self {
            src,
            props: PropertyStore::new(),
        }
    }

    pub fn with_store(src: DataSetRef, props: PropertyStore) -> Self {
        Self { src, props }
    }

    pub fn source(&self) -> &DataSetRef {
        &self.src
    }

    /// Hide the source's value of `name`.
    pub fn mask(&mut self, name: &str) -> Result<()> {
        self.props.mask(name)
    }
}

impl QDataSet for PropertyOverlay {
    fn rank(&self) -> usize {
        self.src.rank()
    }

    fn length(&self, outer: &[usize]) -> usize {
        self.src.length(outer)
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        self.src.value(idx)
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.props.resolve(name, || self.src.property(name))
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        if let Some(v) = self.props.get_at(name, i) {
            return Some(v.clone());
        }
        match self.props.lookup(name) {
            Lookup::Absent => self.src.property_at(name, i),
            Lookup::Masked => None,
            Lookup::Present(v) => Some(v.clone()),
        }
    }

    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        Some(self)
    }
}

impl_mutable_properties!(PropertyOverlay);
