use std::sync::Arc;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, PropertyValue, QDataSet, Result};

use crate::propagate::{self, Inherit, Rank0};
use crate::store::PropertyStore;
use crate::util;

/// Rank-1 dataset read back to front.
///
/// `DEPEND_0` and correlatives are reversed along with the values.
/// `CADENCE` still holds; `MONOTONIC` and `CACHE_TAG` do not.
#[derive(Debug)]
pub struct ReverseDataSet {
    src: DataSetRef,
    props: PropertyStore,
}

const REVERSE: Inherit = Inherit {
    rank_preserving: true,
    dim0: &[names::CADENCE],
};

impl ReverseDataSet {
    pub fn new(src: DataSetRef) -> Result<Self> {
        if src.rank() != 1 {
            return Err(DataSetError::rank(1, src.rank(), src.describe()));
        }
        tracing::trace!(src = %src.describe(), "reverse");
        let mut props = PropertyStore::new();
        for name in [names::DEPEND_0, names::BUNDLE_0] {
            if let Some(d) = util::dataset_property(src.as_ref(), name) {
                match reverse_ref(&d) {
                    Ok(r) => props.put(name, r.into())?,
                    Err(err) => tracing::debug!(property = name, %err, "dropping axis"),
                }
            }
        }
        props.put_opt(names::BINS_0, src.property(names::BINS_0))?;
        propagate::put_join(&mut props, src.as_ref())?;
        propagate::transform_correlatives(src.as_ref(), &mut props, Rank0::Keep, reverse_ref)?;
        Ok(Self { src, props })
    }
}

/// Reverse any leading dimension: rank 1 directly, deeper ranks through a
/// descending sort.
fn reverse_ref(ds: &DataSetRef) -> Result<DataSetRef> {
    if ds.rank() == 1 {
        return Ok(Arc::new(ReverseDataSet::new(ds.clone())?));
    }
    let n = ds.len();
    let perm: Arc<[usize]> = (0..n).rev().collect();
    Ok(Arc::new(crate::sort::SortDataSet::with_indices(ds.clone(), perm)?))
}

impl QDataSet for ReverseDataSet {
    fn rank(&self) -> usize {
        1
    }

    fn length(&self, _outer: &[usize]) -> usize {
        self.src.len()
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        assert_eq!(idx.len(), 1, "rank 1 dataset accessed with {} indices", idx.len());
        let n = self.src.len();
        if qdataset_traits::config::range_checking() {
            assert!(
                idx[0] < n,
                "index {} out of bounds for dimension 0 of length {}",
                idx[0],
                n
            );
        }
        self.src.value(&[n - 1 - idx[0]])
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        propagate::resolve(&self.props, self.src.as_ref(), name, REVERSE)
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        let n = self.src.len();
        if i >= n {
            return None;
        }
        propagate::resolve_at(&self.props, self.src.as_ref(), name, n - 1 - i, REVERSE)
    }
}
