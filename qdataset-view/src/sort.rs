//! Sort views: the leading dimension read through a permutation.

use std::sync::Arc;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, PropertyValue, QDataSet, Result};

use crate::propagate::{self, Inherit, Rank0};
use crate::store::PropertyStore;
use crate::util::{self, Shape};

/// `value(i, ...) = src.value(perm[i], ...)`.
///
/// The permutation may repeat or omit source indices, so the result is a
/// reordering or a subset of the leading dimension. `CADENCE`, `MONOTONIC`
/// and `CACHE_TAG` are not inherited.
#[derive(Debug)]
pub struct SortDataSet {
    src: DataSetRef,
    perm: Arc<[usize]>,
    props: PropertyStore,
}

/// Read a rank-1 index dataset, checking every entry against `len`.
///
/// The offending minimum and maximum are logged before the error is
/// returned.
pub fn read_indices(
    indices: &dyn QDataSet,
    len: usize,
    context: &dyn QDataSet,
) -> Result<Arc<[usize]>> {
    if indices.rank() != 1 {
        return Err(DataSetError::rank(1, indices.rank(), indices.describe()));
    }
    let n = indices.len();
    let mut out = Vec::with_capacity(n);
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut bad = None;
    for i in 0..n {
        let v = indices.value(&[i]);
        min = min.min(v);
        max = max.max(v);
        if !(v >= 0.0 && v < len as f64) {
            bad.get_or_insert(v);
            continue;
        }
        out.push(v as usize);
    }
    if let Some(v) = bad {
        tracing::warn!(
            min,
            max,
            length = len,
            dataset = %context.describe(),
            "index list out of range"
        );
        return Err(DataSetError::bounds(
            if v.is_finite() { v as i64 } else { -1 },
            0,
            len,
            context.describe(),
        ));
    }
    Ok(out.into())
}

impl SortDataSet {
    pub fn new(src: DataSetRef, permutation: &DataSetRef) -> Result<Self> {
        if src.rank() == 0 {
            return Err(DataSetError::rank(">= 1 (sort)", 0, src.describe()));
        }
        let perm = read_indices(permutation.as_ref(), src.len(), src.as_ref())?;
        Self::with_indices(src, perm)
    }

    /// Sort by indices already known to be in range of `src`.
    pub fn with_indices(src: DataSetRef, perm: Arc<[usize]>) -> Result<Self> {
        if src.rank() == 0 {
            return Err(DataSetError::rank(">= 1 (sort)", 0, src.describe()));
        }
        let len = src.len();
        if let Some(&bad) = perm.iter().find(|&&i| i >= len) {
            return Err(DataSetError::bounds(bad as i64, 0, len, src.describe()));
        }
        tracing::trace!(n = perm.len(), src = %src.describe(), "sort");
        let props = derive_properties(src.as_ref(), &perm)?;
        Ok(Self { src, perm, props })
    }

    pub fn source(&self) -> &DataSetRef {
        &self.src
    }

    pub fn indices(&self) -> &[usize] {
        &self.perm
    }

    #[inline]
    fn mapped(&self, idx: &[usize]) -> Shape {
        let mut s = Shape::from_slice(idx);
        s[0] = self.perm[idx[0]];
        s
    }
}

fn sort_ref(ds: &DataSetRef, perm: &Arc<[usize]>) -> Result<DataSetRef> {
    Ok(Arc::new(SortDataSet::with_indices(ds.clone(), perm.clone())?))
}

fn derive_properties(src: &dyn QDataSet, perm: &Arc<[usize]>) -> Result<PropertyStore> {
    let rank = src.rank();
    let mut props = PropertyStore::new();
    for k in 0..rank {
        for name in [names::depend(k), names::bundle(k)] {
            let Some(d) = util::dataset_property(src, name) else {
                continue;
            };
            if k == 0 || d.rank() >= 2 {
                match sort_ref(&d, perm) {
                    Ok(s) => props.put(name, s.into())?,
                    Err(err) => tracing::debug!(property = name, %err, "dropping unsortable axis"),
                }
            } else {
                props.put(name, d.into())?;
            }
        }
        if let Some(b) = names::bins(k) {
            props.put_opt(b, src.property(b))?;
        }
    }
    propagate::transform_correlatives(src, &mut props, Rank0::Broadcast(src.len()), |c| {
        sort_ref(c, perm)
    })?;
    propagate::put_join(&mut props, src)?;
    propagate::put_qube(&mut props, rank, util::is_qube(src))?;
    Ok(props)
}

impl QDataSet for SortDataSet {
    fn rank(&self) -> usize {
        self.src.rank()
    }

    fn length(&self, outer: &[usize]) -> usize {
        if outer.is_empty() {
            self.perm.len()
        } else {
            self.src.length(&self.mapped(outer))
        }
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        assert_eq!(
            idx.len(),
            self.rank(),
            "rank {} dataset accessed with {} indices",
            self.rank(),
            idx.len()
        );
        self.src.value(&self.mapped(idx))
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        propagate::resolve(&self.props, self.src.as_ref(), name, Inherit::REORDER)
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        let src_index = *self.perm.get(i)?;
        propagate::resolve_at(&self.props, self.src.as_ref(), name, src_index, Inherit::REORDER)
    }

    fn specialized_slice(&self, i: usize) -> Option<Result<DataSetRef>> {
        match self.perm.get(i) {
            Some(&j) => Some(crate::ops::slice(&self.src, j)),
            None => Some(Err(DataSetError::bounds(
                i as i64,
                0,
                self.perm.len(),
                self.describe(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::DataSetOps;
    use crate::{DDataSet, IndexGenDataSet, Rank0DataSet, TagGenDataSet};
    use approx::assert_relative_eq;
    use qdataset_traits::{MutablePropertyDataSet, Units};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use tracing_test::traced_test;

    fn indices(v: Vec<f64>) -> DataSetRef {
        Arc::new(DDataSet::rank1(v))
    }

    fn series() -> DataSetRef {
        let mut d = DDataSet::rank1(vec![5.0, 3.0, 9.0, 1.0]);
        let t: DataSetRef = Arc::new(TagGenDataSet::new(4, 1.0, 0.0, Units::new("s")));
        d.put_property(names::DEPEND_0, t.into()).unwrap();
        d.put_property(names::CADENCE, Rank0DataSet::new(1.0).into_ref().into())
            .unwrap();
        d.put_property(names::DELTA_PLUS, Rank0DataSet::new(0.5).into_ref().into())
            .unwrap();
        d.put_property(names::UNITS, Units::new("nT").into()).unwrap();
        Arc::new(d)
    }

    #[test]
    fn test_identity_permutation() {
        let d = series();
        let identity: DataSetRef = Arc::new(IndexGenDataSet::new(4));
        let s = SortDataSet::new(d.clone(), &identity).unwrap();
        for i in 0..4 {
            assert_relative_eq!(s.value(&[i]), d.value(&[i]));
        }
    }

    #[test]
    fn test_sort_reorders_values_and_axis() {
        let d = series();
        let s = d.sort(&indices(vec![3.0, 1.0, 0.0, 2.0])).unwrap();
        let got: Vec<f64> = (0..4).map(|i| s.value(&[i])).collect();
        assert_eq!(got, vec![1.0, 3.0, 5.0, 9.0]);
        let dep0 = s.property(names::DEPEND_0).and_then(|v| v.into_dataset()).unwrap();
        assert_relative_eq!(dep0.value(&[0]), 3.0);
        assert_eq!(s.property(names::CADENCE), None);
        assert_eq!(s.property(names::MONOTONIC), None);
        assert_eq!(s.property(names::UNITS), Some(Units::new("nT").into()));
    }

    #[test]
    fn test_rank0_correlative_is_broadcast() {
        let d = series();
        let s = d.sort(&indices(vec![2.0, 2.0])).unwrap();
        assert_eq!(s.len(), 2);
        let dp = s.property(names::DELTA_PLUS).and_then(|v| v.into_dataset()).unwrap();
        assert_eq!(dp.rank(), 1);
        assert_eq!(dp.len(), 2);
        assert_relative_eq!(dp.value(&[1]), 0.5);
    }

    #[traced_test]
    #[test]
    fn test_out_of_range_permutation_is_rejected() {
        let d = series();
        assert!(matches!(
            SortDataSet::new(d.clone(), &indices(vec![0.0, 4.0])),
            Err(DataSetError::IndexOutOfBounds { index: 4, length: 4, .. })
        ));
        assert!(logs_contain("index list out of range"));
        assert!(matches!(
            SortDataSet::new(d, &indices(vec![-1.0])),
            Err(DataSetError::IndexOutOfBounds { index: -1, .. })
        ));
    }

    #[test]
    fn test_random_permutation_of_table() {
        let d: DataSetRef =
            Arc::new(DDataSet::from_fn(&[20, 3], |i| (i[0] * 3 + i[1]) as f64).unwrap());
        let mut rng = StdRng::seed_from_u64(42);
        let mut order: Vec<usize> = (0..20).collect();
        order.shuffle(&mut rng);
        let perm = indices(order.iter().map(|&i| i as f64).collect());
        let s = d.sort(&perm).unwrap();
        assert_eq!(s.property(names::QUBE), Some(true.into()));
        for (i, &j) in order.iter().enumerate() {
            for k in 0..3 {
                assert_relative_eq!(s.value(&[i, k]), d.value(&[j, k]));
            }
            assert_relative_eq!(s.slice(i).unwrap().value(&[1]), d.value(&[j, 1]));
        }
    }
}
