use std::sync::Arc;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, PropertyValue, QDataSet, Result};

use crate::propagate::{self, Inherit, Rank0};
use crate::store::PropertyStore;
use crate::util;

/// Rank-2 qube with its two dimensions swapped: `value(i, j) = src.value(j, i)`.
#[derive(Debug)]
pub struct TransposeDataSet {
    src: DataSetRef,
    dims: [usize; 2],
    props: PropertyStore,
}

impl TransposeDataSet {
    pub fn new(src: DataSetRef) -> Result<Self> {
        if src.rank() != 2 {
            return Err(DataSetError::rank(2, src.rank(), src.describe()));
        }
        let dims = util::qube_dims(src.as_ref()).ok_or_else(|| {
            DataSetError::invalid(format!("transpose needs a qube, got {}", src.describe()))
        })?;
        tracing::trace!(src = %src.describe(), "transpose");

        let mut props = PropertyStore::new();
        for (from, to) in [(0, 1), (1, 0)] {
            for (f, t) in [
                (names::depend(from), names::depend(to)),
                (names::bundle(from), names::bundle(to)),
            ] {
                let Some(d) = util::dataset_property(src.as_ref(), f) else {
                    continue;
                };
                if d.rank() == 2 {
                    match TransposeDataSet::new(d) {
                        Ok(td) => props.put(t, PropertyValue::DataSet(Arc::new(td)))?,
                        Err(err) => tracing::debug!(property = f, %err, "dropping axis"),
                    }
                } else {
                    props.put(t, d.into())?;
                }
            }
            if let (Some(f), Some(t)) = (names::bins(from), names::bins(to)) {
                props.put_opt(t, src.property(f))?;
            }
        }
        propagate::transform_correlatives(src.as_ref(), &mut props, Rank0::Keep, |c| {
            Ok(Arc::new(TransposeDataSet::new(c.clone())?) as DataSetRef)
        })?;
        propagate::put_qube(&mut props, 2, true)?;

        Ok(Self {
            src,
            dims: [dims[1], dims[0]],
            props,
        })
    }
}

impl QDataSet for TransposeDataSet {
    fn rank(&self) -> usize {
        2
    }

    fn length(&self, outer: &[usize]) -> usize {
        self.dims[outer.len()]
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        assert_eq!(idx.len(), 2, "rank 2 dataset accessed with {} indices", idx.len());
        self.src.value(&[idx[1], idx[0]])
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        propagate::resolve(&self.props, self.src.as_ref(), name, Inherit::REORDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BundleDataSet, DDataSet, JoinDataSet};
    use approx::assert_relative_eq;
    use qdataset_traits::MutablePropertyDataSet;

    #[test]
    fn test_transpose_swaps_values_and_axes() {
        let mut d = DDataSet::from_fn(&[3, 2], |i| (i[0] * 10 + i[1]) as f64).unwrap();
        let x: DataSetRef = Arc::new(DDataSet::rank1(vec![0.0, 1.0, 2.0]));
        let y: DataSetRef = Arc::new(DDataSet::rank1(vec![5.0, 6.0]));
        d.put_property(names::DEPEND_0, x.clone().into()).unwrap();
        d.put_property(names::DEPEND_1, y.clone().into()).unwrap();
        d.put_property(names::LABEL, "flux".into()).unwrap();
        let t = TransposeDataSet::new(Arc::new(d)).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.length(&[0]), 3);
        assert_relative_eq!(t.value(&[1, 2]), 21.0);
        assert_eq!(t.property(names::DEPEND_0), Some(y.into()));
        assert_eq!(t.property(names::DEPEND_1), Some(x.into()));
        assert_eq!(t.property(names::LABEL), Some("flux".into()));
        assert_eq!(t.property(names::QUBE), Some(true.into()));
    }

    #[test]
    fn test_transpose_moves_bundle() {
        let series: Vec<DataSetRef> = vec![
            Arc::new(DDataSet::rank1(vec![1.0, 2.0])),
            Arc::new(DDataSet::rank1(vec![3.0, 4.0])),
        ];
        let b = BundleDataSet::from_series(series).unwrap();
        let t = TransposeDataSet::new(Arc::new(b)).unwrap();
        assert!(t.property(names::BUNDLE_0).is_some());
        assert!(t.property(names::BUNDLE_1).is_none());
    }

    #[test]
    fn test_transpose_rejects_wrong_rank_and_jagged() {
        let r1: DataSetRef = Arc::new(DDataSet::rank1(vec![1.0]));
        assert!(matches!(
            TransposeDataSet::new(r1),
            Err(DataSetError::RankMismatch { actual: 1, .. })
        ));
        let mut j = JoinDataSet::new(2).unwrap();
        j.join(Arc::new(DDataSet::rank1(vec![1.0]))).unwrap();
        j.join(Arc::new(DDataSet::rank1(vec![1.0, 2.0]))).unwrap();
        assert!(TransposeDataSet::new(Arc::new(j)).is_err());
    }
}
