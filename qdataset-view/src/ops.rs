//! Operator entry points.
//!
//! The free functions pick a dataset's specialised implementation when it
//! offers one and fall back to the generic view otherwise. [`DataSetOps`]
//! exposes the same operators as methods on [`DataSetRef`].

use std::sync::Arc;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, QDataSet, Result};

use crate::array::DDataSet;
use crate::leaf_trim::LeafTrimDataSet;
use crate::replicate::ReplicateDataSet;
use crate::reverse::ReverseDataSet;
use crate::slice::SliceDataSet;
use crate::sort::SortDataSet;
use crate::stride::{StrideWindowDataSet, Window};
use crate::subset::SubsetBuilder;
use crate::transpose::TransposeDataSet;
use crate::trim::TrimDataSet;
use crate::util;

/// Element `i` of the leading dimension.
pub fn slice(src: &DataSetRef, i: usize) -> Result<DataSetRef> {
    if let Some(r) = src.specialized_slice(i) {
        return r;
    }
    Ok(Arc::new(SliceDataSet::new(src.clone(), 0, i)?))
}

/// `src` with dimension `dim` fixed at `i`.
pub fn slice_dim(src: &DataSetRef, dim: usize, i: usize) -> Result<DataSetRef> {
    if dim == 0 {
        return slice(src, i);
    }
    Ok(Arc::new(SliceDataSet::new(src.clone(), dim, i)?))
}

/// Elements `start..end` of the leading dimension.
pub fn trim(src: &DataSetRef, start: usize, end: usize) -> Result<DataSetRef> {
    if let Some(r) = src.specialized_trim(start, end) {
        return r;
    }
    Ok(Arc::new(TrimDataSet::new(src.clone(), start, end)?))
}

pub fn leaf_trim(src: &DataSetRef, start: usize, end: usize) -> Result<DataSetRef> {
    Ok(Arc::new(LeafTrimDataSet::new(src.clone(), start, end)?))
}

pub fn sort(src: &DataSetRef, permutation: &DataSetRef) -> Result<DataSetRef> {
    Ok(Arc::new(SortDataSet::new(src.clone(), permutation)?))
}

/// Subset by one index list per dimension; `None` keeps a dimension whole.
pub fn subset(src: &DataSetRef, indices: &[Option<&DataSetRef>]) -> Result<DataSetRef> {
    let mut builder = SubsetBuilder::new(src.clone());
    for (dim, idx) in indices.iter().enumerate() {
        if let Some(idx) = idx {
            builder = builder.apply_index(dim, idx)?;
        }
    }
    Ok(Arc::new(builder.build()?))
}

pub fn transpose(src: &DataSetRef) -> Result<DataSetRef> {
    Ok(Arc::new(TransposeDataSet::new(src.clone())?))
}

pub fn reverse(src: &DataSetRef) -> Result<DataSetRef> {
    Ok(Arc::new(ReverseDataSet::new(src.clone())?))
}

pub fn replicate(src: &DataSetRef, insert_dim: usize, count: usize) -> Result<DataSetRef> {
    Ok(Arc::new(ReplicateDataSet::new(src.clone(), insert_dim, count)?))
}

pub fn stride_window(src: &DataSetRef, windows: &[Window]) -> Result<DataSetRef> {
    Ok(Arc::new(StrideWindowDataSet::new(src.clone(), windows)?))
}

/// Column `i` of a bundle: the last dimension fixed at `i`.
pub fn unbundle(src: &DataSetRef, i: usize) -> Result<DataSetRef> {
    if !util::is_bundle(src.as_ref()) {
        return Err(DataSetError::invalid(format!(
            "{} is not a bundle",
            src.describe()
        )));
    }
    slice_dim(src, src.rank() - 1, i)
}

/// Column named `name` (by `NAME`, then `LABEL`) of a bundle.
pub fn unbundle_named(src: &DataSetRef, name: &str) -> Result<DataSetRef> {
    let last = src.rank().max(1) - 1;
    let desc = util::dataset_property(src.as_ref(), names::bundle(last))
        .ok_or_else(|| DataSetError::invalid(format!("{} is not a bundle", src.describe())))?;
    let n = desc.len();
    for key in [names::NAME, names::LABEL] {
        let found = (0..n).find(|&i| {
            desc.property_at(key, i)
                .and_then(|v| v.as_str().map(|s| s == name))
                .unwrap_or(false)
        });
        if let Some(i) = found {
            return unbundle(src, i);
        }
    }
    Err(DataSetError::invalid(format!(
        "no bundled column named `{name}` in {}",
        src.describe()
    )))
}

/// Materialise `src` into a double-precision buffer.
pub fn copy(src: &DataSetRef) -> Result<DataSetRef> {
    Ok(Arc::new(DDataSet::copy(src.as_ref())?))
}

/// The operators as methods on a shared dataset handle.
///
/// ```
/// use std::sync::Arc;
/// use qdataset_view::{DDataSet, DataSetOps};
/// use qdataset_traits::{DataSetRef, QDataSet};
///
/// let d: DataSetRef =
///     Arc::new(DDataSet::from_fn(&[4, 3], |i| (i[0] * 3 + i[1]) as f64).unwrap());
/// let row = d.trim(1, 3).unwrap().slice(1).unwrap();
/// assert_eq!(row.value(&[2]), 8.0);
/// ```
pub trait DataSetOps {
    fn slice(&self, i: usize) -> Result<DataSetRef>;
    fn slice1(&self, i: usize) -> Result<DataSetRef>;
    fn slice2(&self, i: usize) -> Result<DataSetRef>;
    fn trim(&self, start: usize, end: usize) -> Result<DataSetRef>;
    fn leaf_trim(&self, start: usize, end: usize) -> Result<DataSetRef>;
    fn sort(&self, permutation: &DataSetRef) -> Result<DataSetRef>;
    fn subset(&self, indices: &[Option<&DataSetRef>]) -> Result<DataSetRef>;
    fn transpose(&self) -> Result<DataSetRef>;
    fn reverse(&self) -> Result<DataSetRef>;
    fn replicate(&self, insert_dim: usize, count: usize) -> Result<DataSetRef>;
    fn stride_window(&self, windows: &[Window]) -> Result<DataSetRef>;
    fn unbundle(&self, i: usize) -> Result<DataSetRef>;
    fn copy(&self) -> Result<DataSetRef>;
}

impl DataSetOps for DataSetRef {
    fn slice(&self, i: usize) -> Result<DataSetRef> {
        slice(self, i)
    }

    fn slice1(&self, i: usize) -> Result<DataSetRef> {
        slice_dim(self, 1, i)
    }

    fn slice2(&self, i: usize) -> Result<DataSetRef> {
        slice_dim(self, 2, i)
    }

    fn trim(&self, start: usize, end: usize) -> Result<DataSetRef> {
        trim(self, start, end)
    }

    fn leaf_trim(&self, start: usize, end: usize) -> Result<DataSetRef> {
        leaf_trim(self, start, end)
    }

    fn sort(&self, permutation: &DataSetRef) -> Result<DataSetRef> {
        sort(self, permutation)
    }

    fn subset(&self, indices: &[Option<&DataSetRef>]) -> Result<DataSetRef> {
        subset(self, indices)
    }

    fn transpose(&self) -> Result<DataSetRef> {
        transpose(self)
    }

    fn reverse(&self) -> Result<DataSetRef> {
        reverse(self)
    }

    fn replicate(&self, insert_dim: usize, count: usize) -> Result<DataSetRef> {
        replicate(self, insert_dim, count)
    }

    fn stride_window(&self, windows: &[Window]) -> Result<DataSetRef> {
        stride_window(self, windows)
    }

    fn unbundle(&self, i: usize) -> Result<DataSetRef> {
        unbundle(self, i)
    }

    fn copy(&self) -> Result<DataSetRef> {
        copy(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BundleDataSet, IndexGenDataSet};
    use approx::assert_relative_eq;
    use qdataset_traits::MutablePropertyDataSet;

    #[test]
    fn test_unbundle_by_index_and_name() {
        let mut x = DDataSet::rank1(vec![1.0, 2.0]);
        x.put_property(names::NAME, "x".into()).unwrap();
        let mut y = DDataSet::rank1(vec![3.0, 4.0]);
        y.put_property(names::LABEL, "Y axis".into()).unwrap();
        let series: Vec<DataSetRef> = vec![Arc::new(x), Arc::new(y)];
        let b: DataSetRef = Arc::new(BundleDataSet::from_series(series).unwrap());
        assert_relative_eq!(b.unbundle(1).unwrap().value(&[0]), 3.0);
        assert_relative_eq!(unbundle_named(&b, "x").unwrap().value(&[1]), 2.0);
        assert_relative_eq!(unbundle_named(&b, "Y axis").unwrap().value(&[1]), 4.0);
        assert!(unbundle_named(&b, "z").is_err());
    }

    #[test]
    fn test_unbundle_requires_a_bundle() {
        let d: DataSetRef = Arc::new(IndexGenDataSet::new(3));
        assert!(matches!(d.unbundle(0), Err(DataSetError::InvalidConstruction(_))));
    }

    #[test]
    fn test_chained_operators() {
        let d: DataSetRef =
            Arc::new(DDataSet::from_fn(&[6, 4], |i| (i[0] * 4 + i[1]) as f64).unwrap());
        let v = d
            .trim(1, 5)
            .and_then(|t| t.transpose())
            .and_then(|t| t.slice(2))
            .and_then(|t| t.reverse())
            .unwrap();
        assert_eq!(v.len(), 4);
        assert_relative_eq!(v.value(&[0]), d.value(&[4, 2]));
        assert_relative_eq!(v.value(&[3]), d.value(&[1, 2]));
        let c = v.copy().unwrap();
        assert_relative_eq!(c.value(&[1]), v.value(&[1]));
    }
}
