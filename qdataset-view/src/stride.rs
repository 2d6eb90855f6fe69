//! Strided windows over qubes.

use std::sync::Arc;

use smallvec::SmallVec;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, PropertyValue, QDataSet, Result};

use crate::generated::Rank0DataSet;
use crate::propagate::{self, Inherit, Rank0};
use crate::sort::SortDataSet;
use crate::store::PropertyStore;
use crate::util::{self, Shape};

/// `start..stop` of one dimension, every `stride`-th element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub stop: usize,
    pub stride: usize,
}

impl Window {
    pub fn new(start: usize, stop: usize, stride: usize) -> Self {
        Self {
            start,
            stop,
            stride,
        }
    }

    /// The whole of a dimension of length `len`.
    pub fn all(len: usize) -> Self {
        Self::new(0, len, 1)
    }

    /// Number of elements selected: `ceil((stop - start) / stride)`.
    pub fn len(&self) -> usize {
        (self.stop - self.start).div_ceil(self.stride)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_identity(&self, len: usize) -> bool {
        self.start == 0 && self.stop == len && self.stride == 1
    }

    #[inline]
    fn map(&self, i: usize) -> usize {
        self.start + i * self.stride
    }

    fn indices(&self) -> Arc<[usize]> {
        (0..self.len()).map(|i| self.map(i)).collect()
    }
}

/// `value(i0, i1, ...) = src.value(start0 + stride0 * i0, ...)`.
#[derive(Debug)]
pub struct StrideWindowDataSet {
    src: DataSetRef,
    windows: SmallVec<[Window; 4]>,
    props: PropertyStore,
    inherit: Inherit,
}

impl StrideWindowDataSet {
    /// Window `src` with one [`Window`] per leading dimension; dimensions
    /// past `windows.len()` are kept whole.
    pub fn new(src: DataSetRef, windows: &[Window]) -> Result<Self> {
        let rank = src.rank();
        let dims = util::qube_dims(src.as_ref()).ok_or_else(|| {
            DataSetError::invalid(format!("stride window needs a qube, got {}", src.describe()))
        })?;
        if rank == 0 || windows.len() > rank {
            return Err(DataSetError::rank(
                format!(">= {} (stride window)", windows.len().max(1)),
                rank,
                src.describe(),
            ));
        }
        let mut all: SmallVec<[Window; 4]> = SmallVec::with_capacity(rank);
        for (d, &n) in dims.iter().enumerate() {
            let w = windows.get(d).copied().unwrap_or(Window::all(n));
            if w.stride == 0 {
                return Err(DataSetError::invalid(format!(
                    "stride of dimension {d} must be positive"
                )));
            }
            crate::trim::check_range(src.as_ref(), d, n, w.start, w.stop)?;
            all.push(w);
        }
        tracing::trace!(src = %src.describe(), windows = ?all, "stride window");

        let props = derive_properties(src.as_ref(), &dims, &all)?;
        let inherit = if all[0].is_identity(dims[0]) {
            Inherit::SAME
        } else {
            Inherit::STRIDED
        };
        Ok(Self {
            src,
            windows: all,
            props,
            inherit,
        })
    }

    #[inline]
    fn mapped(&self, idx: &[usize]) -> Shape {
        idx.iter()
            .zip(self.windows.iter())
            .map(|(&i, w)| w.map(i))
            .collect()
    }
}

fn window_ref(ds: &DataSetRef, windows: &[Window]) -> Result<DataSetRef> {
    Ok(Arc::new(StrideWindowDataSet::new(ds.clone(), windows)?))
}

fn derive_properties(
    src: &dyn QDataSet,
    dims: &[usize],
    windows: &[Window],
) -> Result<PropertyStore> {
    let rank = src.rank();
    let mut props = PropertyStore::new();
    for k in 0..rank {
        let w = windows[k];
        if let Some(d) = util::dataset_property(src, names::depend(k)) {
            let untouched =
                w.is_identity(dims[k]) && (d.rank() == 1 || windows[0].is_identity(dims[0]));
            let carried = if untouched {
                Ok(d)
            } else {
                match (d.rank(), k) {
                    (1, _) => window_ref(&d, &[w]),
                    (2, k) if k >= 1 => window_ref(&d, &[windows[0], w]),
                    _ => window_ref(&d, &[w]),
                }
            };
            match carried {
                Ok(c) => props.put(names::depend(k), c.into())?,
                Err(err) => tracing::debug!(dim = k, %err, "dropping axis"),
            }
        }
        if let Some(b) = util::dataset_property(src, names::bundle(k)) {
            let carried = if w.is_identity(dims[k]) {
                Ok(b)
            } else {
                SortDataSet::with_indices(b, w.indices()).map(|s| Arc::new(s) as DataSetRef)
            };
            match carried {
                Ok(c) => props.put(names::bundle(k), c.into())?,
                Err(err) => tracing::debug!(dim = k, %err, "dropping bundle descriptor"),
            }
        }
        if let Some(b) = names::bins(k) {
            props.put_opt(b, src.property(b))?;
        }
    }
    propagate::transform_correlatives(src, &mut props, Rank0::Keep, |c| window_ref(c, windows))?;

    let stride0 = windows[0].stride;
    if stride0 > 1 {
        if let Some(c) = util::dataset_property(src, names::CADENCE) {
            if c.rank() == 0 {
                let step = c.value(&[]) * stride0 as f64;
                let scaled = match c.property(names::UNITS).and_then(|u| u.as_units().cloned()) {
                    Some(units) => Rank0DataSet::with_units(step, units),
                    None => Rank0DataSet::new(step),
                };
                props.put(names::CADENCE, scaled.into_ref().into())?;
            }
        }
    }
    propagate::put_join(&mut props, src)?;
    propagate::put_qube(&mut props, rank, true)?;
    Ok(props)
}

impl QDataSet for StrideWindowDataSet {
    fn rank(&self) -> usize {
        self.src.rank()
    }

    fn length(&self, outer: &[usize]) -> usize {
        self.windows[outer.len()].len()
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
        if qdataset_traits::config::range_checking() {
            for (d, (&i, w)) in idx.iter().zip(self.windows.iter()).enumerate() {
                assert!(
                    i < w.len(),
                    "index {} out of bounds for dimension {} of length {}",
                    i,
                    d,
                    w.len()
                );
            }
        }
        self.src.value(&self.mapped(idx))
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        propagate::resolve(&self.props, self.src.as_ref(), name, self.inherit)
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        let src_index = self.windows[0].map(i);
        propagate::resolve_at(&self.props, self.src.as_ref(), name, src_index, self.inherit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DDataSet, JoinDataSet, TagGenDataSet};
    use approx::assert_relative_eq;
    use qdataset_traits::{MutablePropertyDataSet, Units};

    #[test]
    fn test_window_len_rounds_up() {
        assert_eq!(Window::new(0, 10, 3).len(), 4);
        assert_eq!(Window::new(2, 8, 2).len(), 3);
        assert_eq!(Window::new(5, 5, 2).len(), 0);
    }

    #[test]
    fn test_stride_window_values() {
        let d: DataSetRef =
            Arc::new(DDataSet::from_fn(&[10, 6], |i| (i[0] * 10 + i[1]) as f64).unwrap());
        let w = StrideWindowDataSet::new(d.clone(), &[Window::new(1, 10, 3), Window::new(0, 6, 2)])
            .unwrap();
        assert_eq!(w.len(), 3);
        assert_eq!(w.length(&[0]), 3);
        assert_relative_eq!(w.value(&[2, 1]), d.value(&[7, 2]));
        assert_eq!(w.property(names::QUBE), Some(true.into()));
    }

    #[test]
    fn test_stride_scales_cadence_and_strides_depend() {
        let mut d = DDataSet::rank1((0..12).map(f64::from).collect());
        let t = TagGenDataSet::new(12, 4.0, 0.0, Units::new("s"));
        let cadence = t.property(names::CADENCE).unwrap();
        d.put_property(names::DEPEND_0, (Arc::new(t) as DataSetRef).into())
            .unwrap();
        d.put_property(names::CADENCE, cadence).unwrap();
        let w = StrideWindowDataSet::new(Arc::new(d), &[Window::new(0, 12, 4)]).unwrap();
        assert_eq!(w.len(), 3);
        let c = w.property(names::CADENCE).and_then(|v| v.into_dataset()).unwrap();
        assert_relative_eq!(c.value(&[]), 16.0);
        assert_eq!(c.property(names::UNITS), Some(Units::new("s").into()));
        let dep = w.property(names::DEPEND_0).and_then(|v| v.into_dataset()).unwrap();
        assert_relative_eq!(dep.value(&[2]), 32.0);
        let dep_cadence = dep.property(names::CADENCE).and_then(|v| v.into_dataset()).unwrap();
        assert_relative_eq!(dep_cadence.value(&[]), 16.0);
    }

    #[test]
    fn test_stride_window_errors() {
        let d: DataSetRef = Arc::new(DDataSet::zeros(&[4]).unwrap());
        assert!(StrideWindowDataSet::new(d.clone(), &[Window::new(0, 4, 0)]).is_err());
        assert!(StrideWindowDataSet::new(d.clone(), &[Window::new(0, 5, 1)]).is_err());
        assert!(StrideWindowDataSet::new(d, &[Window::all(4), Window::all(1)]).is_err());
        let mut j = JoinDataSet::new(2).unwrap();
        j.join(Arc::new(DDataSet::rank1(vec![1.0]))).unwrap();
        j.join(Arc::new(DDataSet::rank1(vec![1.0, 2.0]))).unwrap();
        assert!(StrideWindowDataSet::new(Arc::new(j), &[Window::all(2)]).is_err());
    }
}
