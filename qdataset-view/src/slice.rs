//! Slice views: fix one index and drop its dimension.

use std::sync::Arc;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, PropertyValue, QDataSet, Result};

use crate::propagate::{self, Inherit, Rank0};
use crate::store::PropertyStore;
use crate::util::{self, Shape};

/// `src` with dimension `dim` fixed at `index`.
///
/// The result has rank `src.rank() - 1`. The removed axis is recorded as a
/// context, deeper `DEPEND_k`, `BUNDLE_k` and `BINS_k` shift down by one, and
/// a bundle descriptor on the removed axis labels the result.
#[derive(Debug)]
pub struct SliceDataSet {
    src: DataSetRef,
    dim: usize,
    index: usize,
    props: PropertyStore,
    inherit: Inherit,
}

impl SliceDataSet {
    pub fn new(src: DataSetRef, dim: usize, index: usize) -> Result<Self> {
        let rank = src.rank();
        if rank < dim + 1 || dim >= 3 {
            return Err(DataSetError::rank(
                format!(">= {} (slice of dimension {dim})", dim + 1),
                rank,
                src.describe(),
            ));
        }
        let length = if dim == 0 {
            src.len()
        } else {
            match util::qube_dims(src.as_ref()) {
                Some(dims) => dims[dim],
                None => shortest_row(src.as_ref(), dim),
            }
        };
        if index >= length {
            return Err(DataSetError::bounds(
                index as i64,
                dim,
                length,
                src.describe(),
            ));
        }
        tracing::trace!(dim, index, src = %src.describe(), "slice");

        let props = derive_properties(src.as_ref(), dim, index)?;
        let inherit = if dim == 0 {
            Inherit::RESHAPE
        } else {
            Inherit::INNER
        };
        Ok(Self {
            src,
            dim,
            index,
            props,
            inherit,
        })
    }

    pub fn source(&self) -> &DataSetRef {
        &self.src
    }

    #[inline]
    fn src_index(&self, idx: &[usize]) -> Shape {
        let mut full = Shape::with_capacity(idx.len() + 1);
        full.extend_from_slice(&idx[..self.dim.min(idx.len())]);
        if idx.len() >= self.dim {
            full.push(self.index);
            full.extend_from_slice(&idx[self.dim..]);
        }
        full
    }
}

/// The smallest length of dimension `dim` over every row of a non-qube.
fn shortest_row(src: &dyn QDataSet, dim: usize) -> usize {
    let mut min = usize::MAX;
    for i in 0..src.len() {
        if dim == 1 {
            min = min.min(src.length(&[i]));
        } else {
            for j in 0..src.length(&[i]) {
                min = min.min(src.length(&[i, j]));
            }
        }
    }
    if min == usize::MAX {
        0
    } else {
        min
    }
}

fn derive_properties(src: &dyn QDataSet, dim: usize, index: usize) -> Result<PropertyStore> {
    let rank = src.rank();
    let mut props = PropertyStore::new();

    for k in 0..rank {
        let dep = util::dataset_property(src, names::depend(k));
        if k == dim {
            let bundle = util::dataset_property(src, names::bundle(k));
            match (&dep, bundle) {
                (None, Some(desc)) => {
                    propagate::unbundle_properties(desc.as_ref(), index, &mut props)?;
                    let ctx = propagate::bundle_context(desc.as_ref(), index);
                    propagate::add_context(src, &mut props, ctx)?;
                }
                (Some(d), _) if d.rank() == 2 && dim >= 1 => {
                    match SliceDataSet::new(d.clone(), 1, index) {
                        Ok(s) => propagate::add_context(src, &mut props, Arc::new(s))?,
                        Err(err) => {
                            tracing::debug!(%err, "cannot slice two-dimensional axis, dropping it");
                        }
                    }
                }
                _ => {
                    let ctx = propagate::context_for(dep.as_ref(), index);
                    propagate::add_context(src, &mut props, ctx)?;
                }
            }
            if let Some(b) = names::bins(k) {
                if src.property(b).is_some() {
                    propagate::dropped(b, "slice");
                }
            }
            continue;
        }
        let target = if k < dim { k } else { k - 1 };
        if let Some(d) = dep {
            let carried = if d.rank() >= 2 && k > dim && dim == 0 {
                crate::ops::slice(&d, index)
            } else {
                Ok(d)
            };
            match carried {
                Ok(d) => props.put(names::depend(target), d.into())?,
                Err(err) => tracing::debug!(%err, dim = k, "dropping axis that cannot be sliced"),
            }
        }
        if let Some(b) = util::dataset_property(src, names::bundle(k)) {
            props.put(names::bundle(target), b.into())?;
        }
        if let (Some(from), Some(to)) = (names::bins(k), names::bins(target)) {
            props.put_opt(to, src.property(from))?;
        }
    }
    propagate::transform_correlatives(src, &mut props, Rank0::Keep, |c| {
        Ok(Arc::new(SliceDataSet::new(c.clone(), dim, index)?) as DataSetRef)
    })?;

    if dim >= 1 {
        propagate::put_join(&mut props, src)?;
    }
    propagate::put_qube(&mut props, rank - 1, util::is_qube(src))?;
    Ok(props)
}

impl QDataSet for SliceDataSet {
    fn rank(&self) -> usize {
        self.src.rank() - 1
    }

    fn length(&self, outer: &[usize]) -> usize {
        self.src.length(&self.src_index(outer))
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
        self.src.value(&self.src_index(idx))
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        propagate::resolve(&self.props, self.src.as_ref(), name, self.inherit)
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        if self.dim == 0 {
            return self.property(name);
        }
        propagate::resolve_at(&self.props, self.src.as_ref(), name, i, self.inherit)
    }
}
