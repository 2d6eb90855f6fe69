//! Subset views: an independent index list per dimension.

use std::sync::Arc;

use smallvec::SmallVec;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, PropertyValue, QDataSet, Result};

use crate::propagate::{self, Inherit, Rank0};
use crate::sort::{read_indices, SortDataSet};
use crate::store::PropertyStore;
use crate::util::{self, Shape};

type Maps = SmallVec<[Option<Arc<[usize]>>; 4]>;

/// Collects per-dimension index lists before building a [`SubsetDataSet`].
///
/// Non-qube sources may only be subset along dimension 0.
#[derive(Debug)]
pub struct SubsetBuilder {
    src: DataSetRef,
    dims: Option<Shape>,
    maps: Maps,
}

impl SubsetBuilder {
    pub fn new(src: DataSetRef) -> Self {
        let dims = util::qube_dims(src.as_ref());
        let maps = SmallVec::from_elem(None, src.rank());
        Self { src, dims, maps }
    }

    /// Keep only elements `indices` (a rank-1 index dataset) of `dim`.
    pub fn apply_index(mut self, dim: usize, indices: &DataSetRef) -> Result<Self> {
        let rank = self.src.rank();
        if dim >= rank {
            return Err(DataSetError::rank(
                format!("> {dim} (subset of dimension {dim})"),
                rank,
                self.src.describe(),
            ));
        }
        let len = match (&self.dims, dim) {
            (Some(dims), _) => dims[dim],
            (None, 0) => self.src.len(),
            (None, _) => {
                return Err(DataSetError::invalid(format!(
                    "non-qube {} can only be subset along dimension 0",
                    self.src.describe()
                )))
            }
        };
        self.maps[dim] = Some(read_indices(indices.as_ref(), len, self.src.as_ref())?);
        Ok(self)
    }

    pub fn build(self) -> Result<SubsetDataSet> {
        SubsetDataSet::new(self.src, self.dims, self.maps)
    }
}

/// `value(i, j, ...) = src.value(map0[i], map1[j], ...)`, where a dimension
/// without a map is read straight through.
#[derive(Debug)]
pub struct SubsetDataSet {
    src: DataSetRef,
    dims: Option<Shape>,
    maps: Maps,
    props: PropertyStore,
    inherit: Inherit,
}

impl SubsetDataSet {
    fn new(src: DataSetRef, dims: Option<Shape>, maps: Maps) -> Result<Self> {
        if src.rank() == 0 {
            return Err(DataSetError::rank(">= 1 (subset)", 0, src.describe()));
        }
        tracing::trace!(src = %src.describe(), "subset");
        let props = derive_properties(src.as_ref(), &maps)?;
        let inherit = if maps[0].is_some() {
            Inherit::REORDER
        } else {
            Inherit::SAME
        };
        Ok(Self {
            src,
            dims,
            maps,
            props,
            inherit,
        })
    }

    #[inline]
    fn mapped(&self, idx: &[usize]) -> Shape {
        idx.iter()
            .zip(self.maps.iter())
            .map(|(&i, m)| match m {
                Some(m) => m[i],
                None => i,
            })
            .collect()
    }
}

/// Subset `ds` (whose dimensions line up with the first `ds.rank()` of the
/// owner) with the owner's maps.
fn subset_like(ds: &DataSetRef, maps: &[Option<Arc<[usize]>>]) -> Result<DataSetRef> {
    if ds.rank() == 1 {
        return match &maps[0] {
            Some(m) => Ok(Arc::new(SortDataSet::with_indices(ds.clone(), m.clone())?)),
            None => Ok(ds.clone()),
        };
    }
    let dims = util::qube_dims(ds.as_ref());
    let own: Maps = maps.iter().take(ds.rank()).cloned().collect();
    Ok(Arc::new(SubsetDataSet::new(ds.clone(), dims, own)?))
}

fn derive_properties(src: &dyn QDataSet, maps: &Maps) -> Result<PropertyStore> {
    let rank = src.rank();
    let mut props = PropertyStore::new();
    for k in 0..rank {
        if let Some(d) = util::dataset_property(src, names::depend(k)) {
            let carried = match (d.rank(), k) {
                (1, _) => subset_like(&d, &maps[k..=k]),
                (2, 0) => subset_like(&d, &maps[..1]),
                (2, _) => subset_like(&d, &[maps[0].clone(), maps[k].clone()]),
                _ => Err(DataSetError::invalid("axis of rank above 2")),
            };
            match carried {
                Ok(c) => props.put(names::depend(k), c.into())?,
                Err(err) => tracing::debug!(dim = k, %err, "dropping axis"),
            }
        }
        if let Some(b) = util::dataset_property(src, names::bundle(k)) {
            let carried = match &maps[k] {
                Some(m) => SortDataSet::with_indices(b, m.clone())
                    .map(|s| Arc::new(s) as DataSetRef),
                None => Ok(b),
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
    propagate::transform_correlatives(src, &mut props, Rank0::Keep, |c| subset_like(c, maps))?;
    propagate::put_join(&mut props, src)?;
    propagate::put_qube(&mut props, rank, util::is_qube(src))?;
    Ok(props)
}

impl QDataSet for SubsetDataSet {
    fn rank(&self) -> usize {
        self.src.rank()
    }

    fn length(&self, outer: &[usize]) -> usize {
        let m = outer.len();
        if let Some(map) = &self.maps[m] {
            return map.len();
        }
        match &self.dims {
            Some(dims) => dims[m],
            None => self.src.length(&self.mapped(outer)),
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
        propagate::resolve(&self.props, self.src.as_ref(), name, self.inherit)
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        let src_index = match &self.maps[0] {
            Some(m) => *m.get(i)?,
            None => i,
        };
        propagate::resolve_at(&self.props, self.src.as_ref(), name, src_index, self.inherit)
    }
}
