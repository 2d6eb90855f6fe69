//! Replicate views: insert a new axis along which the source repeats.

use std::sync::Arc;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, PropertyValue, QDataSet, Result, MAX_RANK};

use crate::propagate::{self, Inherit, Rank0};
use crate::store::PropertyStore;
use crate::util::{self, Shape};

/// `src` repeated `count` times along a new dimension `insert_dim`.
///
/// The index at `insert_dim` is ignored on reads. `DEPEND_k`, `BUNDLE_k`
/// and `BINS_k` at or past the new axis shift up by one.
#[derive(Debug)]
pub struct ReplicateDataSet {
    src: DataSetRef,
    insert_dim: usize,
    count: usize,
    props: PropertyStore,
    inherit: Inherit,
}

impl ReplicateDataSet {
    pub fn new(src: DataSetRef, insert_dim: usize, count: usize) -> Result<Self> {
        let rank = src.rank();
        if rank >= MAX_RANK {
            return Err(DataSetError::rank(
                format!("<= {} (replicate)", MAX_RANK - 1),
                rank,
                src.describe(),
            ));
        }
        if insert_dim > rank {
            return Err(DataSetError::invalid(format!(
                "cannot insert dimension {insert_dim} into rank {rank} dataset {}",
                src.describe()
            )));
        }
        tracing::trace!(insert_dim, count, src = %src.describe(), "replicate");
        let props = derive_properties(src.as_ref(), insert_dim, count)?;
        let inherit = if insert_dim == 0 {
            Inherit::RESHAPE
        } else {
            Inherit::INNER
        };
        Ok(Self {
            src,
            insert_dim,
            count,
            props,
            inherit,
        })
    }

    /// Broadcast a rank-0 `src` to a qube of shape `dims`.
    pub fn broadcast(src: DataSetRef, dims: &[usize]) -> Result<DataSetRef> {
        if src.rank() != 0 {
            return Err(DataSetError::rank(0, src.rank(), src.describe()));
        }
        dims.iter().rev().try_fold(src, |acc, &n| {
            Ok(Arc::new(ReplicateDataSet::new(acc, 0, n)?) as DataSetRef)
        })
    }

    pub fn source(&self) -> &DataSetRef {
        &self.src
    }

    #[inline]
    fn src_index(&self, idx: &[usize]) -> Shape {
        let mut s = Shape::with_capacity(idx.len());
        for (d, &i) in idx.iter().enumerate() {
            if d != self.insert_dim {
                s.push(i);
            }
        }
        s
    }
}

fn derive_properties(
    src: &dyn QDataSet,
    insert_dim: usize,
    count: usize,
) -> Result<PropertyStore> {
    let rank = src.rank();
    let mut props = PropertyStore::new();
    for k in 0..rank {
        let target = if k < insert_dim { k } else { k + 1 };
        for (from, to) in [
            (names::depend(k), names::depend(target)),
            (names::bundle(k), names::bundle(target)),
        ] {
            let Some(d) = util::dataset_property(src, from) else {
                continue;
            };
            if d.rank() >= 2 && insert_dim == 0 {
                propagate::dropped(from, "replicate");
                continue;
            }
            props.put(to, d.into())?;
        }
        if let Some(b) = names::bins(k) {
            match names::bins(target) {
                Some(to) => props.put_opt(to, src.property(b))?,
                None if src.property(b).is_some() => propagate::dropped(b, "replicate"),
                None => {}
            }
        }
    }
    propagate::transform_correlatives(src, &mut props, Rank0::Keep, |c| {
        Ok(Arc::new(ReplicateDataSet::new(c.clone(), insert_dim, count)?) as DataSetRef)
    })?;
    if insert_dim >= 1 {
        propagate::put_join(&mut props, src)?;
    }
    propagate::put_qube(&mut props, rank + 1, util::is_qube(src))?;
    Ok(props)
}

impl QDataSet for ReplicateDataSet {
    fn rank(&self) -> usize {
        self.src.rank() + 1
    }

    fn length(&self, outer: &[usize]) -> usize {
        if outer.len() == self.insert_dim {
            self.count
        } else {
            self.src.length(&self.src_index(outer))
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
        if qdataset_traits::config::range_checking() {
            assert!(
                idx[self.insert_dim] < self.count,
                "index {} out of bounds for dimension {} of length {}",
                idx[self.insert_dim],
                self.insert_dim,
                self.count
            );
        }
        self.src.value(&self.src_index(idx))
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        propagate::resolve(&self.props, self.src.as_ref(), name, self.inherit)
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        if self.insert_dim == 0 {
            return self.property(name);
        }
        propagate::resolve_at(&self.props, self.src.as_ref(), name, i, self.inherit)
    }
}
