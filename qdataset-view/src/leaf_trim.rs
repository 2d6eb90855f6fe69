use std::sync::Arc;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, PropertyValue, QDataSet, Result};

use crate::propagate::{self, Inherit, Rank0};
use crate::store::PropertyStore;
use crate::trim::check_range;
use crate::util::{self, Shape};

/// `start..end` of the last dimension, whatever the rank.
#[derive(Debug)]
pub struct LeafTrimDataSet {
    src: DataSetRef,
    start: usize,
    end: usize,
    props: PropertyStore,
    inherit: Inherit,
}

/// Shortest last-dimension length over every row of `ds`.
fn min_leaf_length(ds: &dyn QDataSet) -> usize {
    fn walk(ds: &dyn QDataSet, outer: &mut Shape, last: usize, min: &mut usize) {
        let n = ds.length(outer);
        if outer.len() == last {
            *min = (*min).min(n);
            return;
        }
        for i in 0..n {
            outer.push(i);
            walk(ds, outer, last, min);
            outer.pop();
        }
    }
    let last = ds.rank() - 1;
    if let Some(dims) = util::qube_dims(ds) {
        return dims[last];
    }
    let mut min = usize::MAX;
    walk(ds, &mut Shape::new(), last, &mut min);
    if min == usize::MAX {
        0
    } else {
        min
    }
}

impl LeafTrimDataSet {
    pub fn new(src: DataSetRef, start: usize, end: usize) -> Result<Self> {
        let rank = src.rank();
        if rank == 0 {
            return Err(DataSetError::rank("1..=4 (leaf trim)", 0, src.describe()));
        }
        let last = rank - 1;
        check_range(src.as_ref(), last, min_leaf_length(src.as_ref()), start, end)?;
        tracing::trace!(start, end, src = %src.describe(), "leaf trim");

        let mut props = PropertyStore::new();
        for k in 0..rank {
            for name in [names::depend(k), names::bundle(k)] {
                let Some(d) = util::dataset_property(src.as_ref(), name) else {
                    continue;
                };
                let carried = if k != last {
                    Ok(d)
                } else if d.rank() == 1 || name == names::bundle(k) {
                    crate::ops::trim(&d, start, end)
                } else {
                    LeafTrimDataSet::new(d, start, end).map(|l| Arc::new(l) as DataSetRef)
                };
                match carried {
                    Ok(c) => props.put(name, c.into())?,
                    Err(err) => tracing::debug!(property = name, %err, "dropping axis"),
                }
            }
            if let Some(b) = names::bins(k) {
                props.put_opt(b, src.property(b))?;
            }
        }
        propagate::transform_correlatives(src.as_ref(), &mut props, Rank0::Keep, |c| {
            Ok(Arc::new(LeafTrimDataSet::new(c.clone(), start, end)?) as DataSetRef)
        })?;
        propagate::put_join(&mut props, src.as_ref())?;
        propagate::put_qube(&mut props, rank, util::is_qube(src.as_ref()))?;

        let inherit = if rank == 1 {
            Inherit::RANGE
        } else {
            Inherit::SAME
        };
        Ok(Self {
            src,
            start,
            end,
            props,
            inherit,
        })
    }

    #[inline]
    fn shifted(&self, idx: &[usize]) -> Shape {
        let mut s = Shape::from_slice(idx);
        if let Some(last) = s.last_mut() {
            *last += self.start;
        }
        s
    }
}

impl QDataSet for LeafTrimDataSet {
    fn rank(&self) -> usize {
        self.src.rank()
    }

    fn length(&self, outer: &[usize]) -> usize {
        if outer.len() + 1 == self.src.rank() {
            self.end - self.start
        } else {
            self.src.length(outer)
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
            let last = idx[idx.len() - 1];
            assert!(
                last < self.end - self.start,
                "index {} out of bounds for dimension {} of length {}",
                last,
                idx.len() - 1,
                self.end - self.start
            );
        }
        self.src.value(&self.shifted(idx))
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        propagate::resolve(&self.props, self.src.as_ref(), name, self.inherit)
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        let src_index = if self.src.rank() == 1 {
            i + self.start
        } else {
            i
        };
        propagate::resolve_at(&self.props, self.src.as_ref(), name, src_index, self.inherit)
    }
}
