//! Trim views: a contiguous range of the leading dimension.

use qdataset_traits::names;
use qdataset_traits::{DataSetError, DataSetRef, PropertyValue, QDataSet, Result};

use crate::propagate::{self, Inherit, Rank0};
use crate::store::PropertyStore;
use crate::util::{self, Shape};

/// Records `start..end` of `src`.
#[derive(Debug)]
pub struct TrimDataSet {
    src: DataSetRef,
    start: usize,
    end: usize,
    props: PropertyStore,
}

/// Validate `start <= end <= len`.
pub(crate) fn check_range(
    src: &dyn QDataSet,
    dim: usize,
    len: usize,
    start: usize,
    end: usize,
) -> Result<()> {
    if end > len {
        return Err(DataSetError::bounds(end as i64, dim, len, src.describe()));
    }
    if start > end {
        return Err(DataSetError::invalid(format!(
            "trim start {start} is after end {end} in {}",
            src.describe()
        )));
    }
    Ok(())
}

impl TrimDataSet {
    pub fn new(src: DataSetRef, start: usize, end: usize) -> Result<Self> {
        if src.rank() == 0 {
            return Err(DataSetError::rank(">= 1 (trim)", 0, src.describe()));
        }
        check_range(src.as_ref(), 0, src.len(), start, end)?;
        tracing::trace!(start, end, src = %src.describe(), "trim");
        let props = derive_properties(src.as_ref(), start, end)?;
        Ok(Self {
            src,
            start,
            end,
            props,
        })
    }

    pub fn source(&self) -> &DataSetRef {
        &self.src
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    #[inline]
    fn shifted(&self, idx: &[usize]) -> Shape {
        let mut s = Shape::from_slice(idx);
        s[0] += self.start;
        s
    }
}

fn derive_properties(src: &dyn QDataSet, start: usize, end: usize) -> Result<PropertyStore> {
    let rank = src.rank();
    let mut props = PropertyStore::new();
    for k in 0..rank {
        for name in [names::depend(k), names::bundle(k)] {
            let Some(d) = util::dataset_property(src, name) else {
                continue;
            };
            if k == 0 || d.rank() >= 2 {
                match crate::ops::trim(&d, start, end) {
                    Ok(t) => props.put(name, t.into())?,
                    Err(err) => {
                        tracing::debug!(
                            property = name,
                            %err,
                            "axis shorter than its dataset, dropping it"
                        );
                    }
                }
            } else {
                props.put(name, d.into())?;
            }
        }
        if let Some(b) = names::bins(k) {
            props.put_opt(b, src.property(b))?;
        }
    }
    propagate::transform_correlatives(src, &mut props, Rank0::Keep, |c| {
        crate::ops::trim(c, start, end)
    })?;
    propagate::put_join(&mut props, src)?;
    propagate::put_qube(&mut props, rank, util::is_qube(src))?;
    Ok(props)
}

impl QDataSet for TrimDataSet {
    fn rank(&self) -> usize {
        self.src.rank()
    }

    fn length(&self, outer: &[usize]) -> usize {
        if outer.is_empty() {
            self.end - self.start
        } else {
            self.src.length(&self.shifted(outer))
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
                idx[0] < self.end - self.start,
                "index {} out of bounds for dimension 0 of length {}",
                idx[0],
                self.end - self.start
            );
        }
        self.src.value(&self.shifted(idx))
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        propagate::resolve(&self.props, self.src.as_ref(), name, Inherit::RANGE)
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        propagate::resolve_at(
            &self.props,
            self.src.as_ref(),
            name,
            i + self.start,
            Inherit::RANGE,
        )
    }

    fn specialized_slice(&self, i: usize) -> Option<Result<DataSetRef>> {
        if i >= self.end - self.start {
            return Some(Err(DataSetError::bounds(
                i as i64,
                0,
                self.end - self.start,
                self.describe(),
            )));
        }
        Some(crate::ops::slice(&self.src, self.start + i))
    }

    fn specialized_trim(&self, start: usize, end: usize) -> Option<Result<DataSetRef>> {
        let len = self.end - self.start;
        if let Err(err) = check_range(self, 0, len, start, end) {
            return Some(Err(err));
        }
        Some(crate::ops::trim(
            &self.src,
            self.start + start,
            self.start + end,
        ))
    }
}
