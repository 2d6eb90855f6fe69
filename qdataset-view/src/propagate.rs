//! Property propagation rules shared by every view.
//!
//! A view derives its structural properties (`DEPEND_k`, `BUNDLE_k`,
//! `BINS_k`, correlatives, planes, contexts, `QUBE`, `JOIN_0`) once, at
//! construction, into its own [`PropertyStore`]. Every other name falls
//! through to the source at query time, filtered by an [`Inherit`] policy
//! saying which leading-dimension properties survive the operator.

use qdataset_traits::names;
use qdataset_traits::{DataSetRef, PropertyValue, QDataSet, Result};

use crate::generated::Rank0DataSet;
use crate::store::{Lookup, PropertyStore};
use crate::util;

/// Which non-structural properties a view reads through from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inherit {
    /// `RENDER_TYPE` only survives operators that keep the rank.
    pub rank_preserving: bool,
    /// Leading-dimension properties (`CADENCE`, `MONOTONIC`, `CACHE_TAG`)
    /// that still hold after the operator.
    pub dim0: &'static [&'static str],
}

impl Inherit {
    /// Rank changes, leading dimension untouched (slice or insert at dim >= 1).
    pub const INNER: Inherit = Inherit {
        rank_preserving: false,
        dim0: &names::DIM0_PROPERTIES,
    };
    /// Rank changes and the leading dimension goes away or moves.
    pub const RESHAPE: Inherit = Inherit {
        rank_preserving: false,
        dim0: &[],
    };
    /// Same rank, leading dimension kept in order but cut (trim).
    pub const RANGE: Inherit = Inherit {
        rank_preserving: true,
        dim0: &names::DIM0_PROPERTIES,
    };
    /// Same rank, leading dimension subsampled at a regular step (stride).
    pub const STRIDED: Inherit = Inherit {
        rank_preserving: true,
        dim0: &[names::CADENCE, names::MONOTONIC],
    };
    /// Same rank, leading dimension untouched (leaf trim).
    pub const SAME: Inherit = Inherit {
        rank_preserving: true,
        dim0: &names::DIM0_PROPERTIES,
    };
    /// Same rank, leading dimension reordered or subselected.
    pub const REORDER: Inherit = Inherit {
        rank_preserving: true,
        dim0: &[],
    };
}

/// Whether a non-structural `name` survives under `policy`.
pub fn passes(name: &str, policy: Inherit) -> bool {
    if names::is_structural(name) {
        return false;
    }
    if name == names::RENDER_TYPE && !policy.rank_preserving {
        return false;
    }
    !(names::is_dim0_property(name) && !policy.dim0.contains(&name))
}

/// The source's value of `name` if it survives under `policy`.
pub fn inherited(src: &dyn QDataSet, name: &str, policy: Inherit) -> Option<PropertyValue> {
    if passes(name, policy) {
        src.property(name)
    } else {
        None
    }
}

/// Resolve `name` on a view: own store first, then the filtered source.
#[inline]
pub fn resolve(
    props: &PropertyStore,
    src: &dyn QDataSet,
    name: &str,
    policy: Inherit,
) -> Option<PropertyValue> {
    props.resolve(name, || inherited(src, name, policy))
}

/// Per-element lookup on a view whose element `i` is element `src_index`
/// of the source's leading dimension.
///
/// Structural names resolve to the source element's own value only when
/// it differs from the source's global one, which the view re-derived.
pub fn resolve_at(
    props: &PropertyStore,
    src: &dyn QDataSet,
    name: &str,
    src_index: usize,
    policy: Inherit,
) -> Option<PropertyValue> {
    match props.lookup(name) {
        Lookup::Present(v) => Some(v.clone()),
        Lookup::Masked => None,
        Lookup::Absent if names::is_structural(name) => {
            let v = src.property_at(name, src_index)?;
            (src.property(name).as_ref() != Some(&v)).then_some(v)
        }
        Lookup::Absent if passes(name, policy) => src.property_at(name, src_index),
        Lookup::Absent => None,
    }
}

/// How rank-0 correlatives are carried into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank0 {
    /// A constant applies to every element; keep it as is.
    Keep,
    /// Broadcast to the given leading length, then apply the operator.
    Broadcast(usize),
}

/// Carry every correlative and plane of `src` through `op`.
///
/// Correlatives shaped like their owner are rewrapped with `op`; rank-0
/// correlatives follow `rank0`; anything else is dropped with a debug log.
pub fn transform_correlatives(
    src: &dyn QDataSet,
    props: &mut PropertyStore,
    rank0: Rank0,
    op: impl Fn(&DataSetRef) -> Result<DataSetRef>,
) -> Result<()> {
    let rank = src.rank();
    for name in names::correlatives() {
        let Some(ds) = util::dataset_property(src, name) else {
            continue;
        };
        let carried = if ds.rank() == rank && rank > 0 {
            op(&ds)
        } else if ds.rank() == 0 {
            match rank0 {
                Rank0::Keep => Ok(ds),
                Rank0::Broadcast(len) => {
                    let mut shape = crate::util::Shape::new();
                    shape.push(len);
                    crate::replicate::ReplicateDataSet::broadcast(ds, &shape)
                        .and_then(|b| op(&b))
                }
            }
        } else {
            tracing::debug!(
                property = name,
                rank = ds.rank(),
                owner_rank = rank,
                "dropping correlative whose rank does not match its owner"
            );
            continue;
        };
        match carried {
            Ok(v) => props.put(name, v.into())?,
            Err(err) => {
                tracing::debug!(property = name, %err, "dropping correlative the operator rejects");
            }
        }
    }
    Ok(())
}

/// Store `ctx` in the first `CONTEXT_k` slot neither `src` nor `props`
/// already uses.
pub fn add_context(src: &dyn QDataSet, props: &mut PropertyStore, ctx: DataSetRef) -> Result<()> {
    for name in names::contexts() {
        if props.contains(name) || src.property(name).is_some() {
            continue;
        }
        return props.put(name, ctx.into());
    }
    tracing::debug!(
        limit = names::MAX_CONTEXT_COUNT,
        "no free context slot, dropping context"
    );
    Ok(())
}

/// A scalar recording coordinate `index` of the removed axis `dep`.
///
/// A rank-1 axis yields its value at `index`; anything else yields the bare
/// index.
pub fn context_for(dep: Option<&DataSetRef>, index: usize) -> DataSetRef {
    match dep {
        Some(d) if d.rank() == 1 && index < d.len() => {
            Rank0DataSet::sample(d.as_ref(), &[index]).into_ref()
        }
        _ => Rank0DataSet::new(index as f64).into_ref(),
    }
}

/// Copy the per-series properties a bundle descriptor reports for column
/// `index` into `props`, masking the ones it does not set so that the
/// bundle's own labels do not leak into the column.
pub fn unbundle_properties(
    desc: &dyn QDataSet,
    index: usize,
    props: &mut PropertyStore,
) -> Result<()> {
    for name in names::UNBUNDLE_PROPERTIES {
        match desc.property_at(name, index) {
            Some(v) => props.put(name, v)?,
            None => props.mask(name)?,
        }
    }
    Ok(())
}

/// A rank-0 context naming the bundled column `index`.
pub fn bundle_context(desc: &dyn QDataSet, index: usize) -> DataSetRef {
    let mut ctx = Rank0DataSet::new(index as f64);
    for name in [names::NAME, names::LABEL] {
        if let Some(v) = desc.property_at(name, index) {
            let _ = qdataset_traits::MutablePropertyDataSet::put_property(&mut ctx, name, v);
        }
    }
    ctx.into_ref()
}

/// Set `QUBE` on a result of rank >= 2 when the construction keeps it
/// rectangular.
pub fn put_qube(props: &mut PropertyStore, rank: usize, qube: bool) -> Result<()> {
    if rank >= 2 && qube {
        props.put(names::QUBE, PropertyValue::Bool(true))?;
    }
    Ok(())
}

/// Carry the source's `JOIN_0` unless the result already has a `DEPEND_0`.
pub fn put_join(props: &mut PropertyStore, src: &dyn QDataSet) -> Result<()> {
    if props.get(names::DEPEND_0).is_some() {
        return Ok(());
    }
    props.put_opt(names::JOIN_0, src.property(names::JOIN_0))
}

/// Log a structural property that has no place in the result.
pub fn dropped(name: &str, op: &'static str) {
    tracing::debug!(property = name, op, "structural property dropped");
}
