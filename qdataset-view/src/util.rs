//! Shape and property helpers shared by every operator.

use smallvec::SmallVec;

use qdataset_traits::names;
use qdataset_traits::{DataSetRef, PropertyValue, QDataSet};

pub use qdataset_traits::describe;

/// Dimension lengths or strides. Rank never exceeds 4.
pub type Shape = SmallVec<[usize; 4]>;

/// Whether every row of `ds` has the same shape.
pub fn is_qube(ds: &dyn QDataSet) -> bool {
    ds.rank() <= 1 || bool_property(ds, names::QUBE) == Some(true)
}

/// The dimension lengths of `ds`, or `None` if it is not a qube.
///
/// An empty leading dimension reports zero for every deeper dimension.
pub fn qube_dims(ds: &dyn QDataSet) -> Option<Shape> {
    if !is_qube(ds) {
        return None;
    }
    let rank = ds.rank();
    let mut dims = Shape::new();
    let mut outer = Shape::new();
    for _ in 0..rank {
        let n = if dims.last() == Some(&0) {
            0
        } else {
            ds.length(&outer)
        };
        dims.push(n);
        outer.push(0);
    }
    Some(dims)
}

/// Every known property of `ds` that is set, in vocabulary order.
pub fn collect_properties(ds: &dyn QDataSet) -> Vec<(&'static str, PropertyValue)> {
    names::all()
        .filter_map(|name| ds.property(name).map(|v| (name, v)))
        .collect()
}

/// Whether the last dimension of `ds` is described by a bundle descriptor.
pub fn is_bundle(ds: &dyn QDataSet) -> bool {
    let rank = ds.rank();
    (1..=2).contains(&rank) && dataset_property(ds, names::bundle(rank - 1)).is_some()
}

/// Number of series bundled in the last dimension of `ds`.
pub fn bundle_length(ds: &dyn QDataSet) -> Option<usize> {
    if !is_bundle(ds) {
        return None;
    }
    match ds.rank() {
        1 => Some(ds.length(&[])),
        _ if ds.length(&[]) == 0 => Some(0),
        _ => Some(ds.length(&[0])),
    }
}

pub fn dataset_property(ds: &dyn QDataSet, name: &str) -> Option<DataSetRef> {
    ds.property(name).and_then(PropertyValue::into_dataset)
}

pub fn bool_property(ds: &dyn QDataSet, name: &str) -> Option<bool> {
    ds.property(name).and_then(|v| v.as_bool())
}

pub fn string_property(ds: &dyn QDataSet, name: &str) -> Option<String> {
    ds.property(name).and_then(|v| v.as_str().map(str::to_string))
}

/// Indices `0..dims` in row-major order, for walking small qubes in tests
/// and copies.
pub fn for_each_index(dims: &[usize], mut f: impl FnMut(&[usize])) {
    if dims.iter().any(|&n| n == 0) {
        return;
    }
    let rank = dims.len();
    let mut idx: Shape = SmallVec::from_elem(0, rank);
    loop {
        f(&idx);
        let mut d = rank;
        loop {
            if d == 0 {
                return;
            }
            d -= 1;
            idx[d] += 1;
            if idx[d] < dims[d] {
                break;
            }
            idx[d] = 0;
        }
    }
}
