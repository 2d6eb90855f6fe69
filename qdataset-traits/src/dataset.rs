//! The dataset capability contract.

use std::fmt;
use std::sync::Arc;

use crate::error::{DataSetError, Result};
use crate::names;
use crate::value::PropertyValue;

/// Shared handle to any dataset. Views hold their sources through this
/// handle and never copy data.
pub type DataSetRef = Arc<dyn QDataSet>;

/// A self-describing array of rank 0 to 4.
///
/// Lengths and values are addressed with index slices:
/// - `length(&[])` is the length of dimension 0,
/// - `length(&[i])` is the length of dimension 1 in row `i`, and so on,
/// - `value(idx)` takes exactly `rank()` indices.
///
/// Datasets that are not qubes (see [`names::QUBE`]) may have rows of
/// different lengths, so deeper lengths must always be asked per row.
///
/// Everything reachable through `&self` is safe for concurrent readers.
/// Mutation capabilities are reachable only through `&mut self`, so a
/// dataset shared behind an [`Arc`] cannot be written unless the caller
/// holds the only reference.
pub trait QDataSet: Send + Sync + fmt::Debug {
    fn rank(&self) -> usize;

    /// Length of dimension `outer.len()` at the row addressed by `outer`.
    fn length(&self, outer: &[usize]) -> usize;

    /// The value at `idx`.
    ///
    /// # Panics
    /// Panics if `idx.len() != rank()`, and, while range checking is
    /// enabled, if an index is out of bounds. Use [`QDataSet::try_value`]
    /// for a checked variant.
    fn value(&self, idx: &[usize]) -> f64;

    /// The property `name`, or `None` if it is not set.
    fn property(&self, name: &str) -> Option<PropertyValue>;

    /// The property `name` for element `i` of dimension 0. Defaults to the
    /// global property when no per-element value exists.
    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        let _ = i;
        self.property(name)
    }

    /// Checked value access, independent of the range-checking toggle.
    fn try_value(&self, idx: &[usize]) -> Result<f64> {
        check_indices(self, idx)?;
        Ok(self.value(idx))
    }

    /// Length of dimension 0.
    fn len(&self) -> usize {
        self.length(&[])
    }

    fn is_empty(&self) -> bool {
        self.rank() > 0 && self.len() == 0
    }

    /// Short human readable description: name and shape.
    fn describe(&self) -> String {
        describe(self)
    }

    /// Write access to values, if this dataset supports it.
    fn as_writable(&mut self) -> Option<&mut dyn WritableDataSet> {
        None
    }

    /// Write access to properties, if this dataset supports it.
    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        None
    }

    /// Append access, if this dataset grows by stacking elements.
    fn as_appendable(&mut self) -> Option<&mut dyn Appendable> {
        None
    }

    /// A cheaper slice than the generic view, when the dataset knows one.
    /// `None` means "use the generic slice view".
    fn specialized_slice(&self, i: usize) -> Option<Result<DataSetRef>> {
        let _ = i;
        None
    }

    /// A cheaper trim than the generic view, when the dataset knows one.
    fn specialized_trim(&self, start: usize, end: usize) -> Option<Result<DataSetRef>> {
        let _ = (start, end);
        None
    }
}

/// Value writes, mirroring [`QDataSet::value`].
pub trait WritableDataSet: QDataSet {
    fn put_value(&mut self, idx: &[usize], value: f64) -> Result<()>;
}

/// Property writes and sealing.
pub trait MutablePropertyDataSet: QDataSet {
    /// Set `name`. A value of the wrong kind for a known name is logged,
    /// not rejected.
    fn put_property(&mut self, name: &str, value: PropertyValue) -> Result<()>;

    /// Set `name` for element `index` of dimension 0.
    fn put_property_at(&mut self, name: &str, index: usize, value: PropertyValue) -> Result<()>;

    fn remove_property(&mut self, name: &str) -> Result<()>;

    /// Seal the dataset. Every later write fails with
    /// [`DataSetError::Immutable`].
    fn make_immutable(&mut self);

    fn is_immutable(&self) -> bool;
}

/// Datasets that grow along dimension 0 by stacking elements.
pub trait Appendable: QDataSet {
    fn append(&mut self, element: DataSetRef) -> Result<()>;
}

/// Validate `idx` against the rank and lengths of `ds`.
pub fn check_indices<D: QDataSet + ?Sized>(ds: &D, idx: &[usize]) -> Result<()> {
    let rank = ds.rank();
    if idx.len() != rank {
        return Err(DataSetError::rank(rank, idx.len(), ds.describe()));
    }
    for dim in 0..rank {
        let length = ds.length(&idx[..dim]);
        if idx[dim] >= length {
            return Err(DataSetError::bounds(
                idx[dim] as i64,
                dim,
                length,
                ds.describe(),
            ));
        }
    }
    Ok(())
}

/// `name[n0,n1,...]`, with `*` for dimensions whose length varies by row.
pub fn describe<D: QDataSet + ?Sized>(ds: &D) -> String {
    let name = ds
        .property(names::NAME)
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "dataSet".to_string());
    let rank = ds.rank();
    if rank == 0 {
        return name;
    }
    let qube = rank == 1 || ds.property(names::QUBE).and_then(|v| v.as_bool()) == Some(true);
    let mut dims = Vec::with_capacity(rank);
    let mut outer = Vec::with_capacity(rank);
    for _ in 0..rank {
        let n = ds.length(&outer);
        dims.push(n.to_string());
        if n == 0 {
            break;
        }
        outer.push(0);
        if !qube {
            break;
        }
    }
    while dims.len() < rank {
        dims.push("*".to_string());
    }
    format!("{name}[{}]", dims.join(","))
}
