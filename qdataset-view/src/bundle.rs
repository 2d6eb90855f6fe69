//! Bundles: separately described series packed side by side.
//!
//! [`BundleDataSet`] puts each series in a column of the last dimension
//! with the series' shared axis leading. [`TailBundleDataSet`] does the
//! same for series of any rank up to 3, appending the bundle dimension
//! after the series' own dimensions. Either way the bundle dimension is
//! described by a [`BundleDescriptor`] whose `property_at(name, i)`
//! reports column `i`'s own properties.

use std::sync::Arc;

use qdataset_traits::names;
use qdataset_traits::{
    DataSetError, DataSetRef, MutablePropertyDataSet, PropertyValue, QDataSet, Result, MAX_RANK,
};

use crate::store::PropertyStore;
use crate::util::{self, Shape};

/// Column `i` of a bundle: a whole series, or column `inner` of a
/// two-dimensional series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Column {
    series: usize,
    inner: Option<usize>,
}

/// Describes the bundle dimension: one entry per column, each answering
/// property queries with the properties of the series it came from.
///
/// A descriptor is a rank-2 dataset of shape `[columns, 0]`; it carries
/// properties, not values. `DEPEND_k`, `BUNDLE_k` and `BINS_k` of column
/// `i` are the series' `DEPEND_{k + lead}` (and so on), where `lead` is the
/// number of series dimensions the bundle shares.
#[derive(Debug, Clone)]
pub struct BundleDescriptor {
    series: Vec<DataSetRef>,
    columns: Vec<Column>,
    lead: usize,
    props: PropertyStore,
}

impl BundleDescriptor {
    /// One column per series, sharing the first `lead` series dimensions.
    pub fn new(series: Vec<DataSetRef>, lead: usize) -> Self {
        let columns = (0..series.len())
            .map(|series| Column {
                series,
                inner: None,
            })
            .collect();
        Self {
            series,
            columns,
            lead,
            props: PropertyStore::new(),
        }
    }

    fn column_property(&self, name: &str, i: usize) -> Option<PropertyValue> {
        let col = self.columns.get(i)?;
        let series = self.series[col.series].as_ref();
        if let Some(inner) = col.inner {
            if let Some(desc) = util::dataset_property(series, names::BUNDLE_1) {
                return desc.property_at(name, inner);
            }
            if names::is_structural(name) {
                return None;
            }
            return series.property(name);
        }
        let shifted = |k: usize| (k + self.lead < MAX_RANK).then_some(k + self.lead);
        if let Some(k) = names::depend_index(name) {
            return shifted(k).and_then(|k| series.property(names::depend(k)));
        }
        if let Some(k) = names::bundle_index(name) {
            return shifted(k).and_then(|k| series.property(names::bundle(k)));
        }
        if let Some(k) = names::bins_index(name) {
            return names::bins(k + self.lead).and_then(|b| series.property(b));
        }
        if names::is_structural(name) {
            return None;
        }
        series.property(name)
    }
}

impl QDataSet for BundleDescriptor {
    fn rank(&self) -> usize {
        2
    }

    fn length(&self, outer: &[usize]) -> usize {
        if outer.is_empty() {
            self.columns.len()
        } else {
            0
        }
    }

    fn value(&self, idx: &[usize]) -> f64 {
        panic!(
            "bundle descriptor has no values, accessed at {:?} of {} columns",
            idx,
            self.columns.len()
        )
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.props.get(name).cloned()
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        if let Some(v) = self.props.get_at(name, i) {
            return Some(v.clone());
        }
        self.column_property(name, i)
    }

    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        Some(self)
    }
}

impl_mutable_properties!(BundleDescriptor);

/// Series and per-column overrides shared by both bundle kinds.
#[derive(Debug, Clone, Default)]
struct Bundled {
    series: Vec<DataSetRef>,
    columns: Vec<Column>,
    column_props: PropertyStore,
}

impl Bundled {
    fn descriptor(&self, lead: usize) -> DataSetRef {
        let mut props = self.column_props.unsealed();
        props.make_immutable();
        Arc::new(BundleDescriptor {
            series: self.series.clone(),
            columns: self.columns.clone(),
            lead,
            props,
        })
    }

    fn push(&mut self, ds: DataSetRef, inner: Option<usize>) {
        let series = self.series.len();
        match inner {
            None => self.columns.push(Column {
                series,
                inner: None,
            }),
            Some(n) => self.columns.extend((0..n).map(|c| Column {
                series,
                inner: Some(c),
            })),
        }
        self.series.push(ds);
    }

    fn column(&self, i: usize, context: &dyn QDataSet) -> Result<Column> {
        self.columns.get(i).copied().ok_or_else(|| {
            let dim = context.rank() - 1;
            DataSetError::bounds(i as i64, dim, self.columns.len(), context.describe())
        })
    }

    fn put_column_property(
        &mut self,
        column: usize,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        self.column_props.put_at(name, column, value)
    }
}

/// Series bundled along a new last dimension, sharing their leading one.
///
/// Rank-0 series give a rank-1 bundle (`BUNDLE_0`); rank-1 series give a
/// rank-2 `[n, columns]` bundle (`BUNDLE_1`); a rank-2 qube series adds
/// one column per inner element. All series of a rank-2 bundle must have
/// the same length `n`. `DEPEND_0` comes from the first series.
#[derive(Debug, Clone, Default)]
pub struct BundleDataSet {
    rank: Option<usize>,
    len: usize,
    bundled: Bundled,
    descriptor: Option<DataSetRef>,
    props: PropertyStore,
}

impl BundleDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle every series of `series`, in order.
    pub fn from_series(series: impl IntoIterator<Item = DataSetRef>) -> Result<Self> {
        let mut b = Self::new();
        for s in series {
            b.bundle(s)?;
        }
        Ok(b)
    }

    /// Append `ds` as the next column (or columns).
    pub fn bundle(&mut self, ds: DataSetRef) -> Result<()> {
        self.props.check_immutable("bundle")?;
        let rank = match (self.rank, ds.rank()) {
            (None | Some(1), 0) => 1,
            (None | Some(2), 1 | 2) => 2,
            (Some(rank), actual) => {
                let expected = if rank == 1 { "0" } else { "1 or 2" };
                return Err(DataSetError::rank(expected, actual, ds.describe()));
            }
            (None, actual) => {
                return Err(DataSetError::rank("0..=2", actual, ds.describe()));
            }
        };
        let inner = if ds.rank() == 2 {
            let dims = util::qube_dims(ds.as_ref()).ok_or_else(|| {
                DataSetError::invalid(format!(
                    "two-dimensional series must be a qube to be bundled, got {}",
                    ds.describe()
                ))
            })?;
            Some(dims[1])
        } else {
            None
        };
        if rank == 2 {
            let n = ds.len();
            if self.rank.is_some() && n != self.len {
                return Err(DataSetError::invalid(format!(
                    "cannot bundle {} with series of length {}",
                    ds.describe(),
                    self.len
                )));
            }
            self.len = n;
        }
        tracing::trace!(series = %ds.describe(), "bundle");
        self.rank = Some(rank);
        self.bundled.push(ds, inner);
        self.refresh();
        Ok(())
    }

    /// Set `name` for column `column` only; it overrides the series' own
    /// value on the descriptor.
    pub fn put_column_property(
        &mut self,
        column: usize,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        self.props.check_immutable(name)?;
        self.bundled.put_column_property(column, name, value)?;
        self.refresh();
        Ok(())
    }

    /// Column `i` as a dataset of its own: the bundled series itself, or a
    /// slice of a two-dimensional series.
    pub fn unbundle(&self, i: usize) -> Result<DataSetRef> {
        let col = self.bundled.column(i, self)?;
        let series = &self.bundled.series[col.series];
        match col.inner {
            None => Ok(series.clone()),
            Some(c) => crate::ops::slice_dim(series, 1, c),
        }
    }

    pub fn series(&self) -> &[DataSetRef] {
        &self.bundled.series
    }

    fn refresh(&mut self) {
        let lead = self.rank() - 1;
        self.descriptor = Some(self.bundled.descriptor(lead));
    }

    fn fallback(&self, name: &str) -> Option<PropertyValue> {
        let rank = self.rank();
        if name == names::bundle(rank - 1) {
            return self.descriptor.clone().map(PropertyValue::DataSet);
        }
        match name {
            names::QUBE if rank == 2 => Some(PropertyValue::Bool(true)),
            names::DEPEND_0 if rank == 2 => self.bundled.series.first()?.property(names::DEPEND_0),
            _ => None,
        }
    }
}

impl QDataSet for BundleDataSet {
    fn rank(&self) -> usize {
        self.rank.unwrap_or(1)
    }

    fn length(&self, outer: &[usize]) -> usize {
        if self.rank() == 2 && outer.is_empty() {
            self.len
        } else {
            self.bundled.columns.len()
        }
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        let rank = self.rank();
        assert_eq!(
            idx.len(),
            rank,
            "rank {} dataset accessed with {} indices",
            rank,
            idx.len()
        );
        let j = idx[rank - 1];
        if qdataset_traits::config::range_checking() {
            assert!(
                j < self.bundled.columns.len(),
                "index {} out of bounds for dimension {} of length {}",
                j,
                rank - 1,
                self.bundled.columns.len()
            );
        }
        let col = self.bundled.columns[j];
        let series = &self.bundled.series[col.series];
        match (rank, col.inner) {
            (1, _) => series.value(&[]),
            (_, None) => series.value(&[idx[0]]),
            (_, Some(c)) => series.value(&[idx[0], c]),
        }
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.props.resolve(name, || self.fallback(name))
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        self.props
            .get_at(name, i)
            .cloned()
            .or_else(|| self.property(name))
    }

    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        Some(self)
    }

    fn specialized_slice(&self, i: usize) -> Option<Result<DataSetRef>> {
        if self.rank() != 1 || self.bundled.column_props.has_indexed_for(i) {
            return None;
        }
        Some(self.unbundle(i))
    }
}

impl_mutable_properties!(BundleDataSet);

/// Series of rank 1 to 3 and identical shape, bundled along a new last
/// dimension: `value(i.., s) = series[s].value(i..)`.
///
/// `DEPEND_k` of the series' dimensions come from the first series and the
/// new dimension is described by `BUNDLE_r`, `r` being the series rank.
#[derive(Debug, Clone, Default)]
pub struct TailBundleDataSet {
    dims: Option<Shape>,
    bundled: Bundled,
    descriptor: Option<DataSetRef>,
    props: PropertyStore,
}

impl TailBundleDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_series(series: impl IntoIterator<Item = DataSetRef>) -> Result<Self> {
        let mut b = Self::new();
        for s in series {
            b.bundle(s)?;
        }
        Ok(b)
    }

    pub fn bundle(&mut self, ds: DataSetRef) -> Result<()> {
        self.props.check_immutable("bundle")?;
        if !(1..MAX_RANK).contains(&ds.rank()) {
            return Err(DataSetError::rank(
                format!("1..{MAX_RANK} (tail-bundled series)"),
                ds.rank(),
                ds.describe(),
            ));
        }
        let dims = util::qube_dims(ds.as_ref()).ok_or_else(|| {
            DataSetError::invalid(format!(
                "tail-bundled series must be a qube, got {}",
                ds.describe()
            ))
        })?;
        if let Some(shape) = &self.dims {
            if *shape != dims {
                return Err(DataSetError::invalid(format!(
                    "cannot bundle {} with series of shape {:?}",
                    ds.describe(),
                    shape.as_slice()
                )));
            }
        }
        tracing::trace!(series = %ds.describe(), "tail bundle");
        let lead = dims.len();
        self.dims = Some(dims);
        self.bundled.push(ds, None);
        self.descriptor = Some(self.bundled.descriptor(lead));
        Ok(())
    }

    pub fn put_column_property(
        &mut self,
        column: usize,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        self.props.check_immutable(name)?;
        self.bundled.put_column_property(column, name, value)?;
        self.descriptor = Some(self.bundled.descriptor(self.rank() - 1));
        Ok(())
    }

    /// The `i`-th bundled series.
    pub fn unbundle(&self, i: usize) -> Result<DataSetRef> {
        let col = self.bundled.column(i, self)?;
        Ok(self.bundled.series[col.series].clone())
    }

    fn fallback(&self, name: &str) -> Option<PropertyValue> {
        let lead = self.rank() - 1;
        if name == names::bundle(lead) {
            return self.descriptor.clone().map(PropertyValue::DataSet);
        }
        if name == names::QUBE {
            return Some(PropertyValue::Bool(true));
        }
        let first = self.bundled.series.first()?;
        match names::depend_index(name).or_else(|| names::bins_index(name)) {
            Some(k) if k < lead => first.property(name),
            _ => None,
        }
    }
}

impl QDataSet for TailBundleDataSet {
    fn rank(&self) -> usize {
        self.dims.as_ref().map_or(2, |d| d.len() + 1)
    }

    fn length(&self, outer: &[usize]) -> usize {
        match &self.dims {
            Some(dims) if outer.len() < dims.len() => dims[outer.len()],
            None if outer.is_empty() => 0,
            _ => self.bundled.columns.len(),
        }
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        let rank = self.rank();
        assert_eq!(
            idx.len(),
            rank,
            "rank {} dataset accessed with {} indices",
            rank,
            idx.len()
        );
        self.bundled.series[idx[rank - 1]].value(&idx[..rank - 1])
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.props.resolve(name, || self.fallback(name))
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        self.props
            .get_at(name, i)
            .cloned()
            .or_else(|| self.property(name))
    }

    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        Some(self)
    }
}

impl_mutable_properties!(TailBundleDataSet);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::DataSetOps;
    use crate::{DDataSet, Rank0DataSet, TagGenDataSet};
    use approx::assert_relative_eq;
    use qdataset_traits::Units;

    fn series(values: &[f64], label: &str, units: &str) -> DataSetRef {
        let mut d = DDataSet::rank1(values.to_vec());
        d.put_property(names::LABEL, label.into()).unwrap();
        d.put_property(names::UNITS, Units::new(units).into()).unwrap();
        Arc::new(d)
    }

    fn descriptor(ds: &dyn QDataSet, name: &str) -> DataSetRef {
        util::dataset_property(ds, name).unwrap()
    }

    #[test]
    fn test_bundle_rank1_series() {
        let mut x = DDataSet::rank1(vec![1.0, 2.0, 3.0]);
        let t: DataSetRef = Arc::new(TagGenDataSet::new(3, 1.0, 0.0, Units::new("s")));
        x.put_property(names::DEPEND_0, t.clone().into()).unwrap();
        x.put_property(names::LABEL, "Bx".into()).unwrap();
        let b = BundleDataSet::from_series([
            Arc::new(x) as DataSetRef,
            series(&[4.0, 5.0, 6.0], "T", "K"),
        ])
        .unwrap();
        assert_eq!(b.rank(), 2);
        assert_eq!(b.len(), 3);
        assert_eq!(b.length(&[0]), 2);
        assert_relative_eq!(b.value(&[2, 1]), 6.0);
        assert_eq!(b.property(names::QUBE), Some(true.into()));
        assert_eq!(b.property(names::DEPEND_0), Some(t.into()));
        let desc = descriptor(&b, names::BUNDLE_1);
        assert_eq!(desc.len(), 2);
        assert_eq!(desc.property_at(names::LABEL, 0), Some("Bx".into()));
        assert_eq!(desc.property_at(names::UNITS, 1), Some(Units::new("K").into()));
        assert_eq!(desc.property_at(names::DEPEND_0, 0), None);
        assert_eq!(b.describe(), "dataSet[3,2]");
    }

    #[test]
    fn test_bundle_length_mismatch() {
        let mut b = BundleDataSet::new();
        b.bundle(series(&[1.0, 2.0], "a", "m")).unwrap();
        assert!(matches!(
            b.bundle(series(&[1.0, 2.0, 3.0], "b", "m")),
            Err(DataSetError::InvalidConstruction(_))
        ));
        assert!(matches!(
            b.bundle(Rank0DataSet::new(1.0).into_ref()),
            Err(DataSetError::RankMismatch { actual: 0, .. })
        ));
        assert_eq!(b.length(&[0]), 1);
    }

    #[test]
    fn test_unbundle_recovers_series() {
        let a = series(&[1.0, 2.0], "a", "m");
        let c = series(&[3.0, 4.0], "c", "s");
        let b = BundleDataSet::from_series([a.clone(), c.clone()]).unwrap();
        let b: DataSetRef = Arc::new(b);
        let col = b.unbundle(1).unwrap();
        for i in 0..2 {
            assert_relative_eq!(col.value(&[i]), c.value(&[i]));
        }
        assert_eq!(col.property(names::UNITS), Some(Units::new("s").into()));
        assert_eq!(col.property(names::LABEL), Some("c".into()));
    }

    #[test]
    fn test_column_override_wins_over_series() {
        let mut b = BundleDataSet::from_series([series(&[1.0], "a", "m")]).unwrap();
        b.put_column_property(0, names::LABEL, "alpha".into()).unwrap();
        let desc = descriptor(&b, names::BUNDLE_1);
        assert_eq!(desc.property_at(names::LABEL, 0), Some("alpha".into()));
        assert_eq!(desc.property_at(names::UNITS, 0), Some(Units::new("m").into()));
    }

    #[test]
    fn test_bundle_of_scalars() {
        let mut x = Rank0DataSet::new(1.5);
        x.put_property(names::NAME, "x".into()).unwrap();
        let x = x.into_ref();
        let y = Rank0DataSet::new(2.5).into_ref();
        let b = BundleDataSet::from_series([x.clone(), y]).unwrap();
        assert_eq!(b.rank(), 1);
        assert_eq!(b.len(), 2);
        assert_relative_eq!(b.value(&[1]), 2.5);
        assert!(Arc::ptr_eq(&b.unbundle(0).unwrap(), &x));
        let b: DataSetRef = Arc::new(b);
        assert!(Arc::ptr_eq(&b.slice(0).unwrap(), &x));
        let desc = descriptor(b.as_ref(), names::BUNDLE_0);
        assert_eq!(desc.property_at(names::NAME, 0), Some("x".into()));
    }

    #[test]
    fn test_two_dimensional_series_spread_over_columns() {
        let v: DataSetRef =
            Arc::new(DDataSet::from_fn(&[2, 3], |i| (i[0] * 10 + i[1]) as f64).unwrap());
        let b = BundleDataSet::from_series([series(&[7.0, 8.0], "n", "cc"), v]).unwrap();
        assert_eq!(b.length(&[0]), 4);
        assert_relative_eq!(b.value(&[1, 0]), 8.0);
        assert_relative_eq!(b.value(&[1, 3]), 12.0);
        let col = b.unbundle(2).unwrap();
        assert_relative_eq!(col.value(&[1]), 11.0);
        let jagged = crate::JoinDataSet::from_datasets([
            series(&[1.0], "a", "m"),
            series(&[1.0, 2.0], "b", "m"),
        ])
        .unwrap();
        let mut b = BundleDataSet::new();
        assert!(b.bundle(Arc::new(jagged)).is_err());
    }

    #[test]
    fn test_descriptor_shifts_axes_by_lead() {
        let mut v = DDataSet::zeros(&[2, 3]).unwrap();
        let e: DataSetRef = Arc::new(DDataSet::rank1(vec![1.0, 2.0, 3.0]));
        v.put_property(names::DEPEND_1, e.clone().into()).unwrap();
        let desc = BundleDescriptor::new(vec![Arc::new(v) as DataSetRef], 1);
        assert_eq!(desc.property_at(names::DEPEND_0, 0), Some(e.into()));
        assert_eq!(desc.property_at(names::DEPEND_3, 0), None);
        assert_eq!(desc.property_at(names::LABEL, 1), None);
    }

    #[test]
    fn test_rank1_bundle_descriptor_does_not_shift_axes() {
        let axis: DataSetRef = Arc::new(DDataSet::rank1(vec![0.5, 1.5]));
        let mut a = Rank0DataSet::new(1.0);
        a.put_property(names::DEPEND_0, axis.clone().into()).unwrap();
        let other: DataSetRef = Arc::new(DDataSet::rank1(vec![9.0]));
        a.put_property(names::DEPEND_1, other.into()).unwrap();
        let b = BundleDataSet::from_series([a.into_ref(), Rank0DataSet::new(2.0).into_ref()])
            .unwrap();
        assert_eq!(b.rank(), 1);
        let desc = descriptor(&b, names::BUNDLE_0);
        assert_eq!(desc.property_at(names::DEPEND_0, 0), Some(axis.into()));
        assert_eq!(desc.property_at(names::DEPEND_0, 1), None);

        let mut x = DDataSet::rank1(vec![1.0, 2.0]);
        let e: DataSetRef = Arc::new(DDataSet::rank1(vec![3.0]));
        x.put_property(names::DEPEND_1, e.clone().into()).unwrap();
        let b = BundleDataSet::from_series([Arc::new(x) as DataSetRef]).unwrap();
        let desc = descriptor(&b, names::BUNDLE_1);
        assert_eq!(desc.property_at(names::DEPEND_0, 0), Some(e.into()));
    }

    #[test]
    fn test_tail_bundle() {
        let mut a = DDataSet::from_fn(&[2, 3], |i| (i[0] * 3 + i[1]) as f64).unwrap();
        let e: DataSetRef = Arc::new(DDataSet::rank1(vec![1.0, 2.0, 3.0]));
        a.put_property(names::DEPEND_1, e.clone().into()).unwrap();
        a.put_property(names::LABEL, "a".into()).unwrap();
        let c = DDataSet::from_fn(&[2, 3], |i| -((i[0] * 3 + i[1]) as f64)).unwrap();
        let series: Vec<DataSetRef> = vec![Arc::new(a), Arc::new(c)];
        let t = TailBundleDataSet::from_series(series).unwrap();
        assert_eq!(t.rank(), 3);
        assert_eq!(t.length(&[1, 2]), 2);
        assert_relative_eq!(t.value(&[1, 2, 1]), -5.0);
        assert_eq!(t.property(names::DEPEND_1), Some(e.into()));
        assert_eq!(t.property(names::QUBE), Some(true.into()));
        let desc = descriptor(&t, names::BUNDLE_2);
        assert_eq!(desc.property_at(names::LABEL, 0), Some("a".into()));
        assert_eq!(t.describe(), "dataSet[2,3,2]");

        let mut t = t;
        assert!(t.bundle(Arc::new(DDataSet::zeros(&[3, 2]).unwrap())).is_err());
        assert!(t.bundle(Rank0DataSet::new(0.0).into_ref()).is_err());
    }

    #[test]
    fn test_sealed_bundle() {
        let mut b = BundleDataSet::from_series([series(&[1.0], "a", "m")]).unwrap();
        b.make_immutable();
        assert!(matches!(
            b.bundle(series(&[2.0], "b", "m")),
            Err(DataSetError::Immutable(_))
        ));
        assert!(b.put_column_property(0, names::LABEL, "x".into()).is_err());
        assert_eq!(b.length(&[0]), 1);
    }
}
