//! Join: stack datasets of rank `R - 1` along a new leading dimension.

use std::sync::Arc;

use qdataset_traits::names;
use qdataset_traits::{
    Appendable, DataSetError, DataSetRef, MutablePropertyDataSet, PropertyValue, QDataSet, Result,
    MAX_RANK,
};

use crate::overlay::PropertyOverlay;
use crate::propagate;
use crate::store::PropertyStore;
use crate::util::{self, Shape};

/// A growable rank-`R` dataset whose element `i` is the `i`-th joined
/// rank-`R - 1` dataset.
///
/// `JOIN_0` is set until a `DEPEND_0` is given. `QUBE` is reported while
/// every element has the same shape. Names the join does not set itself
/// fall back to the elements: `property_at(name, i)` to element `i`, and
/// the dimension properties and inner axes to the first element.
#[derive(Debug, Clone)]
pub struct JoinDataSet {
    rank: usize,
    datasets: Vec<DataSetRef>,
    props: PropertyStore,
    shape: Option<Shape>,
    jagged: bool,
}

impl JoinDataSet {
    /// An empty join of rank `rank`, which must be in `1..=MAX_RANK`.
    pub fn new(rank: usize) -> Result<Self> {
        if !(1..=MAX_RANK).contains(&rank) {
            return Err(DataSetError::invalid(format!(
                "join rank must be in 1..={MAX_RANK}, got {rank}"
            )));
        }
        let mut props = PropertyStore::new();
        props.put(names::JOIN_0, PropertyValue::Bool(true))?;
        Ok(Self {
            rank,
            datasets: Vec::new(),
            props,
            shape: None,
            jagged: false,
        })
    }

    /// Join every dataset of `datasets`; the rank follows from the first.
    pub fn from_datasets(datasets: impl IntoIterator<Item = DataSetRef>) -> Result<Self> {
        let mut iter = datasets.into_iter().peekable();
        let first = iter
            .peek()
            .ok_or_else(|| DataSetError::invalid("cannot infer the rank of an empty join"))?;
        if first.rank() >= MAX_RANK {
            return Err(DataSetError::rank(
                format!("< {MAX_RANK} (join element)"),
                first.rank(),
                first.describe(),
            ));
        }
        let mut join = Self::new(first.rank() + 1)?;
        join.join_all(iter)?;
        Ok(join)
    }

    /// Append `ds` as the next element.
    ///
    /// A rank-0 element carrying a dataset `CONTEXT_0` also appends that
    /// context to this join's `DEPEND_0`, when `DEPEND_0` can grow and is
    /// held only here.
    pub fn join(&mut self, ds: DataSetRef) -> Result<()> {
        self.props.check_immutable("join")?;
        if ds.rank() + 1 != self.rank {
            return Err(DataSetError::rank(self.rank - 1, ds.rank(), ds.describe()));
        }
        if ds.rank() == 0 {
            if let Some(ctx) = util::dataset_property(ds.as_ref(), names::CONTEXT_0) {
                self.cascade(ctx)?;
            }
        }
        self.track_shape(ds.as_ref());
        tracing::trace!(element = %ds.describe(), index = self.datasets.len(), "join");
        self.datasets.push(ds);
        Ok(())
    }

    pub fn join_all(&mut self, datasets: impl IntoIterator<Item = DataSetRef>) -> Result<()> {
        datasets.into_iter().try_for_each(|ds| self.join(ds))
    }

    pub fn get(&self, i: usize) -> Option<&DataSetRef> {
        self.datasets.get(i)
    }

    pub fn datasets(&self) -> &[DataSetRef] {
        &self.datasets
    }

    fn cascade(&mut self, ctx: DataSetRef) -> Result<()> {
        let Some(mut dep) = util::dataset_property(self, names::DEPEND_0) else {
            return Ok(());
        };
        // Drop the store's handle so `dep` may be uniquely owned.
        self.props.remove(names::DEPEND_0)?;
        let appended = Arc::get_mut(&mut dep)
            .and_then(|d| d.as_appendable())
            .map(|axis| axis.append(ctx));
        if appended.is_none() {
            tracing::warn!(
                depend = %dep.describe(),
                "DEPEND_0 is shared or cannot grow, context not appended"
            );
        }
        self.props.put(names::DEPEND_0, dep.into())?;
        appended.unwrap_or(Ok(()))
    }

    fn track_shape(&mut self, ds: &dyn QDataSet) {
        if self.rank < 2 || self.jagged {
            return;
        }
        match (util::qube_dims(ds), &self.shape) {
            (None, _) => self.jagged = true,
            (Some(dims), None) => self.shape = Some(dims),
            (Some(dims), Some(shape)) => self.jagged = dims != *shape,
        }
    }

    fn is_qube(&self) -> bool {
        self.rank >= 2 && !self.jagged
    }

    fn fallback(&self, name: &str) -> Option<PropertyValue> {
        if name == names::QUBE {
            return self.is_qube().then_some(PropertyValue::Bool(true));
        }
        let first = self.datasets.first()?;
        let inner = if let Some(k) = names::depend_index(name) {
            Some(k.checked_sub(1).map(names::depend))
        } else if let Some(k) = names::bundle_index(name) {
            Some(k.checked_sub(1).map(names::bundle))
        } else {
            names::bins_index(name).map(|k| k.checked_sub(1).and_then(names::bins))
        };
        if let Some(inner) = inner {
            return inner
                .filter(|_| self.is_qube())
                .and_then(|n| first.property(n));
        }
        if names::is_dimension_property(name) && name != names::NAME {
            return first.property(name);
        }
        None
    }

    /// Element `i` with the join's indexed properties for `i` and the
    /// `DEPEND_0` coordinate as a context.
    fn labelled_element(
        &self,
        i: usize,
        element: &DataSetRef,
        dep: Option<DataSetRef>,
    ) -> Result<DataSetRef> {
        let mut props = PropertyStore::new();
        for (name, v) in self.props.indexed_for(i) {
            props.put(name, v.clone())?;
        }
        if let Some(dep) = dep {
            let ctx = propagate::context_for(Some(&dep), i);
            propagate::add_context(element.as_ref(), &mut props, ctx)?;
        }
        Ok(Arc::new(PropertyOverlay::with_store(element.clone(), props)))
    }

    fn trimmed(&self, start: usize, end: usize) -> Result<JoinDataSet> {
        crate::trim::check_range(self, 0, self.datasets.len(), start, end)?;
        let mut out = JoinDataSet::new(self.rank)?;
        for ds in &self.datasets[start..end] {
            out.track_shape(ds.as_ref());
            out.datasets.push(ds.clone());
        }
        for (name, v) in self.props.iter() {
            if name == names::JOIN_0 || name == names::CACHE_TAG {
                continue;
            }
            let carried = match (name, v) {
                (names::DEPEND_0 | names::BUNDLE_0, PropertyValue::DataSet(d)) => {
                    crate::ops::trim(d, start, end)?.into()
                }
                _ => v.clone(),
            };
            out.props.put(name, carried)?;
        }
        for i in start..end {
            for (name, v) in self.props.indexed_for(i) {
                out.props.put_at(name, i - start, v.clone())?;
            }
        }
        Ok(out)
    }
}

impl QDataSet for JoinDataSet {
    fn rank(&self) -> usize {
        self.rank
    }

    fn length(&self, outer: &[usize]) -> usize {
        match outer.split_first() {
            None => self.datasets.len(),
            Some((&i, rest)) => self.datasets[i].length(rest),
        }
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        assert_eq!(
            idx.len(),
            self.rank,
            "rank {} dataset accessed with {} indices",
            self.rank,
            idx.len()
        );
        if qdataset_traits::config::range_checking() {
            assert!(
                idx[0] < self.datasets.len(),
                "index {} out of bounds for dimension 0 of length {}",
                idx[0],
                self.datasets.len()
            );
        }
        self.datasets[idx[0]].value(&idx[1..])
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.props.resolve(name, || self.fallback(name))
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        if let Some(v) = self.props.get_at(name, i) {
            return Some(v.clone());
        }
        self.datasets
            .get(i)
            .and_then(|ds| ds.property(name))
            .or_else(|| self.property(name))
    }

    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        Some(self)
    }

    fn as_appendable(&mut self) -> Option<&mut dyn Appendable> {
        Some(self)
    }

    fn specialized_slice(&self, i: usize) -> Option<Result<DataSetRef>> {
        let Some(element) = self.datasets.get(i) else {
            return Some(Err(DataSetError::bounds(
                i as i64,
                0,
                self.datasets.len(),
                self.describe(),
            )));
        };
        let dep = util::dataset_property(self, names::DEPEND_0);
        if dep.is_none() && !self.props.has_indexed_for(i) {
            return Some(Ok(element.clone()));
        }
        Some(self.labelled_element(i, element, dep))
    }

    fn specialized_trim(&self, start: usize, end: usize) -> Option<Result<DataSetRef>> {
        Some(self.trimmed(start, end).map(|j| Arc::new(j) as DataSetRef))
    }
}

impl Appendable for JoinDataSet {
    fn append(&mut self, element: DataSetRef) -> Result<()> {
        self.join(element)
    }
}

impl_mutable_properties!(JoinDataSet);
