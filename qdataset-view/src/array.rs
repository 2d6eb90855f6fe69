//! Array-backed datasets.
//!
//! [`ArrayDataSet`] is the leaf every view chain bottoms out in: a flat,
//! row-major, homogeneously typed buffer of rank 0 to 4 with its own
//! property store. It is mutable until [`ArrayDataSet::make_immutable`];
//! afterwards it is shared read-only and [`ArrayDataSet::back_copy`] is
//! the only way to get a writable copy.

use std::fmt;
use std::ops::{Index, IndexMut};

use num_traits::AsPrimitive;
use smallvec::SmallVec;

use qdataset_traits::{config, names, MAX_RANK};
use qdataset_traits::{
    DataSetError, MutablePropertyDataSet, PropertyValue, QDataSet, Result, WritableDataSet,
};

use crate::store::PropertyStore;
use crate::util::{self, Shape};

/// Runtime tag of the element type of a backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

/// Element types a backing buffer may hold. Values convert to and from
/// `f64` with saturating `as` semantics.
pub trait Element: Copy + Default + Send + Sync + fmt::Debug + 'static {
    const TYPE: ElementType;
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_element {
    ($t:ty, $tag:ident) => {
        impl Element for $t {
            const TYPE: ElementType = ElementType::$tag;

            #[inline]
            fn to_f64(self) -> f64 {
                self.as_()
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v.as_()
            }
        }
    };
}

impl_element!(i8, Byte);
impl_element!(i16, Short);
impl_element!(i32, Int);
impl_element!(i64, Long);
impl_element!(f32, Float);
impl_element!(f64, Double);

/// Row-major strides (last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Shape {
    let rank = dims.len();
    let mut strides: Shape = SmallVec::from_elem(1, rank);
    for i in (0..rank.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

/// Dense dataset backed by a flat buffer.
#[derive(Clone)]
pub struct ArrayDataSet<T: Element> {
    data: Vec<T>,
    dims: Shape,
    strides: Shape,
    props: PropertyStore,
}

pub type BDataSet = ArrayDataSet<i8>;
pub type SDataSet = ArrayDataSet<i16>;
pub type IDataSet = ArrayDataSet<i32>;
pub type LDataSet = ArrayDataSet<i64>;
pub type FDataSet = ArrayDataSet<f32>;
pub type DDataSet = ArrayDataSet<f64>;

impl<T: Element> fmt::Debug for ArrayDataSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayDataSet")
            .field("type", &T::TYPE)
            .field("dims", &self.dims)
            .field("immutable", &self.props.is_immutable())
            .finish()
    }
}

fn check_dims(dims: &[usize]) -> Result<()> {
    if dims.len() > MAX_RANK {
        return Err(DataSetError::invalid(format!(
            "rank {} exceeds the maximum rank {MAX_RANK}",
            dims.len()
        )));
    }
    Ok(())
}

impl<T: Element> ArrayDataSet<T> {
    /// A zero-filled dataset of the given shape.
    pub fn zeros(dims: &[usize]) -> Result<Self> {
        check_dims(dims)?;
        let total: usize = dims.iter().product();
        Ok(Self::from_parts(vec![T::default(); total], dims))
    }

    /// Wrap `data` (row-major) with the given shape.
    pub fn from_vec(data: Vec<T>, dims: &[usize]) -> Result<Self> {
        check_dims(dims)?;
        let total: usize = dims.iter().product();
        if data.len() != total {
            return Err(DataSetError::invalid(format!(
                "buffer of {} elements cannot have shape {dims:?}",
                data.len()
            )));
        }
        Ok(Self::from_parts(data, dims))
    }

    /// Rank-1 dataset over `data`.
    pub fn rank1(data: Vec<T>) -> Self {
        let n = data.len();
        Self::from_parts(data, &[n])
    }

    pub fn rank2(data: Vec<T>, n0: usize, n1: usize) -> Result<Self> {
        Self::from_vec(data, &[n0, n1])
    }

    pub fn rank3(data: Vec<T>, n0: usize, n1: usize, n2: usize) -> Result<Self> {
        Self::from_vec(data, &[n0, n1, n2])
    }

    pub fn rank4(data: Vec<T>, n0: usize, n1: usize, n2: usize, n3: usize) -> Result<Self> {
        Self::from_vec(data, &[n0, n1, n2, n3])
    }

    /// Rank-0 dataset holding `value`.
    pub fn scalar(value: T) -> Self {
        Self::from_parts(vec![value], &[])
    }

    /// Values produced by `f`, called in row-major order.
    pub fn from_fn(dims: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Result<Self> {
        check_dims(dims)?;
        let total: usize = dims.iter().product();
        let rank = dims.len();
        let mut data = Vec::with_capacity(total);
        let mut idx: Shape = SmallVec::from_elem(0, rank);
        for _ in 0..total {
            data.push(f(&idx));
            for d in (0..rank).rev() {
                idx[d] += 1;
                if idx[d] < dims[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        Ok(Self::from_parts(data, dims))
    }

    fn from_parts(data: Vec<T>, dims: &[usize]) -> Self {
        let mut props = PropertyStore::new();
        if dims.len() > 1 {
            // Only fails on sealed stores.
            let _ = props.put(names::QUBE, PropertyValue::Bool(true));
        }
        Self {
            data,
            dims: SmallVec::from_slice(dims),
            strides: row_major_strides(dims),
            props,
        }
    }

    /// Materialise `src` into a new buffer, copying its properties.
    ///
    /// `src` must be a qube. Values are read row-parallel when the
    /// `parallel` feature is enabled.
    pub fn copy(src: &dyn QDataSet) -> Result<Self> {
        let dims = util::qube_dims(src).ok_or_else(|| {
            DataSetError::invalid(format!("cannot copy non-qube dataset {}", src.describe()))
        })?;
        let total: usize = dims.iter().product();
        let mut data = vec![T::default(); total];
        fill(&mut data, &dims, src);
        let mut out = Self::from_parts(data, &dims);
        out.copy_properties(src)?;
        Ok(out)
    }

    /// Copy every known property of `src` into this dataset.
    pub fn copy_properties(&mut self, src: &dyn QDataSet) -> Result<()> {
        for (name, value) in util::collect_properties(src) {
            self.props.put(name, value)?;
        }
        Ok(())
    }

    /// Defensive copy: same values and properties, new buffer, mutable.
    pub fn back_copy(&self) -> Self {
        Self {
            data: self.data.clone(),
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            props: self.props.unsealed(),
        }
    }

    pub fn element_type(&self) -> ElementType {
        T::TYPE
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable buffer access. Fails once sealed.
    pub fn data_mut(&mut self) -> Result<&mut [T]> {
        self.props.check_immutable("values")?;
        Ok(&mut self.data)
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.props
    }

    #[inline]
    fn flat_index(&self, idx: &[usize]) -> usize {
        assert_eq!(
            idx.len(),
            self.dims.len(),
            "rank {} dataset accessed with {} indices",
            self.dims.len(),
            idx.len()
        );
        let check = config::range_checking();
        let mut flat = 0;
        for (d, &i) in idx.iter().enumerate() {
            if check {
                assert!(
                    i < self.dims[d],
                    "index {} out of bounds for dimension {} of length {}",
                    i,
                    d,
                    self.dims[d]
                );
            }
            flat += i * self.strides[d];
        }
        flat
    }

    /// Element at `idx`.
    #[inline]
    pub fn get(&self, idx: &[usize]) -> T {
        self.data[self.flat_index(idx)]
    }

    /// Checked element access.
    pub fn try_get(&self, idx: &[usize]) -> Result<T> {
        qdataset_traits::check_indices(self, idx)?;
        Ok(self.get(idx))
    }

    /// Store `value` at `idx`. Fails once sealed or on bad indices.
    pub fn set(&mut self, idx: &[usize], value: T) -> Result<()> {
        self.props.check_immutable("values")?;
        qdataset_traits::check_indices(self, idx)?;
        let flat = self.flat_index(idx);
        self.data[flat] = value;
        Ok(())
    }

    pub fn make_immutable(&mut self) {
        self.props.make_immutable();
    }

    pub fn is_immutable(&self) -> bool {
        self.props.is_immutable()
    }
}

#[cfg(feature = "parallel")]
fn fill<T: Element>(data: &mut [T], dims: &[usize], src: &dyn QDataSet) {
    use rayon::prelude::*;
    if dims.is_empty() {
        data[0] = T::from_f64(src.value(&[]));
        return;
    }
    let row: usize = dims[1..].iter().product();
    if row == 0 {
        return;
    }
    data.par_chunks_mut(row)
        .enumerate()
        .for_each(|(i, chunk)| fill_row(chunk, i, &dims[1..], src));
}

#[cfg(not(feature = "parallel"))]
fn fill<T: Element>(data: &mut [T], dims: &[usize], src: &dyn QDataSet) {
    if dims.is_empty() {
        data[0] = T::from_f64(src.value(&[]));
        return;
    }
    let row: usize = dims[1..].iter().product();
    if row == 0 {
        return;
    }
    for (i, chunk) in data.chunks_mut(row).enumerate() {
        fill_row(chunk, i, &dims[1..], src);
    }
}

fn fill_row<T: Element>(chunk: &mut [T], i0: usize, rest: &[usize], src: &dyn QDataSet) {
    let mut idx: Shape = SmallVec::from_elem(0, rest.len() + 1);
    idx[0] = i0;
    for slot in chunk.iter_mut() {
        *slot = T::from_f64(src.value(&idx));
        for d in (1..=rest.len()).rev() {
            idx[d] += 1;
            if idx[d] < rest[d - 1] {
                break;
            }
            idx[d] = 0;
        }
    }
}

impl<T: Element> QDataSet for ArrayDataSet<T> {
    fn rank(&self) -> usize {
        self.dims.len()
    }

    fn length(&self, outer: &[usize]) -> usize {
        assert!(
            outer.len() < self.dims.len(),
            "length of dimension {} requested from rank {} dataset",
            outer.len(),
            self.dims.len()
        );
        self.dims[outer.len()]
    }

    #[inline]
    fn value(&self, idx: &[usize]) -> f64 {
        self.get(idx).to_f64()
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.props.get(name).cloned()
    }

    fn property_at(&self, name: &str, i: usize) -> Option<PropertyValue> {
        self.props
            .get_at(name, i)
            .cloned()
            .or_else(|| self.property(name))
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableDataSet> {
        Some(self)
    }

    fn as_mutable_properties(&mut self) -> Option<&mut dyn MutablePropertyDataSet> {
        Some(self)
    }
}

impl<T: Element> WritableDataSet for ArrayDataSet<T> {
    fn put_value(&mut self, idx: &[usize], value: f64) -> Result<()> {
        self.set(idx, T::from_f64(value))
    }
}

impl<T: Element> MutablePropertyDataSet for ArrayDataSet<T> {
    fn put_property(&mut self, name: &str, value: PropertyValue) -> Result<()> {
        self.props.put(name, value)
    }

    fn put_property_at(&mut self, name: &str, index: usize, value: PropertyValue) -> Result<()> {
        self.props.put_at(name, index, value)
    }

    fn remove_property(&mut self, name: &str) -> Result<()> {
        self.props.remove(name)
    }

    fn make_immutable(&mut self) {
        self.props.make_immutable();
    }

    fn is_immutable(&self) -> bool {
        self.props.is_immutable()
    }
}

impl<T: Element> Index<&[usize]> for ArrayDataSet<T> {
    type Output = T;

    fn index(&self, idx: &[usize]) -> &T {
        &self.data[self.flat_index(idx)]
    }
}

/// Direct element access; panics once sealed, like writing through a
/// shared buffer would.
impl<T: Element> IndexMut<&[usize]> for ArrayDataSet<T> {
    fn index_mut(&mut self, idx: &[usize]) -> &mut T {
        assert!(!self.props.is_immutable(), "write to a sealed dataset");
        let flat = self.flat_index(idx);
        &mut self.data[flat]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qdataset_traits::Units;
    use std::sync::Arc;

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[3, 4]).as_slice(), &[4, 1]);
        assert_eq!(row_major_strides(&[2, 3, 4]).as_slice(), &[12, 4, 1]);
        assert!(row_major_strides(&[]).is_empty());
    }

    #[test]
    fn test_from_fn_row_major_order() {
        let a = DDataSet::from_fn(&[2, 3], |idx| (idx[0] * 10 + idx[1]) as f64).unwrap();
        assert_eq!(a.data(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_relative_eq!(a.value(&[1, 2]), 12.0);
        assert_eq!(a.length(&[]), 2);
        assert_eq!(a.length(&[1]), 3);
        assert_eq!(a.property(names::QUBE), Some(PropertyValue::Bool(true)));
    }

    #[test]
    fn test_typed_storage_conversions() {
        let mut b = BDataSet::zeros(&[3]).unwrap();
        b.put_value(&[0], 300.0).unwrap();
        assert_eq!(b.get(&[0]), i8::MAX);
        b.put_value(&[1], -2.7).unwrap();
        assert_eq!(b.get(&[1]), -2);
        assert_eq!(b.element_type(), ElementType::Byte);

        let f = FDataSet::rank1(vec![0.5, 1.5]);
        assert_relative_eq!(f.value(&[1]), 1.5);
        let l = LDataSet::scalar(7);
        assert_eq!(l.rank(), 0);
        assert_relative_eq!(l.value(&[]), 7.0);
    }

    #[test]
    fn test_shape_validation() {
        assert!(DDataSet::from_vec(vec![1.0; 5], &[2, 3]).is_err());
        assert!(DDataSet::zeros(&[1, 1, 1, 1, 1]).is_err());
        assert!(IDataSet::zeros(&[2, 2, 2, 2]).is_ok());
    }

    #[test]
    fn test_set_bounds_and_rank_errors() {
        let mut a = DDataSet::zeros(&[2, 2]).unwrap();
        assert!(matches!(
            a.set(&[2, 0], 1.0),
            Err(DataSetError::IndexOutOfBounds { index: 2, dim: 0, .. })
        ));
        assert!(matches!(
            a.set(&[0], 1.0),
            Err(DataSetError::RankMismatch { actual: 1, .. })
        ));
        a[&[1, 1][..]] = 4.0;
        assert_relative_eq!(a[&[1, 1][..]], 4.0);
    }

    #[test]
    #[should_panic(expected = "rank 2 dataset accessed with 1 indices")]
    fn test_value_with_wrong_rank_panics() {
        let a = DDataSet::zeros(&[2, 2]).unwrap();
        a.value(&[0]);
    }

    #[test]
    fn test_immutable_rejects_writes_and_keeps_state() {
        let mut a = DDataSet::rank1(vec![1.0, 2.0]);
        a.put_property(names::UNITS, Units::new("s").into()).unwrap();
        a.make_immutable();
        assert!(matches!(a.put_value(&[0], 9.0), Err(DataSetError::Immutable(_))));
        assert!(matches!(
            a.put_property(names::LABEL, "t".into()),
            Err(DataSetError::Immutable(_))
        ));
        assert!(a.data_mut().is_err());
        assert_relative_eq!(a.value(&[0]), 1.0);
        assert_eq!(a.property(names::UNITS), Some(Units::new("s").into()));
    }

    #[test]
    fn test_back_copy_is_mutable_and_independent() {
        let mut a = DDataSet::rank1(vec![1.0, 2.0]);
        a.put_property(names::LABEL, "x".into()).unwrap();
        a.make_immutable();
        let mut b = a.back_copy();
        assert!(!b.is_immutable());
        b.put_value(&[0], 5.0).unwrap();
        assert_relative_eq!(a.value(&[0]), 1.0);
        assert_relative_eq!(b.value(&[0]), 5.0);
        assert_eq!(b.property(names::LABEL), Some("x".into()));
    }

    #[test]
    fn test_copy_materialises_any_qube() {
        let src: qdataset_traits::DataSetRef = Arc::new(
            DDataSet::from_fn(&[3, 4], |idx| (idx[0] * 4 + idx[1]) as f64).unwrap(),
        );
        let t = crate::ops::DataSetOps::transpose(&src).unwrap();
        let c = DDataSet::copy(t.as_ref()).unwrap();
        assert_eq!(c.dims(), &[4, 3]);
        for i in 0..4 {
            for j in 0..3 {
                assert_relative_eq!(c.value(&[i, j]), src.value(&[j, i]));
            }
        }
    }

    #[test]
    fn test_indexed_property_falls_back_to_global() {
        let mut a = DDataSet::zeros(&[2, 3]).unwrap();
        a.put_property(names::UNITS, Units::new("nT").into()).unwrap();
        a.put_property_at(names::UNITS, 1, Units::new("deg").into())
            .unwrap();
        assert_eq!(a.property_at(names::UNITS, 0), Some(Units::new("nT").into()));
        assert_eq!(a.property_at(names::UNITS, 1), Some(Units::new("deg").into()));
    }
}
