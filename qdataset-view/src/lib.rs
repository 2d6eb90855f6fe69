//! Array-backed datasets and zero-copy dataset views.
//!
//! Every operator builds a new dataset that holds its source through a
//! [`DataSetRef`](qdataset_traits::DataSetRef) and derives its structural
//! properties once, at construction. Other properties fall through to the
//! source when queried.
//!
//! # Core Types
//!
//! - [`ArrayDataSet`]: owned row-major storage for `i8` to `f64`
//! - [`JoinDataSet`]: datasets of rank `R - 1` stacked into rank `R`
//! - [`BundleDataSet`] / [`TailBundleDataSet`]: series packed side by side,
//!   described by a [`BundleDescriptor`]
//! - [`PropertyOverlay`]: a writable property layer over any dataset
//!
//! # Views
//!
//! - `slice`, `slice1`, `slice2`: fix one index
//! - `trim`, `leaf_trim`, `stride_window`: ranges of a dimension
//! - `sort`, `subset`, `reverse`: reorder or select elements
//! - `transpose`, `replicate`: move or insert dimensions
//!
//! See [`DataSetOps`] for the method forms.

macro_rules! impl_mutable_properties {
    ($t:ty) => {
        impl qdataset_traits::MutablePropertyDataSet for $t {
            fn put_property(
                &mut self,
                name: &str,
                value: qdataset_traits::PropertyValue,
            ) -> qdataset_traits::Result<()> {
                self.props.put(name, value)
            }

            fn put_property_at(
                &mut self,
                name: &str,
                index: usize,
                value: qdataset_traits::PropertyValue,
            ) -> qdataset_traits::Result<()> {
                self.props.put_at(name, index, value)
            }

            fn remove_property(&mut self, name: &str) -> qdataset_traits::Result<()> {
                self.props.remove(name)
            }

            fn make_immutable(&mut self) {
                self.props.make_immutable();
            }

            fn is_immutable(&self) -> bool {
                self.props.is_immutable()
            }
        }
    };
}

pub mod array;
pub mod bundle;
pub mod generated;
pub mod join;
pub mod leaf_trim;
pub mod ops;
pub mod overlay;
pub mod propagate;
pub mod replicate;
pub mod reverse;
pub mod slice;
pub mod sort;
pub mod store;
pub mod stride;
pub mod subset;
pub mod transpose;
pub mod trim;
pub mod util;

// ============================================================================
// Storage and generated datasets
// ============================================================================
pub use array::{
    row_major_strides, ArrayDataSet, BDataSet, DDataSet, Element, ElementType, FDataSet, IDataSet,
    LDataSet, SDataSet,
};
pub use generated::{IndexGenDataSet, Rank0DataSet, TagGenDataSet};
pub use overlay::PropertyOverlay;
pub use store::{Lookup, PropertyStore};

// ============================================================================
// Aggregation
// ============================================================================
pub use bundle::{BundleDataSet, BundleDescriptor, TailBundleDataSet};
pub use join::JoinDataSet;

// ============================================================================
// Views
// ============================================================================
pub use leaf_trim::LeafTrimDataSet;
pub use replicate::ReplicateDataSet;
pub use reverse::ReverseDataSet;
pub use slice::SliceDataSet;
pub use sort::SortDataSet;
pub use stride::{StrideWindowDataSet, Window};
pub use subset::{SubsetBuilder, SubsetDataSet};
pub use transpose::TransposeDataSet;
pub use trim::TrimDataSet;

// ============================================================================
// Operators
// ============================================================================
pub use ops::DataSetOps;
pub use util::{
    bundle_length, collect_properties, describe, is_bundle, is_qube, qube_dims, Shape,
};
