//! Self-describing multi-dimensional datasets with zero-copy views and
//! propagating metadata.
//!
//! A dataset has rank 0 to 4, real values addressed by an index tuple and a
//! property map drawn from a fixed vocabulary (`UNITS`, `DEPEND_0`,
//! `BUNDLE_1`, ...). Views such as slice, trim and sort never copy values;
//! they derive the properties that depend on the shape (axes, bundle
//! descriptors, correlatives) and let everything else fall through to their
//! source.
//!
//! This crate re-exports the three workspace crates:
//!
//! - [`qdataset_traits`]: the [`QDataSet`] contract, property values and names,
//!   errors and the range-checking configuration
//! - [`qdataset_view`]: array storage, every view operator, join and bundle
//! - [`qdataset_cache`]: the [`ReferenceCache`] single-loader cache
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use qdataset::{names, DDataSet, DataSetOps, DataSetRef, MutablePropertyDataSet, QDataSet};
//! use qdataset::{TagGenDataSet, Units};
//!
//! let mut flux = DDataSet::from_fn(&[10, 5], |idx| (idx[0] * 5 + idx[1]) as f64).unwrap();
//! let time: DataSetRef = Arc::new(TagGenDataSet::new(10, 60.0, 0.0, Units::new("s")));
//! flux.put_property(names::DEPEND_0, time.into()).unwrap();
//! flux.put_property(names::UNITS, Units::new("counts").into()).unwrap();
//! let flux: DataSetRef = Arc::new(flux);
//!
//! let row = flux.slice(3).unwrap();
//! assert_eq!(row.rank(), 1);
//! assert_eq!(row.value(&[2]), 17.0);
//! assert_eq!(row.property(names::UNITS), flux.property(names::UNITS));
//!
//! let context = row.property(names::CONTEXT_0).and_then(|v| v.into_dataset()).unwrap();
//! assert_eq!(context.value(&[]), 180.0);
//! ```

pub use qdataset_cache as cache;
pub use qdataset_traits as traits;
pub use qdataset_view as view;

// ============================================================================
// Core contract
// ============================================================================
pub use qdataset_traits::{
    config, names, Appendable, DataSetError, DataSetRef, MutablePropertyDataSet, PropertyMap,
    PropertyValue, QDataSet, Units, ValueKind, WritableDataSet, MAX_RANK,
};

// ============================================================================
// Datasets and views
// ============================================================================
pub use qdataset_view::{
    BDataSet, BundleDataSet, BundleDescriptor, DDataSet, DataSetOps, FDataSet, IDataSet,
    IndexGenDataSet, JoinDataSet, LDataSet, PropertyOverlay, Rank0DataSet, SDataSet,
    SubsetBuilder, TagGenDataSet, TailBundleDataSet, Window,
};

// ============================================================================
// Cache
// ============================================================================
pub use qdataset_cache::{
    CacheEntry, CacheError, NullProgressMonitor, ProgressMonitor, ReferenceCache,
};
