//! Weak-reference dataset cache with single-loader coordination.
//!
//! [`ReferenceCache`] maps a key (usually a resource locator) to a
//! [`CacheEntry`]. For any number of concurrent first requests of a key,
//! exactly one thread is told to load; the others park on the entry until
//! the loader calls [`CacheEntry::finished`] or [`CacheEntry::exception`],
//! then all of them receive the same sealed dataset or the same error.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use qdataset_cache::{NullProgressMonitor, ReferenceCache};
//! use qdataset_traits::DataSetRef;
//! use qdataset_view::DDataSet;
//!
//! let cache = ReferenceCache::new();
//! let entry = cache.get_data_set_or_lock("a", &NullProgressMonitor);
//! assert!(entry.should_i_load(thread::current().id()));
//! let ds: DataSetRef = Arc::new(DDataSet::rank1(vec![1.0]));
//! let loaded = entry.finished(ds).unwrap();
//!
//! // later callers get the same dataset without loading
//! let again = cache.get_data_set_or_lock("a", &NullProgressMonitor);
//! assert!(!again.should_i_load(thread::current().id()));
//! assert!(Arc::ptr_eq(&again.park(&NullProgressMonitor).unwrap(), &loaded));
//! ```

mod cache;
mod entry;
mod error;
mod progress;

pub use cache::{LoadError, ReferenceCache};
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use progress::{NullProgressMonitor, ProgressMonitor};
