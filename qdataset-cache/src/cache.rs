use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;

use qdataset_traits::DataSetRef;

use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::progress::ProgressMonitor;

/// Failure type a loader closure returns.
pub type LoadError = Box<dyn Error + Send + Sync>;

/// Keyed cache of loaded datasets with at most one in-flight load per key.
///
/// The first caller for a key becomes the loader of a fresh
/// [`CacheEntry`]; every later caller receives the same entry and parks on
/// it until the loader completes. Results are held weakly, so a dataset no
/// caller retains is loaded again on the next request.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use qdataset_cache::{NullProgressMonitor, ReferenceCache};
/// use qdataset_traits::DataSetRef;
/// use qdataset_view::DDataSet;
///
/// let cache = ReferenceCache::new();
/// let ds = cache
///     .get_or_load("file:///tmp/a.cdf?B", &NullProgressMonitor, || {
///         Ok(Arc::new(DDataSet::rank1(vec![1.0, 2.0])) as DataSetRef)
///     })
///     .unwrap();
/// assert_eq!(ds.value(&[1]), 2.0);
/// ```
#[derive(Debug, Default)]
pub struct ReferenceCache {
    entries: Mutex<HashMap<String, Arc<CacheEntry>>>,
}

static GLOBAL: OnceLock<ReferenceCache> = OnceLock::new();

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> &'static ReferenceCache {
        GLOBAL.get_or_init(ReferenceCache::new)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<CacheEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the entry for `key`, creating one owned by the calling thread
    /// when there is none or the previous result is gone.
    ///
    /// A failed entry is also replaced, so the next request retries the
    /// load. The caller checks [`CacheEntry::should_i_load`] to learn
    /// whether it must load or park.
    pub fn get_data_set_or_lock(
        &self,
        key: &str,
        monitor: &dyn ProgressMonitor,
    ) -> Arc<CacheEntry> {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(key) {
            if entry.was_garbage_collected() {
                tracing::debug!(key, "cached dataset was dropped, reloading");
            } else if entry.is_failed() {
                tracing::debug!(key, "previous load failed, reloading");
            } else {
                if !entry.is_done() {
                    monitor.set_progress_message(&format!("another thread is loading {key}"));
                }
                return Arc::clone(entry);
            }
        }
        let entry = Arc::new(CacheEntry::new(key, thread::current().id()));
        entries.insert(key.to_string(), Arc::clone(&entry));
        tracing::debug!(key, "new cache entry");
        entry
    }

    /// Return the cached dataset for `key`, running `load` on this thread
    /// if no other thread has it loaded or loading.
    ///
    /// A loader failure, or a panic inside `load`, is recorded on the entry
    /// so parked callers are woken with [`CacheError::LoadFailed`].
    pub fn get_or_load<F>(
        &self,
        key: &str,
        monitor: &dyn ProgressMonitor,
        load: F,
    ) -> Result<DataSetRef>
    where
        F: FnOnce() -> std::result::Result<DataSetRef, LoadError>,
    {
        let mut load = Some(load);
        loop {
            let entry = self.get_data_set_or_lock(key, monitor);
            if !entry.should_i_load(thread::current().id()) {
                match entry.park(monitor) {
                    Err(CacheError::Collected { .. }) => continue,
                    other => return other,
                }
            }
            let Some(load) = load.take() else {
                return Err(CacheError::WouldDeadlock {
                    key: key.to_string(),
                });
            };
            let guard = PanicGuard(&entry);
            let loaded = load();
            drop(guard);
            return match loaded {
                Ok(ds) => entry.finished(ds),
                Err(err) => {
                    let err: Arc<dyn Error + Send + Sync> = Arc::from(err);
                    entry.fail(Arc::clone(&err))?;
                    Err(CacheError::LoadFailed(err))
                }
            };
        }
    }

    /// Forget every entry. Loads in flight still complete for the callers
    /// already holding their entry.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Drop entries whose dataset is gone or whose load failed; returns the
    /// number removed.
    pub fn tidy(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| !(e.was_garbage_collected() || e.is_failed()));
        let removed = before - entries.len();
        tracing::debug!(removed, remaining = entries.len(), "tidied reference cache");
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

struct PanicGuard<'a>(&'a CacheEntry);

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let _ = self.0.exception("loader panicked");
        }
    }
}
