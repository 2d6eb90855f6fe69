use std::error::Error;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use qdataset_traits::{DataSetRef, QDataSet};

use crate::error::{CacheError, Result};
use crate::progress::ProgressMonitor;

#[derive(Debug)]
enum Status {
    Loading,
    Loaded(Weak<dyn QDataSet>),
    Failed(Arc<dyn Error + Send + Sync>),
}

#[derive(Debug)]
struct State {
    status: Status,
    /// Strong handle kept from completion until every parked caller has
    /// taken the result.
    handoff: Option<DataSetRef>,
    waiters: usize,
}

/// One key's load: designated loader, completion status and result.
///
/// The entry moves from loading to done exactly once, through
/// [`CacheEntry::finished`] or [`CacheEntry::exception`] called on the
/// loading thread. The result is held weakly: once every user drops it the
/// entry reports [`CacheEntry::was_garbage_collected`] and the cache starts
/// a fresh load on the next request.
#[derive(Debug)]
pub struct CacheEntry {
    key: String,
    owner: ThreadId,
    state: Mutex<State>,
    done: Condvar,
}

impl CacheEntry {
    pub(crate) fn new(key: &str, owner: ThreadId) -> Self {
        Self {
            key: key.to_string(),
            owner,
            state: Mutex::new(State {
                status: Status::Loading,
                handoff: None,
                waiters: 0,
            }),
            done: Condvar::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `thread` must perform the load.
    pub fn should_i_load(&self, thread: ThreadId) -> bool {
        thread == self.owner && matches!(self.lock().status, Status::Loading)
    }

    pub fn is_done(&self) -> bool {
        !matches!(self.lock().status, Status::Loading)
    }

    pub(crate) fn is_failed(&self) -> bool {
        matches!(self.lock().status, Status::Failed(_))
    }

    /// Done, but every handle to the result has been dropped.
    pub fn was_garbage_collected(&self) -> bool {
        let state = self.lock();
        match &state.status {
            Status::Loaded(weak) => state.handoff.is_none() && weak.strong_count() == 0,
            _ => false,
        }
    }

    fn complete(&self, status: Status, handoff: Option<DataSetRef>) -> Result<()> {
        if thread::current().id() != self.owner {
            return Err(CacheError::NotOwner {
                key: self.key.clone(),
            });
        }
        let mut state = self.lock();
        if !matches!(state.status, Status::Loading) {
            return Err(CacheError::AlreadyDone {
                key: self.key.clone(),
            });
        }
        state.status = status;
        if state.waiters > 0 {
            state.handoff = handoff;
        }
        tracing::debug!(key = %self.key, waiters = state.waiters, "cache entry done");
        drop(state);
        self.done.notify_all();
        Ok(())
    }

    /// Record the loaded dataset and wake every parked caller.
    ///
    /// A result held only by the caller is sealed first, so that every
    /// thread receiving it sees the same immutable dataset. The returned
    /// handle is the one parked callers receive.
    pub fn finished(&self, mut ds: DataSetRef) -> Result<DataSetRef> {
        match Arc::get_mut(&mut ds).and_then(|d| d.as_mutable_properties()) {
            Some(props) => props.make_immutable(),
            None => tracing::trace!(key = %self.key, "result is shared, not sealed"),
        }
        self.complete(Status::Loaded(Arc::downgrade(&ds)), Some(ds.clone()))?;
        Ok(ds)
    }

    /// Record a failed load; every parked caller receives it as
    /// [`CacheError::LoadFailed`].
    pub fn exception(&self, err: impl Into<Box<dyn Error + Send + Sync>>) -> Result<()> {
        self.fail(Arc::from(err.into()))
    }

    pub(crate) fn fail(&self, err: Arc<dyn Error + Send + Sync>) -> Result<()> {
        tracing::debug!(key = %self.key, %err, "cache load failed");
        self.complete(Status::Failed(err), None)
    }

    /// Block until the loader completes the entry, then return its result
    /// or rethrow its failure.
    pub fn park(&self, monitor: &dyn ProgressMonitor) -> Result<DataSetRef> {
        let mut state = self.lock();
        if matches!(state.status, Status::Loading) && thread::current().id() == self.owner {
            return Err(CacheError::WouldDeadlock {
                key: self.key.clone(),
            });
        }
        state.waiters += 1;
        monitor.started();
        if matches!(state.status, Status::Loading) {
            monitor.set_progress_message(&format!("waiting for {} to load", self.key));
            tracing::debug!(key = %self.key, "parking until the load completes");
        }
        while matches!(state.status, Status::Loading) {
            state = self.done.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.waiters -= 1;
        let out = match &state.status {
            Status::Failed(err) => Err(CacheError::LoadFailed(err.clone())),
            Status::Loaded(weak) => state
                .handoff
                .clone()
                .or_else(|| weak.upgrade())
                .ok_or_else(|| CacheError::Collected {
                    key: self.key.clone(),
                }),
            Status::Loading => unreachable!("woken while still loading"),
        };
        if state.waiters == 0 {
            state.handoff = None;
        }
        monitor.finished();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgressMonitor;
    use qdataset_traits::names;
    use qdataset_view::DDataSet;

    fn dataset() -> DataSetRef {
        Arc::new(DDataSet::rank1(vec![1.0, 2.0]))
    }

    fn owned(key: &str) -> CacheEntry {
        CacheEntry::new(key, thread::current().id())
    }

    #[test]
    fn test_owner_loads_and_others_do_not() {
        let e = owned("a");
        assert!(e.should_i_load(thread::current().id()));
        let other = thread::spawn(|| thread::current().id()).join().unwrap();
        assert!(!e.should_i_load(other));
        e.finished(dataset()).unwrap();
        assert!(!e.should_i_load(thread::current().id()));
        assert!(e.is_done());
    }

    #[test]
    fn test_completion_only_once_and_by_owner() {
        let e = Arc::new(owned("b"));
        let e2 = e.clone();
        let res = thread::spawn(move || e2.finished(dataset())).join().unwrap();
        assert!(matches!(res, Err(CacheError::NotOwner { .. })));
        e.exception("boom").unwrap();
        assert!(matches!(e.finished(dataset()), Err(CacheError::AlreadyDone { .. })));
        assert!(matches!(
            e.park(&NullProgressMonitor),
            Err(CacheError::LoadFailed(err)) if err.to_string() == "boom"
        ));
    }

    #[test]
    fn test_owner_cannot_park_on_itself() {
        let e = owned("c");
        assert!(matches!(
            e.park(&NullProgressMonitor),
            Err(CacheError::WouldDeadlock { .. })
        ));
    }

    #[test]
    fn test_parked_thread_receives_result() {
        let e = Arc::new(owned("d"));
        let waiter = {
            let e = e.clone();
            thread::spawn(move || e.park(&NullProgressMonitor))
        };
        while e.lock().waiters == 0 {
            thread::yield_now();
        }
        let ds = e.finished(dataset()).unwrap();
        drop(ds);
        let got = waiter.join().unwrap().unwrap();
        assert_eq!(got.value(&[1]), 2.0);
        assert!(!e.was_garbage_collected());
        drop(got);
        assert!(e.was_garbage_collected());
    }

    #[test]
    fn test_unique_result_is_sealed() {
        let e = owned("e");
        let mut ds = e.finished(dataset()).unwrap();
        drop(e);
        let props = Arc::get_mut(&mut ds)
            .and_then(|d| d.as_mutable_properties())
            .unwrap();
        assert!(props.is_immutable());
        assert!(props.put_property(names::LABEL, "x".into()).is_err());
    }
}
