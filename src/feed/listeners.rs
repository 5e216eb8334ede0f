//! Ordered listener lists with per-listener failure isolation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::error;

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// An ordered list of callbacks for events of type `E`.
///
/// Callbacks run in registration order. A callback that panics is logged and
/// skipped; the remaining callbacks still receive the event.
pub struct ListenerList<E> {
    name: &'static str,
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Callback<E>)>>,
}

impl<E: 'static> ListenerList<E> {
    /// Create an empty list. `name` only appears in log output.
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        })
    }

    /// Register a callback and return the handle that removes it.
    pub fn add<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, Arc::new(callback)));

        let list: Arc<dyn Unregister> = self.clone();
        Subscription {
            id,
            list: Arc::downgrade(&list),
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deliver `event` to every callback registered at the time of the call.
    ///
    /// Returns how many callbacks completed without panicking.
    pub fn notify(&self, event: &E) -> usize {
        // Snapshot so callbacks may add or remove listeners while we dispatch
        let snapshot: Vec<(u64, Callback<E>)> = self.lock().clone();

        let mut delivered = 0;
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(_) => error!("Listener {} in {} list panicked", id, self.name),
            }
        }
        delivered
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(u64, Callback<E>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

trait Unregister: Send + Sync {
    fn unregister(&self, id: u64) -> bool;
}

impl<E: 'static> Unregister for ListenerList<E> {
    fn unregister(&self, id: u64) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }
}

/// Handle returned when registering a listener.
///
/// Dropping it leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    list: Weak<dyn Unregister>,
}

impl Subscription {
    /// Remove exactly the listener this handle was issued for.
    ///
    /// Returns `false` if it was already gone (or its list no longer exists).
    pub fn unsubscribe(self) -> bool {
        match self.list.upgrade() {
            Some(list) => list.unregister(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
