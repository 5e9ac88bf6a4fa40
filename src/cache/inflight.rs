use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

type Pending<T> = Shared<BoxFuture<'static, T>>;

struct Slot<T: Clone> {
    id: u64,
    pending: Pending<T>,
}

type SlotMap<T> = Arc<Mutex<HashMap<String, Slot<T>>>>;

/// Deduplicates concurrent computations of the same key.
///
/// While a computation for `key` is pending, every caller awaits the same shared future. The
/// registration is dropped when the computation settles, so a failed attempt never wedges the key.
///
/// The registry holds its own handle to the shared future. If every waiter is cancelled before
/// it settles, the slot stays registered until a later caller for the same key joins and drives
/// it to completion, or until [`InFlight::clear`] runs.
pub struct InFlight<T: Clone> {
    slots: SlotMap<T>,
    next_id: AtomicU64,
}

impl<T: Clone> std::fmt::Debug for InFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("pending", &self.slots.lock().len())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for InFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Unregister<T: Clone> {
    slots: SlotMap<T>,
    key: String,
    id: u64,
}

impl<T: Clone> Drop for Unregister<T> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        if slots.get(&self.key).is_some_and(|s| s.id == self.id) {
            slots.remove(&self.key);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> InFlight<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the pending computation for `key`, or start one with `factory`.
    ///
    /// `factory` is only invoked when nothing is pending for `key`.
    pub async fn dedupe<F, Fut>(&self, key: &str, factory: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let pending = {
            let mut slots = self.slots.lock();
            if let Some(slot) = slots.get(key) {
                tracing::trace!(key, "joining in-flight computation");
                slot.pending.clone()
            } else {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let guard = Unregister {
                    slots: Arc::clone(&self.slots),
                    key: key.to_string(),
                    id,
                };
                let fut = factory();
                let pending = async move {
                    let out = fut.await;
                    drop(guard);
                    out
                }
                .boxed()
                .shared();
                slots.insert(
                    key.to_string(),
                    Slot {
                        id,
                        pending: pending.clone(),
                    },
                );
                pending
            }
        };
        pending.await
    }

    /// Number of keys with a pending computation.
    pub fn pending_len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Forget all registrations. Computations already awaited keep running for their waiters.
    pub fn clear(&self) {
        // Dropping a slot can drop the last handle to its future, whose unregister guard takes
        // the lock again.
        let drained = std::mem::take(&mut *self.slots.lock());
        drop(drained);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/inflight.rs"]
mod tests;
