//! Per-key throttling with trailing coalescing.
//!
//! A key executes immediately when its interval has elapsed since the last execution. Otherwise
//! exactly one trailing execution is scheduled for the end of the window; every call that arrives
//! while it is pending replaces its arguments and receives the same shared result.

use std::{collections::HashMap, fmt, future::Future, sync::Arc, time::Duration};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;

type RunFn<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, T> + Send + Sync>;

struct Queued<A, T: Clone> {
    latest_args: Option<A>,
    handle: Shared<BoxFuture<'static, T>>,
}

struct KeyInner<A, T: Clone> {
    last_executed_at: Option<Instant>,
    queued: Option<Queued<A, T>>,
}

struct KeyState<A, T: Clone> {
    // Held for the duration of one execution so a key never runs twice at once.
    gate: tokio::sync::Mutex<()>,
    inner: Mutex<KeyInner<A, T>>,
}

enum Action<A, T: Clone> {
    Run(A),
    Join(Shared<BoxFuture<'static, T>>),
}

/// Runs a single async operation under per-key throttling.
pub struct Throttler<A, T: Clone> {
    interval: Duration,
    run: RunFn<A, T>,
    keys: Mutex<HashMap<String, Arc<KeyState<A, T>>>>,
}

impl<A, T: Clone> fmt::Debug for Throttler<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttler")
            .field("interval", &self.interval)
            .field("keys", &self.keys.lock().len())
            .finish()
    }
}

impl<A, T> Throttler<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Throttle `run` so that each key executes at most once per `interval`.
    pub fn new<F, Fut>(interval: Duration, run: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            interval,
            run: Arc::new(move |args| run(args).boxed()),
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Minimum spacing between executions of one key.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Submit `args` under `key`.
    ///
    /// Resolves with the result of the execution that consumed this call: either this call's own
    /// immediate execution or the key's trailing execution, whose arguments are those of the most
    /// recent call.
    pub async fn submit(&self, key: &str, args: A) -> T {
        let state = self.state_for(key);
        let action = {
            let mut inner = state.inner.lock();
            let now = Instant::now();
            if let Some(queued) = inner.queued.as_mut() {
                tracing::trace!(key, "replacing queued arguments");
                queued.latest_args = Some(args);
                Action::Join(queued.handle.clone())
            } else {
                match inner.last_executed_at.map(|last| now.duration_since(last)) {
                    Some(elapsed) if elapsed < self.interval => {
                        let wait = self.interval - elapsed;
                        tracing::debug!(key, ?wait, "throttled; scheduling trailing execution");
                        let handle = self.trailing(Arc::clone(&state), wait, args);
                        inner.queued = Some(Queued {
                            latest_args: None,
                            handle: handle.clone(),
                        });
                        // The window closes even if every caller goes away.
                        tokio::spawn(handle.clone());
                        Action::Join(handle)
                    }
                    _ => {
                        inner.last_executed_at = Some(now);
                        Action::Run(args)
                    }
                }
            }
        };

        match action {
            Action::Run(args) => {
                let _gate = state.gate.lock().await;
                (self.run)(args).await
            }
            Action::Join(handle) => handle.await,
        }
    }

    /// Execute `args` right away, outside of any key's state.
    pub async fn run_now(&self, args: A) -> T {
        (self.run)(args).await
    }

    /// Number of keys seen so far.
    pub fn key_count(&self) -> usize {
        self.keys.lock().len()
    }

    /// Whether `key` has a trailing execution waiting for its window to close.
    pub fn is_queued(&self, key: &str) -> bool {
        self.keys
            .lock()
            .get(key)
            .is_some_and(|s| s.inner.lock().queued.is_some())
    }

    fn state_for(&self, key: &str) -> Arc<KeyState<A, T>> {
        let mut keys = self.keys.lock();
        Arc::clone(keys.entry(key.to_string()).or_insert_with(|| {
            Arc::new(KeyState {
                gate: tokio::sync::Mutex::new(()),
                inner: Mutex::new(KeyInner {
                    last_executed_at: None,
                    queued: None,
                }),
            })
        }))
    }

    fn trailing(
        &self,
        state: Arc<KeyState<A, T>>,
        wait: Duration,
        first_args: A,
    ) -> Shared<BoxFuture<'static, T>> {
        let run = Arc::clone(&self.run);
        async move {
            tokio::time::sleep(wait).await;
            let args = {
                let mut inner = state.inner.lock();
                let latest = inner.queued.take().and_then(|q| q.latest_args);
                inner.last_executed_at = Some(Instant::now());
                latest.unwrap_or(first_args)
            };
            let _gate = state.gate.lock().await;
            run(args).await
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/throttle.rs"]
mod tests;
