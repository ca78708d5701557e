//! Keyed debouncing of regeneration triggers.
//!
//! Each key owns at most one pending timer. Scheduling again before it
//! fires aborts the pending task and starts a fresh quiet interval. A timer
//! that fires first detaches itself from the table, so a later `schedule`
//! never aborts an action that is already running. Actions for the same
//! key run one at a time through a per-key lane lock; different keys run
//! concurrently.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

struct Pending {
    id: u64,
    handle: JoinHandle<()>,
}

struct State<K> {
    next_id: u64,
    timers: HashMap<K, Pending>,
    lanes: HashMap<K, Arc<tokio::sync::Mutex<()>>>,
}

/// Debounces actions by key.
pub struct Debouncer<K> {
    delay: Duration,
    state: Arc<Mutex<State<K>>>,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    /// Create a debouncer with the given quiet interval.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(Mutex::new(State {
                next_id: 0,
                timers: HashMap::new(),
                lanes: HashMap::new(),
            })),
        }
    }

    /// Run `action` once `key` has been quiet for the delay.
    ///
    /// Replaces any timer still pending for `key`. Must be called inside a
    /// tokio runtime.
    pub fn schedule<F, Fut>(&self, key: K, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        let lane = state.lanes.entry(key.clone()).or_default().clone();

        let shared = Arc::clone(&self.state);
        let delay = self.delay;
        let timer_key = key.clone();

        // The table lock is held until the timer is inserted, so the task
        // cannot check for itself before it is registered.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = shared.lock();
                let current = state.timers.get(&timer_key).map(|pending| pending.id);
                if current != Some(id) {
                    // Superseded or cancelled
                    return;
                }
                state.timers.remove(&timer_key);
            }

            {
                let _running = lane.lock().await;
                action().await;
            }

            // Drop the lane once neither a pending nor a running task holds it
            let mut state = shared.lock();
            if Arc::strong_count(&lane) == 2 {
                state.lanes.remove(&timer_key);
            }
        });

        if let Some(previous) = state.timers.insert(key, Pending { id, handle }) {
            previous.handle.abort();
        }
    }

    /// Number of pending timers.
    pub fn pending_count(&self) -> usize {
        self.state.lock().timers.len()
    }

    #[cfg(test)]
    fn lane_count(&self) -> usize {
        self.state.lock().lanes.len()
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        for (_, pending) in self.state.lock().timers.drain() {
            pending.handle.abort();
        }
    }
}
