//! Suppression of duplicate OS notifications for one logical write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Prune stale entries once the cache grows past this many paths.
const PRUNE_THRESHOLD: usize = 256;

/// Remembers when each path last produced an accepted event.
#[derive(Debug)]
pub struct EventDeduper {
    window: Duration,
    recent: Mutex<HashMap<PathBuf, Instant>>,
}

impl EventDeduper {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if an event for `path` was accepted within the window.
    ///
    /// A duplicate does not refresh the timestamp, so a steady stream of
    /// writes still gets through once per window.
    pub fn is_duplicate(&self, path: &Path) -> bool {
        self.is_duplicate_at(path, Instant::now())
    }

    fn is_duplicate_at(&self, path: &Path, now: Instant) -> bool {
        let mut recent = self.recent.lock();

        if let Some(last) = recent.get(path) {
            if now.saturating_duration_since(*last) < self.window {
                return true;
            }
        }

        if recent.len() >= PRUNE_THRESHOLD {
            let window = self.window;
            recent.retain(|_, last| now.saturating_duration_since(*last) < window);
        }
        recent.insert(path.to_path_buf(), now);
        false
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.recent.lock().len()
    }
}
