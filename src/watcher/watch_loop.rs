//! The long-running event loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::aggregator::CentralAggregator;
use crate::processor::UnitProcessor;

use super::action::{WatchAction, classify};
use super::debouncer::Debouncer;
use super::dedup::EventDeduper;
use super::error::WatchError;
use super::tree::WatchTree;

/// Watches the project and turns filesystem events into debounced
/// per-directory regenerations, each followed by an index update.
pub struct GenWatcher {
    tree: WatchTree,
    deduper: EventDeduper,
    debouncer: Debouncer<PathBuf>,
    processor: Arc<UnitProcessor>,
    aggregator: Arc<CentralAggregator>,
    /// Channel for receiving file events.
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// The underlying file watcher.
    watcher: notify::RecommendedWatcher,
}

impl GenWatcher {
    pub fn builder() -> GenWatcherBuilder {
        GenWatcherBuilder::new()
    }

    pub fn tree(&self) -> &WatchTree {
        &self.tree
    }

    pub fn pending_regenerations(&self) -> usize {
        self.debouncer.pending_count()
    }

    /// Register every tracked directory with the OS watcher.
    ///
    /// Failing to watch the project root is fatal; any other directory is
    /// logged and skipped.
    pub fn register_tree(&mut self) -> Result<usize, WatchError> {
        let root = self.tree.exclusions().root().to_path_buf();
        self.tree.scan();
        if !self.tree.contains(&root) {
            return Err(WatchError::PathWatchFailed {
                path: root,
                reason: "project root is not a readable directory".to_string(),
            });
        }

        let mut watched = 0;
        let dirs = self.tree.dirs();
        for dir in dirs {
            match self.watch_directory(&dir) {
                Ok(()) => watched += 1,
                Err(e) if dir == root => return Err(e),
                Err(e) => tracing::warn!("[watcher] {e}"),
            }
        }
        Ok(watched)
    }

    /// Start watching and process events until the notify channel closes.
    pub async fn watch(mut self) -> Result<(), WatchError> {
        let watched = self.register_tree()?;
        crate::log_event!("watcher", "monitoring", "{watched} directories");

        while let Some(res) = self.event_rx.recv().await {
            match res {
                Ok(event) => self.handle_event(event),
                Err(e) => {
                    let e = WatchError::EventError {
                        details: e.to_string(),
                    };
                    tracing::error!("[watcher] {e}");
                }
            }
        }

        crate::log_event!("watcher", "stopped");
        Ok(())
    }

    /// Apply one filesystem event. Must run inside a tokio runtime.
    pub fn handle_event(&mut self, event: Event) {
        for action in classify(&event, &self.tree) {
            match action {
                WatchAction::WatchDirectory { dir } => self.on_directory_created(&dir),
                WatchAction::UnwatchDirectory { dir } => {
                    let dropped = self.tree.forget(&dir);
                    for d in &dropped {
                        // The OS usually drops the watch itself when the directory goes
                        let _ = self.watcher.unwatch(d);
                    }
                    crate::debug_event!("watcher", "unwatched", "{} directories", dropped.len());
                }
                WatchAction::Regenerate { dir, path } => {
                    if self.deduper.is_duplicate(&path) {
                        crate::debug_event!("watcher", "duplicate", "{}", path.display());
                        continue;
                    }
                    crate::debug_event!("watcher", "change", "{:?} {}", event.kind, path.display());
                    self.schedule(dir);
                }
                WatchAction::Ignore => {}
            }
        }
    }

    /// Register `dir` and its subtree, replacing any registration left from
    /// an earlier directory at the same path.
    fn on_directory_created(&mut self, dir: &Path) {
        let previous = self.tree.forget(dir);
        for d in &previous {
            // Watches on a deleted directory are usually gone already
            let _ = self.watcher.unwatch(d);
        }

        let current = self.tree.extend(dir);
        for d in &current {
            if let Err(e) = self.watch_directory(d) {
                tracing::warn!("[watcher] {e}");
            }
            if self.processor.is_unit(d) {
                crate::log_event!("watcher", "new unit", "{}", d.display());
                self.schedule(d.clone());
            } else if previous.contains(d) {
                // Recreated without a marker: retire whatever was registered
                self.schedule(d.clone());
            }
        }

        for d in previous {
            if !current.contains(&d) {
                self.schedule(d);
            }
        }
    }

    fn schedule(&self, dir: PathBuf) {
        let processor = Arc::clone(&self.processor);
        let aggregator = Arc::clone(&self.aggregator);
        let key = dir.clone();

        self.debouncer.schedule(key, move || async move {
            processor.process(&dir).await;
            // Index writes are synchronous and serialized; keep them off the workers
            if let Err(e) = tokio::task::spawn_blocking(move || aggregator.run()).await {
                tracing::error!("[watcher] index update task failed: {e}");
            }
        });
    }

    fn watch_directory(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
        crate::debug_event!("watcher", "watching", "{}", dir.display());
        Ok(())
    }
}

/// Builder for constructing a GenWatcher.
pub struct GenWatcherBuilder {
    tree: Option<WatchTree>,
    processor: Option<Arc<UnitProcessor>>,
    aggregator: Option<Arc<CentralAggregator>>,
    debounce: Duration,
    dedup_window: Duration,
}

impl GenWatcherBuilder {
    pub fn new() -> Self {
        Self {
            tree: None,
            processor: None,
            aggregator: None,
            debounce: Duration::from_millis(100),
            dedup_window: Duration::from_millis(100),
        }
    }

    /// Set the tree of watched directories.
    pub fn tree(mut self, tree: WatchTree) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn processor(mut self, processor: Arc<UnitProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn aggregator(mut self, aggregator: Arc<CentralAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Quiet interval before a directory regenerates.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Window in which repeated events for one path are dropped.
    pub fn dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    pub fn build(self) -> Result<GenWatcher, WatchError> {
        let tree = self.tree.ok_or_else(|| WatchError::InitFailed {
            reason: "Watch tree is required".to_string(),
        })?;
        let processor = self.processor.ok_or_else(|| WatchError::InitFailed {
            reason: "Unit processor is required".to_string(),
        })?;
        let aggregator = self.aggregator.ok_or_else(|| WatchError::InitFailed {
            reason: "Aggregator is required".to_string(),
        })?;

        let (tx, rx) = mpsc::channel(256);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        Ok(GenWatcher {
            tree,
            deduper: EventDeduper::new(self.dedup_window),
            debouncer: Debouncer::new(self.debounce),
            processor,
            aggregator,
            event_rx: rx,
            watcher,
        })
    }
}

impl Default for GenWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
