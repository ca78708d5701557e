//! Set of directories registered for notifications.
//!
//! `notify` is used non-recursively, so every directory below the root is
//! registered on its own. The tree only computes which directories need a
//! watch; the watcher performs the registration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::exclude::Exclusions;

#[derive(Debug)]
pub struct WatchTree {
    exclusions: Exclusions,
    dirs: HashSet<PathBuf>,
}

impl WatchTree {
    pub fn new(exclusions: Exclusions) -> Self {
        Self {
            exclusions,
            dirs: HashSet::new(),
        }
    }

    pub fn exclusions(&self) -> &Exclusions {
        &self.exclusions
    }

    /// Walk the whole project and track every non-excluded directory.
    ///
    /// Returns the directories that were not tracked before, in walk order.
    pub fn scan(&mut self) -> Vec<PathBuf> {
        let root = self.exclusions.root().to_path_buf();
        self.extend(&root)
    }

    /// Track `dir` and every directory below it.
    ///
    /// Used for created directories, which may already hold nested
    /// subdirectories by the time the event is seen.
    pub fn extend(&mut self, dir: &Path) -> Vec<PathBuf> {
        let found = directories_under(&self.exclusions, dir);
        found
            .into_iter()
            .filter(|d| self.dirs.insert(d.clone()))
            .collect()
    }

    /// Stop tracking `dir` and everything below it. Returns what was dropped.
    pub fn forget(&mut self, dir: &Path) -> Vec<PathBuf> {
        let dropped: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|d| d.starts_with(dir))
            .cloned()
            .collect();
        for d in &dropped {
            self.dirs.remove(d);
        }
        dropped
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.contains(dir)
    }

    /// All tracked directories, sorted.
    pub fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.dirs.iter().cloned().collect();
        dirs.sort();
        dirs
    }

    /// Tracked directories holding `marker`, sorted.
    pub fn units(&self, marker: &str) -> Vec<PathBuf> {
        let mut units: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|d| d.join(marker).is_file())
            .cloned()
            .collect();
        units.sort();
        units
    }
}

/// Non-excluded directories at and below `dir`, sorted by walk order.
///
/// Excluded directories are pruned, not just skipped, so nothing beneath
/// `node_modules` is ever visited.
pub fn directories_under(exclusions: &Exclusions, dir: &Path) -> Vec<PathBuf> {
    if exclusions.is_excluded(dir) || !dir.is_dir() {
        return Vec::new();
    }

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !entry.file_type().is_dir() || !exclusions.is_excluded(entry.path())
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("[watcher] skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}
