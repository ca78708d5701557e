//! Derived-state registry: unit directory -> last generated template data.
//!
//! The registry is the source of truth for the central aggregator. It is a
//! cheap cloneable handle around one exclusive lock, shared by the unit
//! processor and the aggregator. The lock is held only for the map operation
//! itself (plus one existence check on eviction), never across a file write
//! or an external process call.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::types::TemplateData;

#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    entries: Arc<Mutex<HashMap<PathBuf, TemplateData>>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for a unit, returning the previous one.
    pub fn upsert(&self, dir: PathBuf, data: TemplateData) -> Option<TemplateData> {
        self.entries.lock().insert(dir, data)
    }

    /// Remove the record for a unit.
    pub fn remove(&self, dir: &Path) -> Option<TemplateData> {
        self.entries.lock().remove(dir)
    }

    pub fn get(&self, dir: &Path) -> Option<TemplateData> {
        self.entries.lock().get(dir).cloned()
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.entries.lock().contains_key(dir)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Point-in-time copy of all entries, sorted by unit directory.
    pub fn snapshot(&self) -> Vec<(PathBuf, TemplateData)> {
        let mut entries: Vec<_> = {
            let guard = self.entries.lock();
            guard
                .iter()
                .map(|(dir, data)| (dir.clone(), data.clone()))
                .collect()
        };
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Evict a unit only if its record still points at `file` and `file` is
    /// missing from disk.
    ///
    /// Both are checked under the lock. The processor writes the adapter
    /// before it upserts, so a unit regenerated since the caller's snapshot
    /// (same path or a new one) keeps its record.
    pub fn evict_if_stale(&self, dir: &Path, file: &Path) -> bool {
        let mut guard = self.entries.lock();
        let stale = guard
            .get(dir)
            .is_some_and(|data| data.file_path == file && !file.exists());
        if stale {
            guard.remove(dir);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Manifest;

    fn data(name: &str, file: &str) -> TemplateData {
        let manifest = Manifest {
            service_name: name.to_string(),
            handlers: Vec::new(),
        };
        TemplateData::from_manifest(&manifest, PathBuf::from(file))
    }

    #[test]
    fn test_upsert_replaces_previous() {
        let registry = StateRegistry::new();
        let dir = PathBuf::from("/p/users");

        assert!(registry.upsert(dir.clone(), data("Users", "/p/users/users.restate.ts")).is_none());
        let previous = registry.upsert(dir.clone(), data("Accounts", "/p/users/accounts.restate.ts"));

        assert_eq!(previous.unwrap().service_name, "Users");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&dir).unwrap().service_name, "Accounts");
    }

    #[test]
    fn test_snapshot_is_sorted_and_detached() {
        let registry = StateRegistry::new();
        registry.upsert(PathBuf::from("/p/b"), data("B", "/p/b/b.restate.ts"));
        registry.upsert(PathBuf::from("/p/a"), data("A", "/p/a/a.restate.ts"));

        let snapshot = registry.snapshot();
        registry.remove(Path::new("/p/a"));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, PathBuf::from("/p/a"));
        assert_eq!(snapshot[1].0, PathBuf::from("/p/b"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_evict_if_stale_respects_newer_record() {
        let registry = StateRegistry::new();
        let dir = PathBuf::from("/p/users");
        registry.upsert(dir.clone(), data("Users", "/p/users/users.restate.ts"));

        assert!(!registry.evict_if_stale(&dir, Path::new("/p/users/old.restate.ts")));
        assert!(registry.contains(&dir));

        assert!(registry.evict_if_stale(&dir, Path::new("/p/users/users.restate.ts")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_evict_if_stale_keeps_record_whose_file_came_back() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("users");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("users.restate.ts");
        let registry = StateRegistry::new();
        registry.upsert(dir.clone(), data("Users", file.to_str().unwrap()));

        // Caller saw the file missing, then the unit was regenerated in place
        std::fs::write(&file, "// regenerated").unwrap();
        assert!(!registry.evict_if_stale(&dir, &file));
        assert!(registry.contains(&dir));

        std::fs::remove_file(&file).unwrap();
        assert!(registry.evict_if_stale(&dir, &file));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let registry = StateRegistry::new();
        let other = registry.clone();
        other.upsert(PathBuf::from("/p/x"), data("X", "/p/x/x.restate.ts"));
        assert!(registry.contains(Path::new("/p/x")));
    }
}
