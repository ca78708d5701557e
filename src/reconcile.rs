//! Startup sweep for generated adapters left behind between runs.
//!
//! Runs after the initial scan. An adapter whose directory has a current
//! registry record pointing at it was just regenerated and is kept. Every
//! other adapter is checked:
//! - directory has a record for a different file (service renamed): delete
//! - directory lost its marker file: delete
//! - otherwise re-extract; zero handlers: delete, extraction error: keep

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::GenResult;
use crate::exclude::Exclusions;
use crate::extract::Extractor;
use crate::registry::StateRegistry;
use crate::utils::remove_if_exists;
use crate::watcher::directories_under;

/// Summary of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    pub inspected: usize,
    pub removed: Vec<PathBuf>,
    pub kept: usize,
}

pub struct DanglingSweep {
    exclusions: Exclusions,
    extractor: Arc<dyn Extractor>,
    registry: StateRegistry,
    marker_file: String,
}

impl DanglingSweep {
    pub fn new(
        exclusions: Exclusions,
        extractor: Arc<dyn Extractor>,
        registry: StateRegistry,
        marker_file: impl Into<String>,
    ) -> Self {
        Self {
            exclusions,
            extractor,
            registry,
            marker_file: marker_file.into(),
        }
    }

    /// Generated files under the project root, in walk order.
    pub fn generated_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in directories_under(&self.exclusions, self.exclusions.root()) {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("[sweep] cannot read {}: {e}", dir.display());
                    continue;
                }
            };
            let mut found: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && self.exclusions.is_generated_file(path))
                .collect();
            found.sort();
            files.extend(found);
        }
        files
    }

    pub async fn run(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        for file in self.generated_files() {
            stats.inspected += 1;
            match self.inspect(&file).await {
                Ok(true) => {
                    crate::log_event!("sweep", "removed", "{}", file.display());
                    stats.removed.push(file);
                }
                Ok(false) => stats.kept += 1,
                Err(e) => {
                    tracing::warn!("[sweep] keeping {}: {e}", file.display());
                    stats.kept += 1;
                }
            }
        }

        crate::debug_event!(
            "sweep",
            "done",
            "{} inspected, {} removed",
            stats.inspected,
            stats.removed.len()
        );
        stats
    }

    /// Returns whether `file` was deleted.
    async fn inspect(&self, file: &Path) -> GenResult<bool> {
        let Some(dir) = file.parent() else {
            return Ok(false);
        };

        if let Some(record) = self.registry.get(dir) {
            if record.file_path == file {
                return Ok(false);
            }
            // Rename leftover: the unit now generates a different file
            return remove_if_exists(file);
        }

        if !dir.join(&self.marker_file).is_file() {
            return remove_if_exists(file);
        }

        let manifest = self.extractor.extract(dir).await?;
        if manifest.generated_handler_count() > 0 {
            return Ok(false);
        }

        let removed = remove_if_exists(file)?;
        self.registry.evict_if_stale(dir, file);
        Ok(removed)
    }
}
