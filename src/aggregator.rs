//! Central aggregator: category barrels and the root index.
//!
//! Each run works from a point-in-time registry snapshot. Runs are
//! serialized internally, but a run may still miss a registry update that
//! lands while it is writing; the next coalesced trigger corrects that.
//! The index is eventually consistent with the registry, not atomic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::GenResult;
use crate::registry::StateRegistry;
use crate::render::{ROOT_INDEX, render_category_index};
use crate::types::{HandlerCategory, TemplateData};
use crate::utils::{relative_path, to_module_path, write_if_changed};

const INDEX_FILE: &str = "index.ts";

/// Summary of one aggregation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregateStats {
    /// Registry entries evicted because their adapter file vanished.
    pub evicted: usize,
    /// Re-export lines written per category.
    pub exports: HashMap<HandlerCategory, usize>,
    /// Index files whose content changed.
    pub files_written: usize,
}

pub struct CentralAggregator {
    registry: StateRegistry,
    output_dir: PathBuf,
    run_lock: Mutex<()>,
}

impl CentralAggregator {
    /// `output_dir` is the absolute central output directory (`<root>/restate.gen`).
    pub fn new(registry: StateRegistry, output_dir: PathBuf) -> Self {
        Self {
            registry,
            output_dir,
            run_lock: Mutex::new(()),
        }
    }

    /// Directory of a category barrel.
    pub fn category_dir(&self, category: HandlerCategory) -> PathBuf {
        self.output_dir.join(category.index_dir())
    }

    /// Regenerate all index files, logging instead of failing.
    pub fn run(&self) -> Option<AggregateStats> {
        match self.regenerate() {
            Ok(stats) => {
                crate::debug_event!(
                    "aggregator",
                    "index updated",
                    "{} files changed, {} evicted",
                    stats.files_written,
                    stats.evicted
                );
                Some(stats)
            }
            Err(e) => {
                tracing::error!("[aggregator] failed to write central index: {e}");
                None
            }
        }
    }

    /// Reconcile the registry with disk, then rewrite every index file.
    pub fn regenerate(&self) -> GenResult<AggregateStats> {
        let _run = self.run_lock.lock();
        let mut stats = AggregateStats {
            evicted: self.reconcile(),
            ..AggregateStats::default()
        };

        let snapshot = self.registry.snapshot();

        for category in HandlerCategory::GENERATED {
            let dir = self.category_dir(category);
            let lines: Vec<String> = snapshot
                .iter()
                .filter(|(_, data)| !data.group(category).is_empty())
                .map(|(_, data)| export_line(&dir, data, category))
                .collect();

            stats.exports.insert(category, lines.len());
            if write_if_changed(&dir.join(INDEX_FILE), &render_category_index(&lines))? {
                stats.files_written += 1;
            }
        }

        if write_if_changed(&self.output_dir.join(INDEX_FILE), ROOT_INDEX)? {
            stats.files_written += 1;
        }

        Ok(stats)
    }

    /// Evict records whose adapter file no longer exists.
    ///
    /// The unlocked check only filters candidates; the registry confirms
    /// both record and absence under its lock before evicting.
    fn reconcile(&self) -> usize {
        let mut evicted = 0;
        for (dir, data) in self.registry.snapshot() {
            if !data.file_path.exists() && self.registry.evict_if_stale(&dir, &data.file_path) {
                crate::debug_event!("aggregator", "evicted", "{}", dir.display());
                evicted += 1;
            }
        }
        evicted
    }
}

/// `export { <Trimmed><Kind> as <Trimmed> } from '<relative module>';`
fn export_line(category_dir: &Path, data: &TemplateData, category: HandlerCategory) -> String {
    let relative = relative_path(category_dir, &data.file_path);
    let mut module = to_module_path(&relative);
    if let Some(stripped) = module.strip_suffix(".ts") {
        module = stripped.to_string();
    }
    if !module.starts_with("../") {
        module = format!("./{module}");
    }

    format!(
        "export {{ {} as {} }} from '{module}';",
        data.construct_name(category),
        data.service_name_trimmed
    )
}
