//! Unit processor: one directory through extraction, grouping and write/delete.
//!
//! Side effects of one [`UnitProcessor::process`] call are confined to at
//! most one adapter write or delete plus one registry upsert or removal.
//! The only extra is deleting the adapter left under a service's old name
//! after a rename. Failures are logged and leave the previous generated
//! state untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::LayoutConfig;
use crate::deps::DependencyChecker;
use crate::error::{GenError, GenResult};
use crate::extract::Extractor;
use crate::registry::StateRegistry;
use crate::render::render_adapter;
use crate::types::{TemplateData, generated_file_name};
use crate::utils::{remove_if_exists, write_if_changed};

/// What a processing pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Adapter written with new content.
    Generated { file: PathBuf },
    /// Adapter content was already current; registry refreshed.
    Unchanged { file: PathBuf },
    /// Unit has no handlers (or no marker); adapter and record removed.
    Removed { file: Option<PathBuf> },
    /// Nothing changed because of an error or a non-unit directory.
    Skipped,
}

pub struct UnitProcessor {
    extractor: Arc<dyn Extractor>,
    deps: Arc<DependencyChecker>,
    registry: StateRegistry,
    layout: LayoutConfig,
}

impl UnitProcessor {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        deps: Arc<DependencyChecker>,
        registry: StateRegistry,
        layout: LayoutConfig,
    ) -> Self {
        Self {
            extractor,
            deps,
            registry,
            layout,
        }
    }

    /// True if `dir` holds the unit marker file.
    pub fn is_unit(&self, dir: &Path) -> bool {
        dir.join(&self.layout.marker_file).is_file()
    }

    /// Regenerate one unit. Never fails: errors are logged and yield `Skipped`.
    pub async fn process(&self, dir: &Path) -> ProcessOutcome {
        match self.try_process(dir).await {
            Ok(outcome) => {
                match &outcome {
                    ProcessOutcome::Generated { file } => {
                        crate::log_event!("processor", "generated", "{}", file.display());
                    }
                    ProcessOutcome::Unchanged { file } => {
                        crate::debug_event!("processor", "unchanged", "{}", file.display());
                    }
                    ProcessOutcome::Removed { file: Some(file) } => {
                        crate::log_event!("processor", "removed", "{}", file.display());
                    }
                    ProcessOutcome::Removed { file: None } | ProcessOutcome::Skipped => {}
                }
                outcome
            }
            Err(e) => {
                tracing::error!("[processor] {}: {e}", dir.display());
                ProcessOutcome::Skipped
            }
        }
    }

    async fn try_process(&self, dir: &Path) -> GenResult<ProcessOutcome> {
        if !self.is_unit(dir) {
            // Marker gone (or never there): a known unit is logically removed
            return match self.registry.get(dir) {
                Some(previous) => self.remove_unit(dir, Some(previous.file_path)),
                None => Ok(ProcessOutcome::Skipped),
            };
        }

        self.deps.ensure_installed().await?;

        let manifest = self.extractor.extract(dir).await?;
        if manifest.service_name.is_empty() {
            return Err(GenError::MissingServiceName {
                dir: dir.to_path_buf(),
            });
        }

        let file = dir.join(generated_file_name(
            &manifest.service_name,
            &self.layout.generated_suffix,
        ));
        let data = TemplateData::from_manifest(&manifest, file.clone());

        if data.is_empty() {
            let previous = self.registry.get(dir).map(|d| d.file_path);
            return self.remove_unit(dir, previous.or(Some(file)));
        }

        let content = render_adapter(&data);
        let written = write_if_changed(&file, &content)?;
        let previous = self.registry.upsert(dir.to_path_buf(), data);

        if let Some(old) = previous.map(|p| p.file_path).filter(|p| *p != file) {
            // Renamed service: the old adapter would register the same endpoints
            match remove_if_exists(&old) {
                Ok(true) => crate::log_event!("processor", "removed", "{}", old.display()),
                Ok(false) => {}
                Err(e) => tracing::warn!("[processor] {e}"),
            }
        }

        Ok(if written {
            ProcessOutcome::Generated { file }
        } else {
            ProcessOutcome::Unchanged { file }
        })
    }

    /// Delete the unit's adapter (if any) and evict its record.
    ///
    /// If the delete fails the record stays, matching what is on disk.
    fn remove_unit(&self, dir: &Path, file: Option<PathBuf>) -> GenResult<ProcessOutcome> {
        let removed = match &file {
            Some(path) => remove_if_exists(path)?,
            None => false,
        };
        self.registry.remove(dir);

        Ok(ProcessOutcome::Removed {
            file: file.filter(|_| removed),
        })
    }
}
