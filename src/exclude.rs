//! The one exclusion predicate.
//!
//! The initial scan, the dynamic watch extension, the dangling-file sweep and
//! the event filter all ask this type. None of them carries its own rules.

use std::path::{Component, Path, PathBuf};

use crate::config::Settings;

#[derive(Debug, Clone)]
pub struct Exclusions {
    root: PathBuf,
    output_dir: PathBuf,
    dir_names: Vec<String>,
    dir_suffixes: Vec<String>,
    source_suffix: String,
    generated_suffix: String,
}

impl Exclusions {
    pub fn new(root: impl Into<PathBuf>, settings: &Settings) -> Self {
        let root = root.into();
        Self {
            output_dir: root.join(&settings.layout.output_dir),
            root,
            dir_names: settings.watch.excluded_dirs.clone(),
            dir_suffixes: settings.watch.excluded_dir_suffixes.clone(),
            source_suffix: settings.layout.source_suffix.clone(),
            generated_suffix: settings.layout.generated_suffix.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn excluded_name(&self, name: &str) -> bool {
        self.dir_names.iter().any(|n| n == name)
            || self.dir_suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }

    /// True if any directory component below the project root is excluded,
    /// or if `path` lies in the central output directory.
    ///
    /// Components above the root never count, so a project checked out
    /// under e.g. `~/dist/app` is still watched.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if path.starts_with(&self.output_dir) {
            return true;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative.components().any(|component| match component {
            Component::Normal(name) => name.to_str().is_some_and(|n| self.excluded_name(n)),
            _ => false,
        })
    }

    /// True for a path whose contents are produced by this tool.
    pub fn is_generated_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(self.generated_suffix.as_str()))
    }

    /// True for a hand-written source file whose change should trigger regeneration.
    pub fn is_tracked_source(&self, path: &Path) -> bool {
        let has_suffix = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(self.source_suffix.as_str()));

        has_suffix && !self.is_generated_file(path) && !self.is_excluded(parent_or_self(path))
    }
}

fn parent_or_self(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}
