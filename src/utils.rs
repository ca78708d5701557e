//! Filesystem helpers shared across modules.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{GenError, GenResult};

/// Write a file atomically: temp file in the same directory, then rename.
///
/// Readers never observe a truncated file, and a failed write leaves the
/// previous content in place. The temp name does not end in the file's own
/// suffix, so it is invisible to the event filter.
pub fn write_atomic(path: &Path, content: &str) -> GenResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| GenError::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = parent.join(format!(".{file_name}.tmp"));

    fs::write(&tmp_path, content).map_err(|e| GenError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        GenError::io(path, e)
    })
}

/// Write only if the content differs. Returns whether the file was written.
pub fn write_if_changed(path: &Path, content: &str) -> GenResult<bool> {
    match fs::read_to_string(path) {
        Ok(existing) if existing == content => Ok(false),
        _ => write_atomic(path, content).map(|_| true),
    }
}

/// Remove a file. Returns `false` if it was already gone.
pub fn remove_if_exists(path: &Path) -> GenResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(GenError::io(path, e)),
    }
}

/// Path of `target` relative to the directory `base`, both absolute.
///
/// Purely lexical: no symlink resolution.
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

/// Forward-slash rendering of a relative path for module specifiers.
pub fn to_module_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
