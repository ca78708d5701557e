//! CLI argument parsing using clap.

use clap::{
    Parser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::{Path, PathBuf};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Continuously regenerate Restate adapters for an Encore project.
#[derive(Parser, Debug)]
#[command(
    name = "restate-gen",
    version,
    about = "Watch an Encore project and keep its Restate adapters and index up to date",
    long_about = None,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Project root to watch (defaults to the current directory)
    pub root: Option<PathBuf>,
}

impl Cli {
    /// Absolute, canonical project root.
    pub fn resolve_root(&self, cwd: &Path) -> std::io::Result<PathBuf> {
        let root = match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => cwd.join(root),
            None => cwd.to_path_buf(),
        };
        root.canonicalize()
    }
}
