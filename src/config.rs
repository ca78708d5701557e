//! Layered configuration for the generator.
//!
//! Settings are resolved from, in increasing priority:
//! - Built-in defaults
//! - `<root>/.restate-gen/settings.toml` (optional)
//! - Environment variables
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `RESTATE_GEN_` and use double
//! underscores to separate nested levels:
//! - `RESTATE_GEN_WATCH__DEBOUNCE_MS=250` sets `watch.debounce_ms`
//! - `RESTATE_GEN_EXTRACTOR__TIMEOUT_SECS=10` sets `extractor.timeout_secs`
//! - `RESTATE_GEN_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory (relative to the project root) holding the optional settings file.
pub const SETTINGS_DIR: &str = ".restate-gen";
const SETTINGS_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "RESTATE_GEN_";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Watch loop and exclusion rules
    #[serde(default)]
    pub watch: WatchConfig,

    /// File naming conventions of the host project
    #[serde(default)]
    pub layout: LayoutConfig,

    /// External extraction command
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Required runtime packages
    #[serde(default)]
    pub dependencies: DependencyConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Quiet interval before a directory is regenerated
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Window in which repeated events for one path are treated as duplicates
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,

    /// Directory names that are never scanned, watched or swept
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Directory name suffixes that mark generated output
    #[serde(default = "default_excluded_dir_suffixes")]
    pub excluded_dir_suffixes: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LayoutConfig {
    /// File whose presence makes a directory a unit
    #[serde(default = "default_marker_file")]
    pub marker_file: String,

    /// Suffix of hand-written source files that trigger regeneration
    #[serde(default = "default_source_suffix")]
    pub source_suffix: String,

    /// Suffix of per-unit generated adapter files
    #[serde(default = "default_generated_suffix")]
    pub generated_suffix: String,

    /// Central output directory, relative to the project root
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExtractorConfig {
    /// Program and leading arguments; the unit directory is appended
    #[serde(default = "default_extractor_command")]
    pub command: Vec<String>,

    /// Upper bound for one extraction run
    #[serde(default = "default_extractor_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DependencyConfig {
    /// Packages that must appear in package.json
    #[serde(default = "default_required_packages")]
    pub required: Vec<String>,

    /// Install missing packages before the first generation
    #[serde(default = "default_true")]
    pub auto_install: bool,

    /// Upper bound for one install run
    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: u64,

    /// Program and leading arguments for installs; missing packages are
    /// appended. Empty means the detected package manager.
    #[serde(default)]
    pub installer: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `restate_gen::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_debounce_ms() -> u64 {
    100
}
fn default_dedup_window_ms() -> u64 {
    100
}
fn default_excluded_dirs() -> Vec<String> {
    ["node_modules", "dist", ".build", ".git", SETTINGS_DIR]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_excluded_dir_suffixes() -> Vec<String> {
    vec![".gen".to_string()]
}
fn default_marker_file() -> String {
    "encore.service.ts".to_string()
}
fn default_source_suffix() -> String {
    ".ts".to_string()
}
fn default_generated_suffix() -> String {
    ".restate.ts".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("restate.gen")
}
fn default_extractor_command() -> Vec<String> {
    vec![
        "node".to_string(),
        format!("{SETTINGS_DIR}/extractor/index.js"),
    ]
}
fn default_extractor_timeout_secs() -> u64 {
    60
}
fn default_required_packages() -> Vec<String> {
    [
        "@restatedev/restate-sdk",
        "@restatedev/restate-sdk-clients",
        "@restatedev/restate-sdk-core",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_true() -> bool {
    true
}
fn default_install_timeout_secs() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            dedup_window_ms: default_dedup_window_ms(),
            excluded_dirs: default_excluded_dirs(),
            excluded_dir_suffixes: default_excluded_dir_suffixes(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            marker_file: default_marker_file(),
            source_suffix: default_source_suffix(),
            generated_suffix: default_generated_suffix(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            command: default_extractor_command(),
            timeout_secs: default_extractor_timeout_secs(),
        }
    }
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            required: default_required_packages(),
            auto_install: true,
            install_timeout_secs: default_install_timeout_secs(),
            installer: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DependencyConfig {
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }
}

impl Settings {
    /// Load settings for a project root.
    ///
    /// The settings file is optional; defaults and environment variables
    /// apply either way.
    pub fn load(root: &Path) -> Result<Self, Box<figment::Error>> {
        Self::load_from(Self::settings_path(root))
    }

    /// Load settings from a specific file, still layering defaults and env.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting, single underscore stays in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Location of the settings file for a project root.
    pub fn settings_path(root: &Path) -> PathBuf {
        root.join(SETTINGS_DIR).join(SETTINGS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.watch.debounce_ms, 100);
        assert_eq!(settings.watch.dedup_window_ms, 100);
        assert_eq!(settings.layout.marker_file, "encore.service.ts");
        assert_eq!(settings.layout.generated_suffix, ".restate.ts");
        assert_eq!(settings.layout.output_dir, PathBuf::from("restate.gen"));
        assert!(settings.watch.excluded_dirs.contains(&"node_modules".to_string()));
        assert_eq!(settings.dependencies.required.len(), 3);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load(temp_dir.path()).unwrap();
        assert_eq!(settings.extractor.timeout_secs, 60);
        assert_eq!(settings.logging.default, "info");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
[watch]
debounce_ms = 250

[extractor]
command = ["restate-extract", "--json"]

[logging.modules]
"restate_gen::watcher" = "debug"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        assert_eq!(settings.watch.debounce_ms, 250);
        assert_eq!(settings.extractor.command, vec!["restate-extract", "--json"]);
        assert_eq!(settings.logging.modules["restate_gen::watcher"], "debug");

        // Untouched sections keep their defaults
        assert_eq!(settings.watch.dedup_window_ms, 100);
        assert!(settings.dependencies.auto_install);
    }
}
