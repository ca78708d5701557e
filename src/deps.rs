//! Runtime package presence check and one-time install.
//!
//! The checker owns its "installed" latch. Concurrent callers of
//! [`DependencyChecker::ensure_installed`] queue on a single-flight guard, so
//! at most one install runs and later callers observe its result. The latch
//! lock itself is only held to read or set the flag.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::process::Command;

use crate::config::DependencyConfig;
use crate::error::{GenError, GenResult};

/// Package manager used by the host project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    /// Detect from lock files in the project root, defaulting to npm.
    pub fn detect(root: &Path) -> Self {
        if root.join("yarn.lock").exists() {
            PackageManager::Yarn
        } else if root.join("pnpm-lock.yaml").exists() {
            PackageManager::Pnpm
        } else {
            PackageManager::Npm
        }
    }

    /// Program and subcommand that add packages.
    pub fn install_command(self) -> Vec<String> {
        vec![self.program().to_string(), self.add_subcommand().to_string()]
    }

    pub fn program(self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
        }
    }

    /// Subcommand that adds packages.
    pub fn add_subcommand(self) -> &'static str {
        match self {
            PackageManager::Npm => "install",
            PackageManager::Yarn | PackageManager::Pnpm => "add",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    dependencies: HashMap<String, String>,
    #[serde(default)]
    dev_dependencies: HashMap<String, String>,
}

/// Required packages missing from `package.json` in `root`.
pub fn missing_packages(root: &Path, required: &[String]) -> GenResult<Vec<String>> {
    let path = root.join("package.json");
    let data = std::fs::read(&path).map_err(|e| GenError::io(&path, e))?;
    let pkg: PackageJson =
        serde_json::from_slice(&data).map_err(|source| GenError::Json { path, source })?;

    Ok(required
        .iter()
        .filter(|dep| {
            !pkg.dependencies.contains_key(dep.as_str())
                && !pkg.dev_dependencies.contains_key(dep.as_str())
        })
        .cloned()
        .collect())
}

#[derive(Debug)]
pub struct DependencyChecker {
    root: PathBuf,
    /// Program and leading arguments of the install command.
    installer: Vec<String>,
    required: Vec<String>,
    auto_install: bool,
    timeout: Duration,
    /// Latched once every required package is present.
    installed: Mutex<bool>,
    /// Single-flight guard for check-and-install.
    flight: tokio::sync::Mutex<()>,
}

impl DependencyChecker {
    pub fn new(root: impl Into<PathBuf>, config: &DependencyConfig) -> Self {
        let root = root.into();
        let installer = if config.installer.is_empty() {
            PackageManager::detect(&root).install_command()
        } else {
            config.installer.clone()
        };
        Self {
            installer,
            root,
            required: config.required.clone(),
            auto_install: config.auto_install,
            timeout: config.install_timeout(),
            installed: Mutex::new(false),
            flight: tokio::sync::Mutex::new(()),
        }
    }

    fn installer_name(&self) -> String {
        self.installer.join(" ")
    }

    pub fn is_installed(&self) -> bool {
        *self.installed.lock()
    }

    /// Startup check: record whether packages are present, never install.
    pub fn check_present(&self) {
        match missing_packages(&self.root, &self.required) {
            Ok(missing) if missing.is_empty() => {
                *self.installed.lock() = true;
                crate::debug_event!("deps", "all required packages present");
            }
            Ok(missing) => {
                crate::log_event!(
                    "deps",
                    "missing",
                    "{} (will install with `{}` before first generation)",
                    missing.join(", "),
                    self.installer_name()
                );
            }
            Err(e) => {
                tracing::warn!("[deps] could not check required packages: {e}");
            }
        }
    }

    /// Make sure required packages are installed, installing once if needed.
    ///
    /// Failure is not latched: the next call checks again.
    pub async fn ensure_installed(&self) -> GenResult<()> {
        if self.is_installed() {
            return Ok(());
        }

        let _flight = self.flight.lock().await;
        // Another caller may have finished while we waited
        if self.is_installed() {
            return Ok(());
        }

        let missing = missing_packages(&self.root, &self.required)?;
        if missing.is_empty() {
            *self.installed.lock() = true;
            return Ok(());
        }

        if !self.auto_install {
            return Err(GenError::DependencyInstall {
                reason: format!(
                    "missing {} and auto_install is disabled",
                    missing.join(", ")
                ),
            });
        }

        crate::log_event!(
            "deps",
            "installing",
            "{} with `{}`",
            missing.join(", "),
            self.installer_name()
        );
        self.install(&missing).await?;

        let still_missing = missing_packages(&self.root, &self.required)?;
        if !still_missing.is_empty() {
            return Err(GenError::DependencyInstall {
                reason: format!("still missing after install: {}", still_missing.join(", ")),
            });
        }

        *self.installed.lock() = true;
        crate::log_event!("deps", "installed");
        Ok(())
    }

    async fn install(&self, packages: &[String]) -> GenResult<()> {
        let (program, args) = self.installer.split_first().ok_or_else(|| {
            GenError::DependencyInstall {
                reason: "installer command is empty".to_string(),
            }
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .args(packages)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let status = match tokio::time::timeout(self.timeout, cmd.status()).await {
            Ok(result) => result.map_err(|e| GenError::DependencyInstall {
                reason: format!("failed to start {program}: {e}"),
            })?,
            Err(_) => {
                return Err(GenError::Timeout {
                    operation: self.installer_name(),
                    limit: self.timeout,
                });
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(GenError::DependencyInstall {
                reason: format!("{program} exited with {status}"),
            })
        }
    }
}
