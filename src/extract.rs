//! Extraction collaborator boundary.
//!
//! The static analysis that discovers handlers lives outside this crate.
//! [`CommandExtractor`] runs it as a child process and parses its JSON
//! manifest from stdout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::ExtractorConfig;
use crate::error::{GenError, GenResult};
use crate::types::Manifest;

/// Produces the handler manifest for one unit directory.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, dir: &Path) -> GenResult<Manifest>;
}

/// Runs the configured extraction command with the unit directory appended.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl CommandExtractor {
    /// Build from config. `working_dir` is the project root; relative script
    /// paths in the command resolve against it.
    pub fn new(config: &ExtractorConfig, working_dir: impl Into<PathBuf>) -> GenResult<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| GenError::Extraction {
                dir: PathBuf::new(),
                reason: "extractor command is empty".to_string(),
            })?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: working_dir.into(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl Extractor for CommandExtractor {
    async fn extract(&self, dir: &Path) -> GenResult<Manifest> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(dir)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        crate::debug_event!("extract", "running", "{} {}", self.program, dir.display());

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                GenError::extraction(dir, format!("failed to start {}: {e}", self.program))
            })?,
            Err(_) => {
                return Err(GenError::Timeout {
                    operation: format!("extraction of {}", dir.display()),
                    limit: self.timeout,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenError::extraction(
                dir,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        parse_manifest(dir, &output.stdout)
    }
}

/// Parse extractor stdout into a manifest.
pub fn parse_manifest(dir: &Path, stdout: &[u8]) -> GenResult<Manifest> {
    serde_json::from_slice(stdout).map_err(|e| {
        let raw = String::from_utf8_lossy(stdout);
        GenError::extraction(dir, format!("invalid manifest JSON ({e}): {}", raw.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HandlerCategory;

    #[test]
    fn test_parse_manifest() {
        let stdout = br#"{"serviceName":"Greeter","handlers":[{"exportName":"greet","source":"./greet","type":"service"}]}"#;
        let manifest = parse_manifest(Path::new("/p/greeter"), stdout).unwrap();
        assert_eq!(manifest.service_name, "Greeter");
        assert_eq!(manifest.handlers[0].category, HandlerCategory::Service);
    }

    #[test]
    fn test_parse_manifest_rejects_garbage() {
        let err = parse_manifest(Path::new("/p/greeter"), b"TypeError: boom").unwrap_err();
        assert!(matches!(err, GenError::Extraction { .. }));
        assert!(err.to_string().contains("TypeError: boom"));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let config = ExtractorConfig {
            command: Vec::new(),
            timeout_secs: 1,
        };
        assert!(CommandExtractor::new(&config, "/p").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_is_parsed() {
        let config = ExtractorConfig {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                r#"echo '{"serviceName":"Echo","handlers":[]}'"#.to_string(),
                "extract".to_string(),
            ],
            timeout_secs: 10,
        };
        let extractor = CommandExtractor::new(&config, std::env::temp_dir()).unwrap();
        let manifest = extractor.extract(Path::new("/p/echo")).await.unwrap();
        assert_eq!(manifest.service_name, "Echo");
        assert!(manifest.handlers.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let config = ExtractorConfig {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo parse failure >&2; exit 3".to_string(),
                "extract".to_string(),
            ],
            timeout_secs: 10,
        };
        let extractor = CommandExtractor::new(&config, std::env::temp_dir()).unwrap();
        let err = extractor.extract(Path::new("/p/bad")).await.unwrap_err();
        assert!(err.to_string().contains("parse failure"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_extractor_times_out() {
        let config = ExtractorConfig {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "sleep 5".to_string(),
                "extract".to_string(),
            ],
            timeout_secs: 0,
        };
        let extractor = CommandExtractor::new(&config, std::env::temp_dir()).unwrap();
        let err = extractor.extract(Path::new("/p/slow")).await.unwrap_err();
        assert!(matches!(err, GenError::Timeout { .. }));
    }
}
