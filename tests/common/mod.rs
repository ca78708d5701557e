//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use restate_gen::{
    GenError, GenResult, HandlerCategory, HandlerEntry, Manifest, Orchestrator, Settings,
    extract::Extractor,
};
use tempfile::TempDir;

/// Extractor serving manifests per directory and counting calls.
#[derive(Default)]
pub struct FakeExtractor {
    manifests: Mutex<HashMap<PathBuf, Manifest>>,
    calls: Mutex<HashMap<PathBuf, usize>>,
}

impl FakeExtractor {
    pub fn set(&self, dir: &Path, manifest: Manifest) {
        self.manifests.lock().insert(dir.to_path_buf(), manifest);
    }

    pub fn calls(&self, dir: &Path) -> usize {
        self.calls.lock().get(dir).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, dir: &Path) -> GenResult<Manifest> {
        *self.calls.lock().entry(dir.to_path_buf()).or_default() += 1;
        self.manifests
            .lock()
            .get(dir)
            .cloned()
            .ok_or_else(|| GenError::extraction(dir, "no fixture manifest"))
    }
}

pub fn manifest(name: &str, handlers: &[(&str, &str, HandlerCategory)]) -> Manifest {
    Manifest {
        service_name: name.to_string(),
        handlers: handlers
            .iter()
            .map(|(export, source, category)| HandlerEntry {
                export_name: export.to_string(),
                source_file: source.to_string(),
                category: *category,
            })
            .collect(),
    }
}

pub const TSCONFIG: &str = r#"{
  "compilerOptions": {
    "strict": true,
    "paths": {
      "~encore/*": ["./encore.gen/*"]
    }
  }
}
"#;

/// An Encore project on disk with the runtime packages already declared.
pub struct Project {
    _temp: TempDir,
    pub root: PathBuf,
    pub extractor: Arc<FakeExtractor>,
}

impl Project {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::write(
            root.join("package.json"),
            r#"{"dependencies": {
                "@restatedev/restate-sdk": "^1.4.0",
                "@restatedev/restate-sdk-clients": "^1.4.0",
                "@restatedev/restate-sdk-core": "^1.4.0"
            }}"#,
        )
        .unwrap();
        fs::write(root.join("tsconfig.json"), TSCONFIG).unwrap();

        Self {
            _temp: temp,
            root,
            extractor: Arc::new(FakeExtractor::default()),
        }
    }

    /// Create a unit directory with its marker file and one source file.
    pub fn unit(&self, dir: &str, manifest: Manifest) -> PathBuf {
        let unit = self.root.join(dir);
        fs::create_dir_all(&unit).unwrap();
        fs::write(unit.join("encore.service.ts"), "export default new Service(\"x\");").unwrap();
        fs::write(unit.join("handlers.ts"), "export const run = () => {};").unwrap();
        self.extractor.set(&unit, manifest);
        unit
    }

    pub fn orchestrator(&self) -> Orchestrator {
        self.orchestrator_with(Settings::default())
    }

    pub fn orchestrator_with(&self, settings: Settings) -> Orchestrator {
        Orchestrator::with_extractor(&self.root, settings, self.extractor.clone())
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }
}
