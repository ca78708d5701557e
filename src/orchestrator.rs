//! Wiring and startup sequence.
//!
//! Every component receives its collaborators through construction; the
//! registry handle is the only state shared between them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::aggregator::CentralAggregator;
use crate::config::Settings;
use crate::deps::DependencyChecker;
use crate::error::GenResult;
use crate::exclude::Exclusions;
use crate::extract::{CommandExtractor, Extractor};
use crate::processor::{ProcessOutcome, UnitProcessor};
use crate::reconcile::{DanglingSweep, SweepStats};
use crate::registry::StateRegistry;
use crate::tsconfig::update_tsconfig;
use crate::watcher::{GenWatcher, WatchError, WatchTree};

/// What startup did, for logging and tests.
#[derive(Debug, Default)]
pub struct StartupReport {
    pub units: usize,
    pub generated: usize,
    pub removed: usize,
    pub skipped: usize,
    pub sweep: SweepStats,
}

pub struct Orchestrator {
    root: PathBuf,
    settings: Settings,
    registry: StateRegistry,
    deps: Arc<DependencyChecker>,
    extractor: Arc<dyn Extractor>,
    processor: Arc<UnitProcessor>,
    aggregator: Arc<CentralAggregator>,
    tree: Option<WatchTree>,
}

impl Orchestrator {
    /// Wire all components with the command-based extractor.
    pub fn new(root: impl Into<PathBuf>, settings: Settings) -> GenResult<Self> {
        let root = root.into();
        let extractor = Arc::new(CommandExtractor::new(&settings.extractor, &root)?);
        Ok(Self::with_extractor(root, settings, extractor))
    }

    /// Wire all components around a given extractor.
    pub fn with_extractor(
        root: impl Into<PathBuf>,
        settings: Settings,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let root = root.into();
        let registry = StateRegistry::new();
        let deps = Arc::new(DependencyChecker::new(&root, &settings.dependencies));
        let processor = Arc::new(UnitProcessor::new(
            Arc::clone(&extractor),
            Arc::clone(&deps),
            registry.clone(),
            settings.layout.clone(),
        ));
        let aggregator = Arc::new(CentralAggregator::new(
            registry.clone(),
            root.join(&settings.layout.output_dir),
        ));

        Self {
            root,
            settings,
            registry,
            deps,
            extractor,
            processor,
            aggregator,
            tree: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    fn exclusions(&self) -> Exclusions {
        Exclusions::new(&self.root, &self.settings)
    }

    /// Bring generated state in line with the project before watching.
    ///
    /// Probe dependencies, regenerate every unit one at a time, sweep
    /// dangling adapters, write the index, then patch `tsconfig.json`.
    /// Nothing here is fatal.
    pub async fn startup(&mut self) -> StartupReport {
        crate::log_event!("orchestrator", "monitoring", "{}", self.root.display());
        self.deps.check_present();

        let mut tree = WatchTree::new(self.exclusions());
        let dirs = tree.scan();
        let units = tree.units(&self.settings.layout.marker_file);
        crate::debug_event!(
            "orchestrator",
            "scanned",
            "{} directories, {} units",
            dirs.len(),
            units.len()
        );

        let mut report = StartupReport {
            units: units.len(),
            ..StartupReport::default()
        };
        for unit in &units {
            match self.processor.process(unit).await {
                ProcessOutcome::Generated { .. } | ProcessOutcome::Unchanged { .. } => {
                    report.generated += 1;
                }
                ProcessOutcome::Removed { .. } => report.removed += 1,
                ProcessOutcome::Skipped => report.skipped += 1,
            }
        }
        self.tree = Some(tree);

        report.sweep = DanglingSweep::new(
            self.exclusions(),
            Arc::clone(&self.extractor),
            self.registry.clone(),
            self.settings.layout.marker_file.clone(),
        )
        .run()
        .await;

        self.aggregator.run();

        if let Err(e) = update_tsconfig(&self.root, &self.settings.layout.output_dir) {
            tracing::error!("[orchestrator] failed to update tsconfig.json: {e}");
        }

        crate::log_event!(
            "orchestrator",
            "ready",
            "{} units, {} generated, {} skipped",
            report.units,
            report.generated,
            report.skipped
        );
        report
    }

    /// Build the watcher from the startup tree.
    pub fn watcher(&mut self) -> Result<GenWatcher, WatchError> {
        let tree = self
            .tree
            .take()
            .unwrap_or_else(|| WatchTree::new(self.exclusions()));

        GenWatcher::builder()
            .tree(tree)
            .processor(Arc::clone(&self.processor))
            .aggregator(Arc::clone(&self.aggregator))
            .debounce(self.settings.watch.debounce())
            .dedup_window(self.settings.watch.dedup_window())
            .build()
    }

    /// Run startup, then watch until the event stream ends.
    ///
    /// Only a watcher setup failure is returned.
    pub async fn run(mut self) -> Result<(), WatchError> {
        self.startup().await;
        let watcher = self.watcher()?;
        watcher.watch().await
    }
}
