pub mod aggregator;
pub mod cli;
pub mod config;
pub mod deps;
pub mod error;
pub mod exclude;
pub mod extract;
pub mod logging;
pub mod orchestrator;
pub mod processor;
pub mod reconcile;
pub mod registry;
pub mod render;
pub mod tsconfig;
pub mod types;
pub mod utils;
pub mod watcher;

pub use aggregator::{AggregateStats, CentralAggregator};
pub use cli::Cli;
pub use config::Settings;
pub use deps::{DependencyChecker, PackageManager};
pub use error::{GenError, GenResult};
pub use exclude::Exclusions;
pub use extract::{CommandExtractor, Extractor};
pub use orchestrator::{Orchestrator, StartupReport};
pub use processor::{ProcessOutcome, UnitProcessor};
pub use reconcile::{DanglingSweep, SweepStats};
pub use registry::StateRegistry;
pub use types::{HandlerCategory, HandlerEntry, Manifest, TemplateData};
pub use watcher::{GenWatcher, WatchError};
