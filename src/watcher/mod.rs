//! Filesystem watching for continuous regeneration.
//!
//! # Architecture
//!
//! ```text
//! GenWatcher
//!   - Single notify::RecommendedWatcher (non-recursive, one watch per dir)
//!   - WatchTree (directories registered, shared exclusion rules)
//!   - EventDeduper (drops repeated OS events for one write)
//!   - Debouncer<PathBuf> (one timer per directory)
//!         |
//!    UnitProcessor -> CentralAggregator
//! ```

mod action;
mod debouncer;
mod dedup;
mod error;
mod tree;
mod watch_loop;

pub use action::{WatchAction, classify};
pub use debouncer::Debouncer;
pub use dedup::EventDeduper;
pub use error::WatchError;
pub use tree::{WatchTree, directories_under};
pub use watch_loop::{GenWatcher, GenWatcherBuilder};
