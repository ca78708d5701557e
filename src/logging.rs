//! Tracing setup and the `[component] event` macros.
//!
//! Output goes to stderr as `HH:MM:SS.mmm LEVEL [component] event: detail`.
//! A non-empty `RUST_LOG` replaces the `[logging]` settings; either source is
//! validated, and a broken filter falls back to `info` with a warning rather
//! than silencing the watcher.
//!
//! ```toml
//! [logging]
//! default = "info"
//!
//! [logging.modules]
//! "restate_gen::watcher" = "debug"
//! ```
//!
//! ```bash
//! RUST_LOG=restate_gen::processor=trace restate-gen ./my-app
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

const FALLBACK_LEVEL: &str = "info";

static INIT: Once = Once::new();

struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// `default,module=level,...` with modules in a stable order.
fn filter_directives(config: &LoggingConfig) -> String {
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();

    let mut directives = config.default.clone();
    for (module, level) in modules {
        directives.push_str(&format!(",{module}={level}"));
    }
    directives
}

/// Choose the filter and collect warnings to emit once the subscriber is up.
fn select_filter(rust_log: Option<&str>, config: &LoggingConfig) -> (EnvFilter, Vec<String>) {
    let mut warnings = Vec::new();

    if let Some(from_env) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        match EnvFilter::try_new(from_env) {
            Ok(filter) => return (filter, warnings),
            Err(e) => warnings.push(format!("ignoring RUST_LOG `{from_env}`: {e}")),
        }
    }

    let directives = filter_directives(config);
    match EnvFilter::try_new(&directives) {
        Ok(filter) => (filter, warnings),
        Err(e) => {
            warnings.push(format!(
                "invalid [logging] levels `{directives}`: {e}; using `{FALLBACK_LEVEL}`"
            ));
            (EnvFilter::new(FALLBACK_LEVEL), warnings)
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        let (filter, warnings) = select_filter(rust_log.as_deref(), config);

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(CompactTime)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();

        for warning in warnings {
            tracing::warn!("[logging] {warning}");
        }
    });
}

/// Info-level event tagged with the component that produced it.
///
/// ```ignore
/// log_event!("processor", "generated", "{}", path.display());
/// log_event!("watcher", "stopped");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-level counterpart of [`log_event!`].
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(default: &str, modules: &[(&str, &str)]) -> LoggingConfig {
        LoggingConfig {
            default: default.to_string(),
            modules: modules
                .iter()
                .map(|(m, l)| (m.to_string(), l.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_filter_directives_include_module_overrides() {
        let config = config(
            "warn",
            &[
                ("restate_gen::watcher", "debug"),
                ("restate_gen::aggregator", "trace"),
            ],
        );
        assert_eq!(
            filter_directives(&config),
            "warn,restate_gen::aggregator=trace,restate_gen::watcher=debug"
        );
    }

    #[test]
    fn test_filter_directives_default_only() {
        assert_eq!(filter_directives(&LoggingConfig::default()), "info");
    }

    #[test]
    fn test_valid_sources_produce_no_warnings() {
        let config = config("info", &[("restate_gen::watcher", "debug")]);
        assert!(select_filter(None, &config).1.is_empty());
        assert!(select_filter(Some("restate_gen=trace"), &config).1.is_empty());
        // Blank RUST_LOG counts as unset
        assert!(select_filter(Some("  "), &config).1.is_empty());
    }

    #[test]
    fn test_broken_filters_fall_back_with_warnings() {
        let broken = config("info", &[("restate_gen::watcher", "loud")]);
        let (_, warnings) = select_filter(None, &broken);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("restate_gen::watcher=loud"));

        let (_, warnings) = select_filter(Some("restate_gen=loud"), &LoggingConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("RUST_LOG"));
    }
}
