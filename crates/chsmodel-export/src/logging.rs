//! Logging and tracing utilities for the exporter
//!
//! Structured logging via the `tracing` crate. Library code only emits
//! events; binaries call one of the `init_*` functions once at startup.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the default tracing subscriber
///
/// Multiple calls are safe and ignored after the first. Returns whether this
/// call installed the subscriber.
pub fn init_default() -> bool {
    init_with_config(TracingConfig::default())
}

/// Initialize tracing with a custom configuration
///
/// `RUST_LOG` takes precedence over `config.default_level`.
pub fn init_with_config(config: TracingConfig) -> bool {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_err()
    {
        return false;
    }

    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .is_ok()
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default filter directive (e.g. "info", "warn,chsmodel=debug")
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub show_file: bool,
    pub show_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "warn,chsmodel=info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

#[macro_export]
macro_rules! log_export_start {
    ($model:expr, $path:expr) => {
        tracing::info!(
            model = %$model,
            path = %$path.display(),
            "Starting export"
        );
    };
}

#[macro_export]
macro_rules! log_export_complete {
    ($model:expr, $duration:expr, $meshes:expr, $bytes:expr) => {
        tracing::info!(
            model = %$model,
            duration_ms = %$duration.as_millis(),
            meshes = %$meshes,
            bytes = %$bytes,
            "Export complete"
        );
    };
}

#[macro_export]
macro_rules! log_export_error {
    ($model:expr, $error:expr) => {
        tracing::error!(
            model = %$model,
            error = %$error,
            "Export failed"
        );
    };
}

/// Run an export step inside a span, logging its duration
pub fn instrument_export<T, F>(model: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("export", model = %model);
    let _guard = span.enter();

    let start = std::time::Instant::now();
    let result = f();
    let duration = start.elapsed();

    tracing::debug!(duration_ms = %duration.as_millis(), "Export step complete");

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert!(config.default_level.contains("chsmodel=info"));
        assert!(config.show_target);
        assert!(!config.show_thread_ids);
    }

    #[test]
    fn test_instrument_export() {
        assert_eq!(instrument_export("test", || 42), 42);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_default();
        assert!(!init_default());
    }
}
