//! Logging initialization for client binaries.
//!
//! Thin wrapper over the observability package that wires the client's
//! paths and level into a [`observability::LogConfig`].

use crate::Paths;

/// Initialize logging for a client binary.
///
/// - JSONL output to `~/.escrow/logs/escrow.jsonl` (credentials redacted)
/// - level from `RUST_LOG` or the provided default
/// - optional stderr output for interactive debugging
pub fn init_logging(service_name: &str, level: &str, paths: &Paths, also_stderr: bool) {
    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr,
        ..Default::default()
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
