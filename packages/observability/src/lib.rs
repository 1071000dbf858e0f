//! # Observability
//!
//! Logging setup shared by the escrow client crates.
//!
//! Library crates only emit `tracing` events. Binaries call
//! [`init_with_config`] once at startup to decide where those events go:
//!
//! - a JSONL file (one object per line) under `~/.escrow/logs/escrow.jsonl`
//! - optionally a compact human-readable layer on stderr
//!
//! Credentials are scrubbed before anything reaches the JSONL file. Field
//! names such as `access_token`, `refresh` or `password`, and values that look
//! like bearer headers or JWTs, are written as `[REDACTED]`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "cli".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!
//!     tracing::info!("ready");
//! }
//! ```

mod file_writer;
mod json_layer;
mod redact;

use std::path::PathBuf;

pub use file_writer::LogFileWriter;
pub use json_layer::{JsonLayer, LogEntry};
pub use redact::{redact_fields, REDACTED};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g. "cli"). Included in every log line.
    pub service_name: String,

    /// Default log level filter (e.g. "debug", "info", "warn").
    /// Can be overridden by the `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.escrow/logs/escrow.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Skip the JSONL file entirely.
    pub disable_file: bool,

    /// Also emit logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            disable_file: false,
            also_stderr: false,
        }
    }
}

/// Initialize logging with default settings for the given service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// When the log file cannot be opened the file layer is skipped and a
/// warning is printed to stderr instead of aborting the process.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let file_layer = if config.disable_file {
        None
    } else {
        let log_path = config.log_path.clone().or_else(default_log_path);
        match log_path.map(|path| (LogFileWriter::new(&path), path)) {
            Some((Ok(writer), _)) => Some(
                JsonLayer::new(config.service_name.clone(), writer).with_filter(env_filter()),
            ),
            Some((Err(e), path)) => {
                eprintln!("observability: cannot open log file {}: {}", path.display(), e);
                None
            }
            None => None,
        }
    };

    let stderr_layer = if config.also_stderr {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_writer(std::io::stderr)
                .with_filter(env_filter()),
        )
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init();
}

/// `~/.escrow/logs/escrow.jsonl`, if a home directory exists.
fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".escrow").join("logs").join("escrow.jsonl"))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
