//! Configuration, filesystem paths, and logging setup for the escrow client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_API_BASE_URL, DEFAULT_LOG_LEVEL};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
