//! Configuration, paths and logging for the homes runtime.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DatabaseConfig, DEFAULT_HOME, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_with_file, parse_level};
pub use paths::Paths;
