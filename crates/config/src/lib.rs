//! est user configuration.
//!
//! Reads `$HOME/.estconfig.toml`, which names the estfile and describes the
//! user's working week.

#![warn(missing_docs)]

mod config;

pub use config::{ConfigError, EstConfig, Result, CONFIG_FILE_NAME, DEFAULT_CONFIG};
