//! Photofit CLI - configuration, logging and reporting for the `photofit` binary
//!
//! Configuration resolves in layers (defaults, TOML file, flags) and is
//! validated once merged. Logging goes to stderr through `tracing-subscriber`.

#![warn(unreachable_pub)]

pub mod config;
pub mod logging;
pub mod report;

pub use config::{ConfigError, LogFormat, LoggingSettings, Overrides, PhotofitConfig};
pub use report::{plan_text, CompressionReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
