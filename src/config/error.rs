//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::client::Capability;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A setting required by the selected providers was not set.
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A numeric setting is out of its allowed range.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    /// The worker pool could hold every permit of a capability.
    #[error(
        "worker pool size {pool} must be below the {capability} in-flight ceiling {ceiling}"
    )]
    PoolNotBelowCeiling {
        pool: usize,
        capability: Capability,
        ceiling: usize,
    },

    #[error("invalid {capability} client policy: {reason}")]
    InvalidClientConfig {
        capability: Capability,
        reason: String,
    },
}
