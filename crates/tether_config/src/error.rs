//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors raised while loading a `tether.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected tables.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A required value is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A value is present but unusable.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
