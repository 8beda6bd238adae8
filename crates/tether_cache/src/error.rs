//! Error types for file state tracking.

use std::path::PathBuf;

/// Errors that can occur while tracking file state.
///
/// Loading persisted state is fail-safe and never produces these: a missing
/// or corrupt state file is a cache miss. These errors cover I/O while
/// walking monitored paths, writing state, and comparison misuse.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing state.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Two file states for different paths were compared.
    #[error("can only compare file states of the same path, got {left} and {right}")]
    InvalidComparison {
        /// Path of the state being compared.
        left: PathBuf,
        /// Path of the state it was compared against.
        right: PathBuf,
    },

    /// A serialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
