//! Error types for incremental tasks.

use std::path::PathBuf;

use tether_cache::CacheError;
use tether_metabase::MetabaseError;

/// Boxed error returned by external collaborators (templates, scanners).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a task body or by the task engine around it.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// File state tracking failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Metabase or reference persistence failed.
    #[error(transparent)]
    Metabase(#[from] MetabaseError),

    /// A generated artifact could not be written.
    #[error("failed to write artifact {path}: {source}")]
    ArtifactWrite {
        /// Destination of the artifact.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An obsolete artifact could not be deleted.
    #[error("failed to remove artifact {path}: {source}")]
    ArtifactRemove {
        /// Path of the artifact.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The wrapper template rejected a type.
    #[error("template failed for '{name}': {reason}")]
    Template {
        /// Qualified name of the type being rendered.
        name: String,
        /// Description of the failure.
        reason: String,
    },

    /// The reference scanner failed on a source file.
    #[error("failed to scan {path}: {reason}")]
    Scan {
        /// The source file.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A file could not be copied.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Any other filesystem error in a task body.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A value could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The worker pool for artifact I/O could not be created.
    #[error("failed to start worker pool: {reason}")]
    Pool {
        /// Description of the failure.
        reason: String,
    },

    /// A task failed and its persisted state was discarded.
    #[error("task '{task}' failed: {source}")]
    Failed {
        /// Name of the task.
        task: String,
        /// The first fatal error.
        source: Box<TaskError>,
    },
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io {
            path: path.into(),
            source,
        }
    }
}
