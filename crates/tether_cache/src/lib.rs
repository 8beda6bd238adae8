//! File state tracking for incremental builds.
//!
//! This crate fingerprints input and output files (modification time, size,
//! lazily computed content hash), persists those fingerprints between runs,
//! and classifies each tracked file as new, changed or removed so a build
//! task can decide between a full run, an incremental run, or a skip.

#![warn(missing_docs)]

pub mod change_manager;
pub mod error;
pub mod file_state;
pub mod monitor;

pub use change_manager::{ChangeManager, INPUTS_STATE_FILE, OUTPUTS_STATE_FILE};
pub use error::CacheError;
pub use file_state::FileState;
pub use monitor::{ChangeSet, FileChange, FileStateMonitor};
