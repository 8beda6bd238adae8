//! Incremental tasks for wrapper generation.
//!
//! [`run_task`] drives any [`IncrementalTask`] through load, monitor,
//! decide, run and commit. The concrete tasks here scan sources for type
//! references, generate one wrapper per type in the dependency closure and
//! copy generated artifacts to their destination.

#![warn(missing_docs)]

pub mod copy;
pub mod error;
pub mod generate;
pub mod index;
pub mod pool;
pub mod registry;
pub mod scan;
pub mod task;
pub mod template;
mod walk;

pub use copy::{CopyReport, CopySourcesTask};
pub use error::{BoxError, TaskError};
pub use generate::{GenerateOptions, GenerateSourcesTask, GenerationReport};
pub use index::{artifact_file_name, write_index, DEFAULT_INDEX_FILE};
pub use pool::{WorkerPool, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
pub use registry::{GeneratedRegistry, RegistryDiff, REGISTRY_FILE};
pub use scan::{ReferenceScanner, RequireScanner, ScanReferencesTask, REFERENCES_FILE};
pub use task::{
    decide, run_task, Decision, FullReason, IncrementalTask, RunKind, RunMode, TaskOutcome,
    TaskState,
};
pub use template::{StubTemplate, WrapperTemplate};
