//! Combined input/output state for one incremental task.
//!
//! Inputs and outputs are tracked by separate monitors. Outputs are tracked
//! so that external edits to generated files (manual changes, partial
//! deletion) are detected and force a full run.

use std::path::Path;

use crate::error::CacheError;
use crate::monitor::{ChangeSet, FileStateMonitor};

/// Name of the persisted input snapshot inside a task's state directory.
pub const INPUTS_STATE_FILE: &str = "inputs.state";

/// Name of the persisted output snapshot inside a task's state directory.
pub const OUTPUTS_STATE_FILE: &str = "outputs.state";

/// Owns the input and output monitors of a task and their persistence.
#[derive(Debug, Default)]
pub struct ChangeManager {
    inputs: FileStateMonitor,
    outputs: FileStateMonitor,
}

impl ChangeManager {
    /// Creates a manager with no prior state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads both snapshots from `state_dir`.
    ///
    /// Returns `false` if either snapshot is missing or unparsable. Both
    /// baselines are reset in that case, so callers can treat it as "no
    /// usable prior state".
    pub fn load(&mut self, state_dir: &Path) -> bool {
        let inputs = state_dir.join(INPUTS_STATE_FILE);
        let outputs = state_dir.join(OUTPUTS_STATE_FILE);
        if !inputs.is_file() || !outputs.is_file() {
            return false;
        }
        if self.inputs.load(&inputs) && self.outputs.load(&outputs) {
            return true;
        }
        self.inputs = FileStateMonitor::new();
        self.outputs = FileStateMonitor::new();
        false
    }

    /// Persists both snapshots into `state_dir`.
    pub fn write(&self, state_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(state_dir).map_err(|e| CacheError::Io {
            path: state_dir.to_path_buf(),
            source: e,
        })?;
        self.inputs.write(&state_dir.join(INPUTS_STATE_FILE))?;
        self.outputs.write(&state_dir.join(OUTPUTS_STATE_FILE))
    }

    /// Removes the state directory and everything in it.
    pub fn delete(&self, state_dir: &Path) -> Result<(), CacheError> {
        match std::fs::remove_dir_all(state_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path: state_dir.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Monitors an input file or directory.
    pub fn monitor_input_path(&mut self, path: &Path) -> Result<(), CacheError> {
        self.inputs.monitor_path(path)
    }

    /// Monitors an output file or directory.
    pub fn monitor_output_path(&mut self, path: &Path) -> Result<(), CacheError> {
        self.outputs.monitor_path(path)
    }

    /// Returns `true` if any input or output changed.
    pub fn has_changes(&self) -> bool {
        !self.changed_input_files().is_empty() || !self.changed_output_files().is_empty()
    }

    /// Changes among monitored inputs.
    pub fn changed_input_files(&self) -> ChangeSet {
        self.inputs.changed_files()
    }

    /// Changes among monitored outputs.
    pub fn changed_output_files(&self) -> ChangeSet {
        self.outputs.changed_files()
    }

    /// Re-observes the outputs after a run, using the current output states
    /// as the baseline.
    pub fn update_output_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), CacheError> {
        self.outputs.update(paths)
    }
}
