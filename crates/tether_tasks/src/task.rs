//! The generic incremental task engine.
//!
//! Every concrete task supplies its inputs, outputs and three bodies (full,
//! incremental, skip). [`run_task`] loads the persisted state, monitors the
//! current files, decides how to run, executes the chosen body and then
//! either commits the new snapshot or discards all persisted state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tether_cache::{ChangeManager, ChangeSet};
use tracing::{debug, trace, warn};

use crate::error::TaskError;

/// A unit of work that can be re-run incrementally.
pub trait IncrementalTask {
    /// Value returned by every successful run, including a skipped one.
    type Output;

    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Directory that holds this task's persisted state. One task owns it.
    fn incremental_dir(&self) -> &Path;

    /// Files or directories whose changes make the task run.
    fn input_paths(&self) -> Vec<PathBuf>;

    /// Files or directories the task writes.
    fn output_paths(&self) -> Vec<PathBuf>;

    /// Runs from scratch.
    fn run_full(&mut self) -> Result<Self::Output, TaskError>;

    /// Runs with the set of changed input files.
    fn run_incremental(&mut self, changes: &ChangeSet) -> Result<Self::Output, TaskError>;

    /// Returns the previously produced result without doing any work.
    fn load_result_and_skip(&mut self) -> Result<Self::Output, TaskError>;
}

/// How a running task body was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Everything is regenerated.
    Full,
    /// Only the changed inputs are processed.
    Incremental,
}

/// States of one task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// No usable snapshot was found.
    NoPriorState,
    /// Both snapshots loaded.
    PriorStateValid,
    /// The task body is running.
    Running(RunMode),
    /// Nothing changed; the body was not invoked.
    Skipped,
    /// The new snapshot was persisted.
    Committed,
    /// The body failed and persisted state was discarded.
    Failed,
}

impl TaskState {
    /// Returns `true` if the engine may move from `self` to `next`.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (NoPriorState, Running(RunMode::Full))
                | (NoPriorState, Failed)
                | (PriorStateValid, Running(_))
                | (PriorStateValid, Skipped)
                | (PriorStateValid, Failed)
                | (Running(_), Committed)
                | (Running(_), Failed)
                | (Skipped, Committed)
                | (Skipped, Failed)
        )
    }

    /// Returns `true` for `Committed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Committed | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::NoPriorState => write!(f, "no prior state"),
            TaskState::PriorStateValid => write!(f, "prior state valid"),
            TaskState::Running(RunMode::Full) => write!(f, "running (full)"),
            TaskState::Running(RunMode::Incremental) => write!(f, "running (incremental)"),
            TaskState::Skipped => write!(f, "skipped"),
            TaskState::Committed => write!(f, "committed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// Why a full run was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullReason {
    /// No snapshot could be loaded.
    NoPriorState,
    /// Outputs no longer match the snapshot.
    OutputsChanged,
}

/// What the engine will do after monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Run the full body.
    Full(FullReason),
    /// Run the incremental body with these input changes.
    Incremental(ChangeSet),
    /// Skip the body and reuse the previous result.
    Skip,
}

impl Decision {
    /// The state this decision leads to.
    pub fn next_state(&self) -> TaskState {
        match self {
            Decision::Full(_) => TaskState::Running(RunMode::Full),
            Decision::Incremental(_) => TaskState::Running(RunMode::Incremental),
            Decision::Skip => TaskState::Skipped,
        }
    }
}

/// Chooses how to run, given whether a prior snapshot loaded and the changes
/// observed against it.
///
/// Output changes win over input changes: an incremental diff computed
/// against outputs that no longer match the snapshot is unsafe.
pub fn decide(prior_loaded: bool, changes: &ChangeManager) -> Decision {
    if !prior_loaded {
        return Decision::Full(FullReason::NoPriorState);
    }
    if !changes.changed_output_files().is_empty() {
        return Decision::Full(FullReason::OutputsChanged);
    }
    let inputs = changes.changed_input_files();
    if !inputs.is_empty() {
        return Decision::Incremental(inputs);
    }
    Decision::Skip
}

/// How a successful execution ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// The full body ran.
    Full,
    /// The incremental body ran.
    Incremental,
    /// The body was skipped.
    Skipped,
}

/// Result of a committed task execution.
#[derive(Debug)]
pub struct TaskOutcome<T> {
    /// How the task ran.
    pub kind: RunKind,
    /// The task's result.
    pub value: T,
}

/// Tracks the state of one execution and logs every transition.
struct Execution<'a> {
    task: &'a str,
    state: TaskState,
}

impl Execution<'_> {
    fn advance(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid task transition {} -> {}",
            self.state,
            next
        );
        trace!(task = self.task, from = %self.state, to = %next, "task transition");
        self.state = next;
    }
}

/// Runs `task` once through the incremental state machine.
///
/// On success the outputs are re-monitored and both snapshots persisted. On
/// any failure the task's state directory is deleted, so the next run is a
/// full one, and the error is returned wrapped in [`TaskError::Failed`].
pub fn run_task<T>(task: &mut T) -> Result<TaskOutcome<T::Output>, TaskError>
where
    T: IncrementalTask + ?Sized,
{
    let start = Instant::now();
    let name = task.name().to_string();
    let state_dir = task.incremental_dir().to_path_buf();

    let mut changes = ChangeManager::new();
    let prior_loaded = changes.load(&state_dir);
    let mut execution = Execution {
        task: &name,
        state: if prior_loaded {
            TaskState::PriorStateValid
        } else {
            TaskState::NoPriorState
        },
    };

    let result = execute(task, &mut changes, prior_loaded, &state_dir, &mut execution);
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(outcome) => {
            execution.advance(TaskState::Committed);
            debug!(task = %name, elapsed_ms, "task finished");
            Ok(outcome)
        }
        Err(e) => {
            execution.advance(TaskState::Failed);
            if let Err(delete_err) = changes.delete(&state_dir) {
                warn!(task = %name, error = %delete_err, "failed to discard task state");
            }
            debug!(task = %name, elapsed_ms, "task failed");
            Err(TaskError::Failed {
                task: name,
                source: Box::new(e),
            })
        }
    }
}

fn execute<T>(
    task: &mut T,
    changes: &mut ChangeManager,
    prior_loaded: bool,
    state_dir: &Path,
    execution: &mut Execution<'_>,
) -> Result<TaskOutcome<T::Output>, TaskError>
where
    T: IncrementalTask + ?Sized,
{
    for path in task.input_paths() {
        changes.monitor_input_path(&path)?;
    }
    for path in task.output_paths() {
        changes.monitor_output_path(&path)?;
    }

    let decision = decide(prior_loaded, changes);
    match &decision {
        Decision::Full(FullReason::NoPriorState) => {
            trace!(task = execution.task, "no incremental data, doing a full run")
        }
        Decision::Full(FullReason::OutputsChanged) => {
            trace!(task = execution.task, "output files changed, doing a full run")
        }
        Decision::Incremental(set) => trace!(
            task = execution.task,
            changed = set.len(),
            "input files changed, doing an incremental run"
        ),
        Decision::Skip => trace!(task = execution.task, "nothing changed, skipping"),
    }
    execution.advance(decision.next_state());

    let (kind, value) = match decision {
        Decision::Full(_) => (RunKind::Full, task.run_full()?),
        Decision::Incremental(set) => (RunKind::Incremental, task.run_incremental(&set)?),
        Decision::Skip => (RunKind::Skipped, task.load_result_and_skip()?),
    };

    changes.update_output_files(&task.output_paths())?;
    changes.write(state_dir)?;
    Ok(TaskOutcome { kind, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn write(path: &Path, content: &str, mtime: u64) {
        std::fs::write(path, content).unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime))
            .unwrap();
    }

    /// Copies `input` to `output`, failing on demand.
    struct CopyOne {
        state: PathBuf,
        input: PathBuf,
        output: PathBuf,
        fail: bool,
        calls: Vec<&'static str>,
    }

    impl CopyOne {
        fn new(root: &Path) -> Self {
            let input = root.join("in.txt");
            write(&input, "v1", 1_000);
            Self {
                state: root.join("state"),
                input,
                output: root.join("out.txt"),
                fail: false,
                calls: Vec::new(),
            }
        }

        fn copy(&self) -> Result<u64, TaskError> {
            if self.fail {
                std::fs::write(&self.output, "partial").unwrap();
                return Err(TaskError::Template {
                    name: "in".to_string(),
                    reason: "boom".to_string(),
                });
            }
            std::fs::copy(&self.input, &self.output).map_err(|e| TaskError::io(&self.output, e))
        }
    }

    impl IncrementalTask for CopyOne {
        type Output = u64;

        fn name(&self) -> &str {
            "copy-one"
        }

        fn incremental_dir(&self) -> &Path {
            &self.state
        }

        fn input_paths(&self) -> Vec<PathBuf> {
            vec![self.input.clone()]
        }

        fn output_paths(&self) -> Vec<PathBuf> {
            vec![self.output.clone()]
        }

        fn run_full(&mut self) -> Result<u64, TaskError> {
            self.calls.push("full");
            self.copy()
        }

        fn run_incremental(&mut self, changes: &ChangeSet) -> Result<u64, TaskError> {
            self.calls.push("incremental");
            assert_eq!(changes.len(), 1);
            self.copy()
        }

        fn load_result_and_skip(&mut self) -> Result<u64, TaskError> {
            self.calls.push("skip");
            Ok(0)
        }
    }

    #[test]
    fn transitions() {
        use TaskState::*;
        assert!(NoPriorState.can_transition_to(Running(RunMode::Full)));
        assert!(!NoPriorState.can_transition_to(Running(RunMode::Incremental)));
        assert!(!NoPriorState.can_transition_to(Skipped));
        assert!(PriorStateValid.can_transition_to(Skipped));
        assert!(Running(RunMode::Incremental).can_transition_to(Committed));
        assert!(!Committed.can_transition_to(Running(RunMode::Full)));
        assert!(NoPriorState.can_transition_to(Failed));
        assert!(PriorStateValid.can_transition_to(Failed));
        assert!(!Committed.can_transition_to(Failed));
        assert!(Failed.is_terminal());
        assert!(!Skipped.is_terminal());
    }

    #[test]
    fn decide_without_prior_state_is_full() {
        let cm = ChangeManager::new();
        assert_eq!(decide(false, &cm), Decision::Full(FullReason::NoPriorState));
    }

    #[test]
    fn decide_with_nothing_monitored_skips() {
        let cm = ChangeManager::new();
        assert_eq!(decide(true, &cm), Decision::Skip);
    }

    #[test]
    fn first_run_full_then_skip_then_incremental() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = CopyOne::new(dir.path());

        let first = run_task(&mut task).unwrap();
        assert_eq!(first.kind, RunKind::Full);

        let second = run_task(&mut task).unwrap();
        assert_eq!(second.kind, RunKind::Skipped);

        write(&task.input, "version 2", 2_000);
        let third = run_task(&mut task).unwrap();
        assert_eq!(third.kind, RunKind::Incremental);
        assert_eq!(std::fs::read_to_string(&task.output).unwrap(), "version 2");

        assert_eq!(task.calls, ["full", "skip", "incremental"]);
    }

    #[test]
    fn tampered_output_forces_full_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = CopyOne::new(dir.path());
        run_task(&mut task).unwrap();

        std::fs::remove_file(&task.output).unwrap();
        let outcome = run_task(&mut task).unwrap();
        assert_eq!(outcome.kind, RunKind::Full);
        assert!(task.output.exists());
    }

    #[test]
    fn failure_discards_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = CopyOne::new(dir.path());
        run_task(&mut task).unwrap();
        assert!(task.state.exists());

        write(&task.input, "version 2", 2_000);
        task.fail = true;
        let err = run_task(&mut task).unwrap_err();
        assert!(matches!(err, TaskError::Failed { ref task, .. } if task.as_str() == "copy-one"));
        assert!(!task.state.exists());
        assert!(!ChangeManager::new().load(&task.state));

        task.fail = false;
        let outcome = run_task(&mut task).unwrap();
        assert_eq!(outcome.kind, RunKind::Full);
    }

    #[test]
    fn monitoring_error_fails_without_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = CopyOne::new(dir.path());
        task.input = dir.path().join("bad\0name.txt");

        let err = run_task(&mut task).unwrap_err();
        assert!(matches!(err, TaskError::Failed { ref source, .. }
            if matches!(**source, TaskError::Cache(_))));
        assert!(task.calls.is_empty());
        assert!(!task.state.exists());
    }

    #[test]
    fn monitoring_error_discards_valid_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = CopyOne::new(dir.path());
        run_task(&mut task).unwrap();
        assert!(task.state.exists());

        let good_input = std::mem::replace(&mut task.input, dir.path().join("bad\0name.txt"));
        assert!(matches!(run_task(&mut task), Err(TaskError::Failed { .. })));
        assert_eq!(task.calls, vec!["full"]);
        assert!(!task.state.exists());

        task.input = good_input;
        assert_eq!(run_task(&mut task).unwrap().kind, RunKind::Full);
    }
}
