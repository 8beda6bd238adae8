//! Mirrors a directory of generated artifacts into a destination.

use std::path::{Path, PathBuf};

use tether_cache::{ChangeSet, FileChange};
use tracing::{debug, warn};

use crate::error::TaskError;
use crate::pool::{WorkerPool, DEFAULT_CONCURRENCY};
use crate::task::IncrementalTask;
use crate::walk::collect_files;

/// Counts of files touched by one copy run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Files copied into the destination.
    pub copied: usize,
    /// Files deleted from the destination.
    pub removed: usize,
}

/// Keeps `output_dir` in sync with `input_dir`.
pub struct CopySourcesTask {
    incremental_dir: PathBuf,
    input_dir: PathBuf,
    output_dir: PathBuf,
    concurrency: usize,
}

impl CopySourcesTask {
    /// Task name used in logs and errors.
    pub const NAME: &'static str = "copy-sources";

    /// Creates a task copying `input_dir` into `output_dir`.
    pub fn new(
        incremental_dir: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            incremental_dir: incremental_dir.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets the number of concurrent copies.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    fn destination(&self, source: &Path) -> Option<PathBuf> {
        source
            .strip_prefix(&self.input_dir)
            .ok()
            .map(|relative| self.output_dir.join(relative))
    }

    fn copy_all(&self, pool: &WorkerPool, sources: &[PathBuf]) -> Result<usize, TaskError> {
        let pairs: Vec<(PathBuf, PathBuf)> = sources
            .iter()
            .filter_map(|from| self.destination(from).map(|to| (from.clone(), to)))
            .collect();
        pool.try_for_each(&pairs, |(from, to)| copy_file(from, to))?;
        Ok(pairs.len())
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), TaskError> {
    let copy_err = |source| TaskError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(copy_err)?;
    }
    std::fs::copy(from, to).map_err(copy_err)?;
    Ok(())
}

fn remove_file(path: &Path) -> Result<(), TaskError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TaskError::ArtifactRemove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

impl IncrementalTask for CopySourcesTask {
    type Output = CopyReport;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn incremental_dir(&self) -> &Path {
        &self.incremental_dir
    }

    fn input_paths(&self) -> Vec<PathBuf> {
        vec![self.input_dir.clone()]
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        vec![self.output_dir.clone()]
    }

    fn run_full(&mut self) -> Result<CopyReport, TaskError> {
        match std::fs::remove_dir_all(&self.output_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(TaskError::io(&self.output_dir, e)),
        }
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| TaskError::io(&self.output_dir, e))?;

        let mut sources = Vec::new();
        collect_files(&self.input_dir, &mut sources)?;
        let copied = self.copy_all(&WorkerPool::new(self.concurrency)?, &sources)?;
        debug!(copied, "copied all sources");
        Ok(CopyReport { copied, removed: 0 })
    }

    fn run_incremental(&mut self, changes: &ChangeSet) -> Result<CopyReport, TaskError> {
        let pool = WorkerPool::new(self.concurrency)?;

        let mut stale = Vec::new();
        for path in changes.with_change(FileChange::Removed) {
            match self.destination(path) {
                Some(dest) => stale.push(dest),
                None => warn!(
                    path = %path.display(),
                    "removed file is outside the input directory"
                ),
            }
        }
        pool.try_for_each(&stale, |path| remove_file(path))?;

        let sources: Vec<PathBuf> = changes
            .iter()
            .filter(|(_, change)| matches!(change, FileChange::New | FileChange::Changed))
            .map(|(path, _)| path.to_path_buf())
            .collect();
        let copied = self.copy_all(&pool, &sources)?;

        debug!(copied, removed = stale.len(), "synced changed sources");
        Ok(CopyReport {
            copied,
            removed: stale.len(),
        })
    }

    fn load_result_and_skip(&mut self) -> Result<CopyReport, TaskError> {
        Ok(CopyReport::default())
    }
}
