//! Resolution of configured paths against the project directory.

use crate::types::ProjectConfig;
use std::path::{Path, PathBuf};

/// Configured locations joined onto the project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// The project directory itself.
    pub project_dir: PathBuf,
    /// Root of all per-task state directories.
    pub cache_dir: PathBuf,
    /// Generated wrapper directory.
    pub output_dir: PathBuf,
    /// Metabase file, if configured.
    pub metabase: Option<PathBuf>,
    /// Reference set file, if configured.
    pub references: Option<PathBuf>,
    /// Script source roots to scan.
    pub sources: Vec<PathBuf>,
    /// Copy destination, if configured.
    pub copy_to: Option<PathBuf>,
}

impl ResolvedPaths {
    /// State directory of the task called `task`.
    pub fn task_state_dir(&self, task: &str) -> PathBuf {
        self.cache_dir.join(task)
    }
}

/// Resolves every configured path against `project_dir`.
///
/// Absolute paths in the configuration are kept as they are.
pub fn resolve_paths(config: &ProjectConfig, project_dir: &Path) -> ResolvedPaths {
    let join = |p: &String| project_dir.join(p);
    let paths = &config.paths;
    ResolvedPaths {
        project_dir: project_dir.to_path_buf(),
        cache_dir: join(&paths.cache_dir),
        output_dir: join(&paths.output_dir),
        metabase: paths.metabase.as_ref().map(join),
        references: paths.references.as_ref().map(join),
        sources: paths.sources.iter().map(join).collect(),
        copy_to: paths.copy_to.as_ref().map(join),
    }
}
