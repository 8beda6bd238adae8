//! Change detection for a set of monitored files and directories.
//!
//! A [`FileStateMonitor`] starts from the file states persisted by the
//! previous run (the baseline), observes the files that exist in this run,
//! and classifies each one as new, changed or removed.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::file_state::{FileState, FileStateRecord};

/// How a file differs from the previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChange {
    /// Not present in the previous run's snapshot.
    New,
    /// Present before, but its fingerprint differs.
    Changed,
    /// Present before, but not observed in this run.
    Removed,
}

/// Changed files keyed by path, in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(BTreeMap<PathBuf, FileChange>);

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change for `path`, replacing any earlier classification.
    pub fn insert(&mut self, path: impl Into<PathBuf>, change: FileChange) {
        self.0.insert(path.into(), change);
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of changed files.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Classification of one path, if it changed.
    pub fn get(&self, path: &Path) -> Option<FileChange> {
        self.0.get(path).copied()
    }

    /// Iterates over all changes in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, FileChange)> {
        self.0.iter().map(|(p, c)| (p.as_path(), *c))
    }

    /// Paths with the given classification.
    pub fn with_change(&self, change: FileChange) -> impl Iterator<Item = &Path> {
        self.iter()
            .filter(move |(_, c)| *c == change)
            .map(|(p, _)| p)
    }

    /// Number of files that need reprocessing (new + changed).
    pub fn dirty_count(&self) -> usize {
        self.0
            .values()
            .filter(|c| matches!(c, FileChange::New | FileChange::Changed))
            .count()
    }
}

impl FromIterator<(PathBuf, FileChange)> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = (PathBuf, FileChange)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Persisted snapshot of one monitor.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    files: Vec<FileStateRecord>,
}

/// Tracks the state of a set of files across two runs.
#[derive(Debug, Default)]
pub struct FileStateMonitor {
    /// Baseline from the previous run; entries are removed as they are seen.
    loaded: HashMap<PathBuf, FileState>,
    /// States observed in this run; this is what gets persisted.
    processed: BTreeMap<PathBuf, FileState>,
    /// Classifications made in this run.
    changed: BTreeMap<PathBuf, FileChange>,
}

impl FileStateMonitor {
    /// Creates a monitor with an empty baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the baseline from a state file written by a previous run.
    ///
    /// Returns `false` if the file is missing or cannot be parsed; the
    /// baseline is left empty in that case.
    pub fn load(&mut self, state_file: &Path) -> bool {
        let Ok(content) = std::fs::read_to_string(state_file) else {
            return false;
        };
        let Ok(state) = serde_json::from_str::<StateFile>(&content) else {
            tracing::trace!(path = %state_file.display(), "discarding unparsable state file");
            return false;
        };
        self.loaded = state
            .files
            .into_iter()
            .map(|record| (record.path.clone(), FileState::from(record)))
            .collect();
        true
    }

    /// Writes the states observed in this run to `state_file`.
    ///
    /// Content hashes that were never needed are computed here so the next
    /// run can fall back to them.
    pub fn write(&self, state_file: &Path) -> Result<(), CacheError> {
        let state = StateFile {
            files: self.processed.values().map(FileState::to_record).collect(),
        };
        let json = serde_json::to_vec(&state).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        tether_common::write_atomic(state_file, &json).map_err(|e| CacheError::Io {
            path: state_file.to_path_buf(),
            source: e,
        })
    }

    /// Monitors a file, or every file below a directory.
    ///
    /// Paths that do not exist are skipped silently; they may have been
    /// removed between runs.
    pub fn monitor_path(&mut self, path: &Path) -> Result<(), CacheError> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if tether_common::is_missing(&e) => return Ok(()),
            Err(e) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        if metadata.is_file() {
            self.update_file_state(path)
        } else if metadata.is_dir() {
            let io_err = |e| CacheError::Io {
                path: path.to_path_buf(),
                source: e,
            };
            let mut entries = std::fs::read_dir(path)
                .map_err(io_err)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(io_err)?;
            entries.sort();
            for entry in entries {
                self.monitor_path(&entry)?;
            }
            Ok(())
        } else {
            Ok(())
        }
    }

    fn update_file_state(&mut self, path: &Path) -> Result<(), CacheError> {
        if self.processed.contains_key(path) {
            return Ok(());
        }
        let current = match FileState::from_path(path) {
            Ok(state) => state,
            Err(CacheError::Io { source, .. })
                if tether_common::is_missing(&source) =>
            {
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match self.loaded.remove(path) {
            None => {
                self.changed.insert(path.to_path_buf(), FileChange::New);
                self.processed.insert(path.to_path_buf(), current);
            }
            Some(previous) => {
                if current.is_different_than(&previous)? {
                    self.changed.insert(path.to_path_buf(), FileChange::Changed);
                    self.processed.insert(path.to_path_buf(), current);
                } else {
                    self.processed.insert(path.to_path_buf(), previous);
                }
            }
        }
        Ok(())
    }

    /// Starts a new observation round with this run's states as the baseline
    /// and monitors `paths` again.
    ///
    /// Used after a task has written its outputs so the persisted snapshot
    /// describes the freshly written files.
    pub fn update<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), CacheError> {
        self.loaded = std::mem::take(&mut self.processed).into_iter().collect();
        self.changed.clear();
        for path in paths {
            self.monitor_path(path.as_ref())?;
        }
        Ok(())
    }

    /// Returns files classified in this run plus every baseline file that
    /// was never observed, classified as removed.
    pub fn changed_files(&self) -> ChangeSet {
        let mut changes = ChangeSet(self.changed.clone());
        for path in self.loaded.keys() {
            changes.insert(path.clone(), FileChange::Removed);
        }
        changes
    }

    /// States observed in this run, in path order.
    pub fn processed_files(&self) -> impl Iterator<Item = &FileState> {
        self.processed.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn set_mtime(path: &Path, secs: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn write(path: &Path, content: &str, mtime: u64) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        set_mtime(path, mtime);
    }

    /// Simulates one build run: load the snapshot, monitor, persist.
    fn run(state: &Path, paths: &[&Path]) -> ChangeSet {
        let mut monitor = FileStateMonitor::new();
        monitor.load(state);
        for p in paths {
            monitor.monitor_path(p).unwrap();
        }
        let changes = monitor.changed_files();
        monitor.write(state).unwrap();
        changes
    }

    #[test]
    fn first_sight_is_new() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("src/app.js");
        write(&file, "a", 10);

        let changes = run(&dir.path().join("inputs.state"), &[file.as_path()]);
        assert_eq!(changes.get(&file), Some(FileChange::New));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn classification_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("inputs.state");
        let file = dir.path().join("src/app.js");
        write(&file, "a", 10);

        run(&state, &[file.as_path()]);

        let unchanged = run(&state, &[file.as_path()]);
        assert!(unchanged.is_empty());

        write(&file, "abc", 20);
        let changed = run(&state, &[file.as_path()]);
        assert_eq!(changed.get(&file), Some(FileChange::Changed));

        let removed = run(&state, &[]);
        assert_eq!(removed.get(&file), Some(FileChange::Removed));
    }

    #[test]
    fn unchanged_file_keeps_baseline_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("inputs.state");
        let file = dir.path().join("app.js");
        write(&file, "abcd", 10);
        run(&state, &[file.as_path()]);

        // same size, new mtime, same content: the baseline entry is carried forward
        set_mtime(&file, 50);
        assert!(run(&state, &[file.as_path()]).is_empty());

        let mut monitor = FileStateMonitor::new();
        monitor.load(&state);
        monitor.monitor_path(&file).unwrap();
        let kept = monitor.processed_files().next().unwrap();
        assert_eq!(kept.last_modified(), 10_000_000_000);
    }

    #[test]
    fn directories_are_walked_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        write(&root.join("a.js"), "a", 1);
        write(&root.join("nested/b.js"), "b", 1);
        write(&root.join("nested/deeper/c.js"), "c", 1);

        let changes = run(&dir.path().join("inputs.state"), &[root.as_path()]);
        assert_eq!(changes.dirty_count(), 3);
        assert_eq!(changes.with_change(FileChange::New).count(), 3);
    }

    #[test]
    fn missing_path_is_skipped() {
        let mut monitor = FileStateMonitor::new();
        monitor
            .monitor_path(Path::new("/nonexistent/tether/src"))
            .unwrap();
        assert!(monitor.changed_files().is_empty());
    }

    #[test]
    fn path_below_regular_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("in.txt");
        std::fs::write(&file, "plain").unwrap();

        let mut monitor = FileStateMonitor::new();
        monitor.monitor_path(&file.join("child.js")).unwrap();
        assert!(monitor.changed_files().is_empty());
    }

    #[test]
    fn monitoring_twice_does_not_reclassify() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("inputs.state");
        let file = dir.path().join("app.js");
        write(&file, "a", 10);
        run(&state, &[file.as_path()]);

        let mut monitor = FileStateMonitor::new();
        monitor.load(&state);
        monitor.monitor_path(&file).unwrap();
        monitor.monitor_path(&file).unwrap();
        assert!(monitor.changed_files().get(&file).is_none());
    }

    #[test]
    fn load_missing_or_corrupt_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("inputs.state");
        let mut monitor = FileStateMonitor::new();
        assert!(!monitor.load(&state));
        std::fs::write(&state, "{\"files\": 3}").unwrap();
        assert!(!monitor.load(&state));
    }

    #[test]
    fn update_rebaselines_against_this_run() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        write(&out.join("A.js"), "a", 1);

        let mut monitor = FileStateMonitor::new();
        monitor.monitor_path(&out).unwrap();
        assert_eq!(monitor.changed_files().len(), 1);

        write(&out.join("B.js"), "b", 1);
        monitor.update(&[&out]).unwrap();
        let changes = monitor.changed_files();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get(&out.join("B.js")), Some(FileChange::New));
        assert_eq!(monitor.processed_files().count(), 2);
    }

    #[test]
    fn state_file_lists_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("outputs.state");
        let file = dir.path().join("A.js");
        write(&file, "hello", 1);
        run(&state, &[file.as_path()]);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
        let entry = &json["files"][0];
        assert_eq!(entry["size"], 5);
        assert_eq!(entry["contentHash"].as_str().unwrap().len(), 32);
    }
}
