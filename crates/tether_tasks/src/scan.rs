//! Reference scanning as an incremental task.
//!
//! Source files are handed to a [`ReferenceScanner`] one at a time; the
//! task keeps the resulting [`ReferenceSet`] on disk so that later runs only
//! rescan what changed.

use std::path::{Path, PathBuf};

use tether_cache::{ChangeSet, FileChange};
use tether_metabase::{validate_name, ReferenceSet};
use tracing::{debug, trace, warn};

use crate::error::{BoxError, TaskError};
use crate::task::IncrementalTask;
use crate::walk::collect_files;

/// File name of the persisted reference set inside the output directory.
pub const REFERENCES_FILE: &str = "references.json";

/// Extracts the native type names one source file refers to.
pub trait ReferenceScanner: Sync {
    /// Returns the referenced names in `content`, read from `path`.
    fn scan(&self, path: &Path, content: &str) -> Result<Vec<String>, BoxError>;
}

/// Finds `require('name')` calls whose argument looks like a qualified
/// native type name rather than a relative or package path.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireScanner;

impl ReferenceScanner for RequireScanner {
    fn scan(&self, _path: &Path, content: &str) -> Result<Vec<String>, BoxError> {
        let mut found = Vec::new();
        let mut rest = content;
        while let Some(start) = rest.find("require(") {
            rest = rest[start + "require(".len()..].trim_start();
            let Some(quote) = rest.chars().next().filter(|c| matches!(c, '\'' | '"')) else {
                continue;
            };
            let body = &rest[1..];
            let Some(end) = body.find(quote) else {
                break;
            };
            let name = &body[..end];
            if is_native_name(name) {
                found.push(name.to_string());
            }
            rest = &body[end + 1..];
        }
        Ok(found)
    }
}

fn is_native_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains('/')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '$' | '_'))
}

/// Scans source files for native type references.
pub struct ScanReferencesTask<'a> {
    incremental_dir: PathBuf,
    output_dir: PathBuf,
    inputs: Vec<PathBuf>,
    extensions: Vec<String>,
    scanner: &'a dyn ReferenceScanner,
}

impl<'a> ScanReferencesTask<'a> {
    /// Task name used in logs and errors.
    pub const NAME: &'static str = "scan-references";

    /// Creates a task scanning `inputs` (files or directories) for files
    /// with a `.js` extension.
    pub fn new<I, P>(
        incremental_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        inputs: I,
        scanner: &'a dyn ReferenceScanner,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            incremental_dir: incremental_dir.into(),
            output_dir: output_dir.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            extensions: vec!["js".to_string()],
            scanner,
        }
    }

    /// Replaces the accepted source extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Where the reference set is persisted.
    pub fn references_path(&self) -> PathBuf {
        self.output_dir.join(REFERENCES_FILE)
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Scans one file. `None` means it is gone or references nothing.
    ///
    /// Content that is not valid UTF-8 is scanned lossily.
    fn scan_file(&self, path: &Path) -> Result<Option<Vec<String>>, TaskError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if tether_common::is_missing(&e) => return Ok(None),
            Err(e) => return Err(TaskError::io(path, e)),
        };
        let content = String::from_utf8_lossy(&bytes);
        let mut types = self
            .scanner
            .scan(path, &content)
            .map_err(|e| TaskError::Scan {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        types.retain(|name| match validate_name(name) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unusable type reference");
                false
            }
        });
        types.sort();
        types.dedup();
        trace!(path = %path.display(), types = types.len(), "scanned source file");
        Ok((!types.is_empty()).then_some(types))
    }

    fn save(&self, references: &ReferenceSet) -> Result<(), TaskError> {
        references.save(&self.references_path())?;
        Ok(())
    }
}

impl IncrementalTask for ScanReferencesTask<'_> {
    type Output = ReferenceSet;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn incremental_dir(&self) -> &Path {
        &self.incremental_dir
    }

    fn input_paths(&self) -> Vec<PathBuf> {
        self.inputs.clone()
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        vec![self.references_path()]
    }

    fn run_full(&mut self) -> Result<ReferenceSet, TaskError> {
        let mut files = Vec::new();
        for input in &self.inputs {
            collect_files(input, &mut files)?;
        }

        let mut references = ReferenceSet::new();
        for file in files.iter().filter(|f| self.accepts(f)) {
            if let Some(types) = self.scan_file(file)? {
                references.insert(file.clone(), types);
            }
        }
        debug!(files = references.len(), "scanned all sources");
        self.save(&references)?;
        Ok(references)
    }

    fn run_incremental(&mut self, changes: &ChangeSet) -> Result<ReferenceSet, TaskError> {
        let Some(mut references) = ReferenceSet::load(&self.references_path()) else {
            return self.run_full();
        };

        for (path, change) in changes.iter() {
            match change {
                FileChange::Removed => {
                    references.remove(path);
                }
                FileChange::New | FileChange::Changed if self.accepts(path) => {
                    match self.scan_file(path)? {
                        Some(types) => references.insert(path, types),
                        None => {
                            references.remove(path);
                        }
                    }
                }
                FileChange::New | FileChange::Changed => {}
            }
        }
        debug!(
            changed = changes.len(),
            files = references.len(),
            "rescanned changed sources"
        );
        self.save(&references)?;
        Ok(references)
    }

    fn load_result_and_skip(&mut self) -> Result<ReferenceSet, TaskError> {
        match ReferenceSet::load(&self.references_path()) {
            Some(references) => Ok(references),
            None => self.run_full(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_scanner_finds_native_names() {
        let source = r#"
            const File = require('java.io.File');
            const Entry = require("java.util.Map$Entry");
            const local = require('./local');
            const pkg = require('lodash/fp');
            require( 'android.view.View' );
        "#;
        let found = RequireScanner.scan(Path::new("app.js"), source).unwrap();
        assert_eq!(
            found,
            ["java.io.File", "java.util.Map$Entry", "android.view.View"]
        );
    }

    #[test]
    fn require_scanner_tolerates_unterminated_calls() {
        let found = RequireScanner
            .scan(Path::new("a.js"), "require(foo); require('java.io.File")
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn full_then_incremental() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.js"), "require('A'); require('A');").unwrap();
        std::fs::write(src.join("b.js"), "require('B');").unwrap();
        std::fs::write(src.join("notes.txt"), "require('Ignored');").unwrap();

        let scanner = RequireScanner;
        let mut task = ScanReferencesTask::new(
            dir.path().join("state"),
            dir.path().join("out"),
            [&src],
            &scanner,
        );
        let refs = task.run_full().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs.get(&src.join("a.js")), Some(&["A".to_string()][..]));
        assert!(!refs.referenced_types().contains("Ignored"));

        std::fs::remove_file(src.join("b.js")).unwrap();
        std::fs::write(src.join("a.js"), "// nothing").unwrap();
        std::fs::write(src.join("c.js"), "require('C');").unwrap();
        let changes: ChangeSet = [
            (src.join("a.js"), FileChange::Changed),
            (src.join("b.js"), FileChange::Removed),
            (src.join("c.js"), FileChange::New),
        ]
        .into_iter()
        .collect();

        let refs = task.run_incremental(&changes).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(
            refs.referenced_types().into_iter().collect::<Vec<_>>(),
            ["C"]
        );
        assert_eq!(ReferenceSet::load(&task.references_path()), Some(refs));
    }

    #[test]
    fn skip_without_persisted_references_scans() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("app.js");
        std::fs::write(&src, "require('X');").unwrap();
        let scanner = RequireScanner;
        let mut task = ScanReferencesTask::new(
            dir.path().join("state"),
            dir.path().join("out"),
            [&src],
            &scanner,
        );
        let refs = task.load_result_and_skip().unwrap();
        assert_eq!(refs.len(), 1);
    }

    struct Failing;

    impl ReferenceScanner for Failing {
        fn scan(&self, _path: &Path, _content: &str) -> Result<Vec<String>, BoxError> {
            Err("parse error".into())
        }
    }

    #[test]
    fn scanner_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("app.js");
        std::fs::write(&src, "!").unwrap();
        let mut task = ScanReferencesTask::new(
            dir.path().join("state"),
            dir.path().join("out"),
            [&src],
            &Failing,
        );
        let err = task.run_full().unwrap_err();
        assert!(matches!(err, TaskError::Scan { .. }));
    }

    #[test]
    fn invalid_utf8_source_is_scanned_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("app.js");
        let mut bytes = b"// \xff\xfe latin-1 comment\n".to_vec();
        bytes.extend_from_slice(b"const File = require('java.io.File');\n");
        std::fs::write(&src, bytes).unwrap();

        let mut task = ScanReferencesTask::new(
            dir.path().join("state"),
            dir.path().join("out"),
            [&src],
            &RequireScanner,
        );
        let refs = task.run_full().unwrap();
        assert_eq!(refs.get(&src), Some(&["java.io.File".to_string()][..]));
    }

    struct Fixed(&'static [&'static str]);

    impl ReferenceScanner for Fixed {
        fn scan(&self, _path: &Path, _content: &str) -> Result<Vec<String>, BoxError> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    #[test]
    fn unusable_names_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("app.js");
        std::fs::write(&src, "").unwrap();
        let scanner = Fixed(&["../victim", "A", "a/b"]);
        let mut task = ScanReferencesTask::new(
            dir.path().join("state"),
            dir.path().join("out"),
            [&src],
            &scanner,
        );
        let refs = task.run_full().unwrap();
        assert_eq!(refs.get(&src), Some(&["A".to_string()][..]));
        assert_eq!(ReferenceSet::load(&task.references_path()), Some(refs));
    }
}
