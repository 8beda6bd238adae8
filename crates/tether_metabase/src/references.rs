//! Mapping from script source files to the native types they reference.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MetabaseError;
use crate::metabase::validate_name;

/// Referenced type names per source file, as produced by a reference scan.
///
/// Order within a file's list carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceSet(BTreeMap<PathBuf, Vec<String>>);

impl ReferenceSet {
    /// Creates an empty reference set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the types referenced by `path`, replacing any previous list.
    pub fn insert(&mut self, path: impl Into<PathBuf>, types: Vec<String>) {
        self.0.insert(path.into(), types);
    }

    /// Forgets a file's references.
    pub fn remove(&mut self, path: &Path) -> Option<Vec<String>> {
        self.0.remove(path)
    }

    /// Returns the types referenced by one file.
    pub fn get(&self, path: &Path) -> Option<&[String]> {
        self.0.get(path).map(Vec::as_slice)
    }

    /// Number of files with references.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no file references anything.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over files and their referenced types.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[String])> {
        self.0.iter().map(|(p, t)| (p.as_path(), t.as_slice()))
    }

    /// Union of every referenced type across all files.
    pub fn referenced_types(&self) -> BTreeSet<String> {
        self.0.values().flatten().cloned().collect()
    }

    /// Parses a reference set from JSON.
    ///
    /// Every referenced name must be usable as a type key; names with path
    /// separators or reserved path components are rejected.
    pub fn from_json_str(content: &str) -> Result<Self, MetabaseError> {
        let refs: Self = serde_json::from_str(content).map_err(|e| MetabaseError::Parse {
            reason: e.to_string(),
        })?;
        refs.0.values().flatten().try_for_each(|name| validate_name(name))?;
        Ok(refs)
    }

    /// Loads a persisted reference set, returning `None` if the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Self::from_json_str(&content).ok()
    }

    /// Persists the reference set, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<(), MetabaseError> {
        let json = serde_json::to_vec(self).map_err(|e| MetabaseError::Serialization {
            reason: e.to_string(),
        })?;
        tether_common::write_atomic(path, &json).map_err(|e| MetabaseError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl FromIterator<(PathBuf, Vec<String>)> for ReferenceSet {
    fn from_iter<T: IntoIterator<Item = (PathBuf, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
