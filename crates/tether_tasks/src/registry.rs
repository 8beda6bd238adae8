//! Record of which wrappers the last successful generation produced.
//!
//! The registry lives in the generate task's state directory. An incremental
//! run diffs the stored set against the new closure to decide which
//! artifacts to write and which to delete.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::TaskError;

/// File name of the persisted registry inside a state directory.
pub const REGISTRY_FILE: &str = "classes.json";

/// Sorted set of type names that currently have generated artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedRegistry(BTreeSet<String>);

impl GeneratedRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Registered names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Borrows the underlying set.
    pub fn names(&self) -> &BTreeSet<String> {
        &self.0
    }

    /// Loads a registry, returning `None` if it is missing or unparsable.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(registry) => Some(registry),
            Err(e) => {
                trace!(path = %path.display(), error = %e, "ignoring unreadable registry");
                None
            }
        }
    }

    /// Writes the registry as a JSON array.
    pub fn save(&self, path: &Path) -> Result<(), TaskError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| TaskError::Serialization {
            reason: e.to_string(),
        })?;
        tether_common::write_atomic(path, &json).map_err(|e| TaskError::io(path, e))
    }
}

impl From<BTreeSet<String>> for GeneratedRegistry {
    fn from(names: BTreeSet<String>) -> Self {
        Self(names)
    }
}

impl<S: Into<String>> FromIterator<S> for GeneratedRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Work needed to move from a previous registry to a new closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDiff {
    /// Names in the closure without an artifact yet.
    pub to_generate: BTreeSet<String>,
    /// Registered names no longer in the closure.
    pub to_remove: BTreeSet<String>,
}

impl RegistryDiff {
    /// Computes `closure − previous` and `previous − closure`.
    pub fn between(previous: &GeneratedRegistry, closure: &BTreeSet<String>) -> Self {
        Self {
            to_generate: closure.difference(&previous.0).cloned().collect(),
            to_remove: previous.0.difference(closure).cloned().collect(),
        }
    }

    /// Returns `true` if no artifact needs to change.
    pub fn is_empty(&self) -> bool {
        self.to_generate.is_empty() && self.to_remove.is_empty()
    }
}
