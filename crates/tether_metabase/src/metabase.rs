//! The in-memory type catalog and its JSON ingestion.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::MetabaseError;
use crate::types::{RawTypeEntry, TypeEntry, NESTING_SEPARATOR};

/// Read-only catalog of native types keyed by qualified name.
///
/// Built once per build run and consumed by the closure resolver and the
/// source generator. Keys are kept sorted so nested types of a given outer
/// type form a contiguous range.
#[derive(Debug, Clone, Default)]
pub struct Metabase {
    types: BTreeMap<String, TypeEntry>,
}

/// Top-level JSON document written by the introspection step.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMetabase {
    #[serde(default)]
    types: BTreeMap<String, RawTypeEntry>,
}

impl Metabase {
    /// Creates an empty metabase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type, validating its name.
    pub fn insert(&mut self, entry: TypeEntry) -> Result<(), MetabaseError> {
        validate_name(&entry.name)?;
        if self.types.contains_key(&entry.name) {
            return Err(MetabaseError::DuplicateType(entry.name));
        }
        self.types.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Builds a metabase from entries, failing on the first invalid one.
    pub fn from_entries<I>(entries: I) -> Result<Self, MetabaseError>
    where
        I: IntoIterator<Item = TypeEntry>,
    {
        let mut metabase = Self::new();
        for entry in entries {
            metabase.insert(entry)?;
        }
        Ok(metabase)
    }

    /// Parses and validates metabase JSON.
    pub fn from_json_str(content: &str) -> Result<Self, MetabaseError> {
        let raw: RawMetabase = serde_json::from_str(content).map_err(|e| MetabaseError::Parse {
            reason: e.to_string(),
        })?;
        let mut metabase = Self::new();
        for (name, raw_entry) in raw.types {
            let entry = raw_entry.into_entry(name)?;
            metabase.insert(entry)?;
        }
        Ok(metabase)
    }

    /// Loads a metabase from a `.json` file or a gzip-compressed `.gz` file.
    pub fn load(path: &Path) -> Result<Self, MetabaseError> {
        let io_err = |source| MetabaseError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::open(path).map_err(io_err)?;
        let mut content = String::new();
        if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            flate2::read::GzDecoder::new(file)
                .read_to_string(&mut content)
                .map_err(io_err)?;
        } else {
            std::io::BufReader::new(file)
                .read_to_string(&mut content)
                .map_err(io_err)?;
        }
        Self::from_json_str(&content)
    }

    /// Looks up a type by qualified name.
    pub fn get(&self, name: &str) -> Option<&TypeEntry> {
        self.types.get(name)
    }

    /// Looks up a type and returns the stored key alongside it.
    pub fn get_key_value(&self, name: &str) -> Option<(&str, &TypeEntry)> {
        self.types.get_key_value(name).map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if the name has an entry.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of types in the catalog.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if the catalog has no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates over all entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeEntry> {
        self.types.values()
    }

    /// Returns every type nested under `outer` (names starting with `outer$`).
    pub fn nested_types_of<'a>(&'a self, outer: &str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = format!("{outer}{NESTING_SEPARATOR}");
        self.types
            .range(prefix.clone()..)
            .map(|(name, _)| name.as_str())
            .take_while(move |name| name.starts_with(&prefix))
    }
}

/// Checks that `name` can serve as a type key and as an artifact file stem.
pub fn validate_name(name: &str) -> Result<(), MetabaseError> {
    let invalid = |reason| MetabaseError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("contains a path separator"));
    }
    if name.starts_with(NESTING_SEPARATOR) || name.ends_with(NESTING_SEPARATOR) {
        return Err(invalid("starts or ends with the nesting separator"));
    }
    if name == "." || name == ".." {
        return Err(invalid("reserved path component"));
    }
    Ok(())
}
