//! Alias index mapping import names to generated artifacts.
//!
//! Scripts import nested types by their dotted alias (`Map.Entry`), while
//! artifacts are named after the qualified name (`Map$Entry.js`). The index
//! lets a loader resolve one to the other without scanning the directory.

use std::collections::BTreeMap;
use std::path::Path;

use tether_metabase::dotted_alias;

use crate::error::TaskError;

/// Default index file name inside the output directory.
pub const DEFAULT_INDEX_FILE: &str = "tether.index.json";

/// File name of the artifact generated for `name`.
pub fn artifact_file_name(name: &str, extension: &str) -> String {
    format!("{name}.{extension}")
}

/// Builds the alias → artifact file name map for `names`.
pub fn build_index<'a, I>(names: I, extension: &str) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(|name| (dotted_alias(name), artifact_file_name(name, extension)))
        .collect()
}

/// Rewrites the index at `path`, or removes it when `names` is empty.
///
/// Returns the number of entries written.
pub fn write_index<'a, I>(path: &Path, names: I, extension: &str) -> Result<usize, TaskError>
where
    I: IntoIterator<Item = &'a str>,
{
    let index = build_index(names, extension);
    if index.is_empty() {
        return match std::fs::remove_file(path) {
            Ok(()) => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(TaskError::ArtifactRemove {
                path: path.to_path_buf(),
                source: e,
            }),
        };
    }

    let json = serde_json::to_vec_pretty(&index).map_err(|e| TaskError::Serialization {
        reason: e.to_string(),
    })?;
    tether_common::write_atomic(path, &json).map_err(|e| TaskError::ArtifactWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(index.len())
}
