//! Recursive file listing shared by the scan and copy tasks.

use std::path::{Path, PathBuf};

use crate::error::TaskError;

/// Appends every regular file under `root` to `out`, in sorted order.
///
/// A missing `root` contributes nothing. Symlinks are not followed.
pub(crate) fn collect_files(root: &Path, out: &mut Vec<PathBuf>) -> Result<(), TaskError> {
    let meta = match std::fs::symlink_metadata(root) {
        Ok(meta) => meta,
        Err(e) if tether_common::is_missing(&e) => return Ok(()),
        Err(e) => return Err(TaskError::io(root, e)),
    };

    if meta.is_file() {
        out.push(root.to_path_buf());
    } else if meta.is_dir() {
        let mut entries = std::fs::read_dir(root)
            .map_err(|e| TaskError::io(root, e))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TaskError::io(root, e))?;
        entries.sort();
        for entry in entries {
            collect_files(&entry, out)?;
        }
    }
    Ok(())
}
