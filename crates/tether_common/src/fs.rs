//! Filesystem helpers for persisted build state.

use std::io::Write;
use std::path::Path;

/// Returns `true` if `err` means the path does not exist.
///
/// A path running through a regular file (`file.txt/child`) counts as
/// missing as well.
pub fn is_missing(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}

/// Writes `contents` to `path` so that the file is either fully replaced or
/// left untouched.
///
/// The data goes to a uniquely named temporary file in the same directory,
/// which is then renamed over the destination. Parent directories are
/// created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
