//! Fingerprint of a single file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tether_common::ContentHash;

use crate::error::CacheError;

/// Snapshot of one file's identity: modification time, size and content hash.
///
/// Constructing from a path stats the file once. The content hash is only
/// computed the first time it is requested and cached afterwards, so
/// unchanged files are never read.
#[derive(Debug)]
pub struct FileState {
    path: PathBuf,
    /// Nanoseconds since the Unix epoch.
    last_modified: u64,
    size: u64,
    /// `Some(None)` means the hash is known to be unavailable.
    content_hash: OnceLock<Option<ContentHash>>,
}

impl FileState {
    /// Stats `path` and captures its modification time and size.
    pub fn from_path(path: &Path) -> Result<Self, CacheError> {
        let metadata = std::fs::metadata(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let last_modified = metadata.modified().map(epoch_nanos).unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            last_modified,
            size: metadata.len(),
            content_hash: OnceLock::new(),
        })
    }

    /// Builds a state from previously recorded values.
    ///
    /// The hash is taken as given and never recomputed.
    pub fn from_parts(
        path: impl Into<PathBuf>,
        last_modified: u64,
        size: u64,
        content_hash: Option<ContentHash>,
    ) -> Self {
        Self {
            path: path.into(),
            last_modified,
            size,
            content_hash: OnceLock::from(content_hash),
        }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time in nanoseconds since the Unix epoch.
    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    /// File size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Content hash of the file, computed on first access.
    ///
    /// Returns `None` if the file could not be read when the hash was first
    /// needed.
    pub fn content_hash(&self) -> Option<ContentHash> {
        *self
            .content_hash
            .get_or_init(|| ContentHash::from_file(&self.path).ok())
    }

    /// Returns `true` once the content hash has been computed or supplied.
    pub fn is_hashed(&self) -> bool {
        self.content_hash.get().is_some()
    }

    /// Checks whether this state differs from `other`, cheapest check first.
    ///
    /// Equal modification times mean "unchanged" without looking further.
    /// Otherwise a size difference means "changed", and equal sizes fall back
    /// to comparing content hashes. Comparing states of different paths is
    /// an error.
    pub fn is_different_than(&self, other: &FileState) -> Result<bool, CacheError> {
        if self.path != other.path {
            return Err(CacheError::InvalidComparison {
                left: self.path.clone(),
                right: other.path.clone(),
            });
        }

        if self.last_modified == other.last_modified {
            return Ok(false);
        }
        if self.size != other.size {
            return Ok(true);
        }

        Ok(match (self.content_hash(), other.content_hash()) {
            (Some(a), Some(b)) => a != b,
            _ => true,
        })
    }

    pub(crate) fn to_record(&self) -> FileStateRecord {
        FileStateRecord {
            path: self.path.clone(),
            last_modified: self.last_modified,
            size: self.size,
            content_hash: self.content_hash(),
        }
    }
}

impl Clone for FileState {
    fn clone(&self) -> Self {
        let content_hash = OnceLock::new();
        if let Some(hash) = self.content_hash.get() {
            let _ = content_hash.set(*hash);
        }
        Self {
            path: self.path.clone(),
            last_modified: self.last_modified,
            size: self.size,
            content_hash,
        }
    }
}

/// Persisted form of a [`FileState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileStateRecord {
    pub path: PathBuf,
    pub last_modified: u64,
    pub size: u64,
    #[serde(default)]
    pub content_hash: Option<ContentHash>,
}

impl From<FileStateRecord> for FileState {
    fn from(record: FileStateRecord) -> Self {
        FileState::from_parts(
            record.path,
            record.last_modified,
            record.size,
            record.content_hash,
        )
    }
}

/// Nanoseconds since the Unix epoch, saturating at `u64::MAX`. Times before
/// the epoch map to zero.
fn epoch_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
