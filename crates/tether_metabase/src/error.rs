//! Error types for metabase ingestion and reference persistence.

use std::path::PathBuf;

/// Errors raised while loading or validating a metabase or reference set.
#[derive(Debug, thiserror::Error)]
pub enum MetabaseError {
    /// An I/O error occurred while reading or writing a file.
    #[error("metabase I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The JSON content could not be parsed.
    #[error("failed to parse metabase: {reason}")]
    Parse {
        /// Description of the parse failure.
        reason: String,
    },

    /// A qualified type name is not usable as a type key.
    #[error("invalid type name '{name}': {reason}")]
    InvalidName {
        /// The offending name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// The same qualified name was declared twice.
    #[error("duplicate type '{0}'")]
    DuplicateType(String),

    /// A descriptor carries a field that is meaningless for its kind.
    #[error("type '{name}' of kind {kind} cannot declare '{field}'")]
    KindMismatch {
        /// The type whose descriptor is malformed.
        name: String,
        /// The declared kind.
        kind: &'static str,
        /// The field that does not belong to that kind.
        field: &'static str,
    },

    /// A value could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = MetabaseError::Io {
            path: PathBuf::from("/tmp/metabase.json.gz"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("metabase I/O error"));
        assert!(msg.contains("metabase.json.gz"));
    }

    #[test]
    fn invalid_name_display() {
        let err = MetabaseError::InvalidName {
            name: "a/b".to_string(),
            reason: "contains a path separator",
        };
        assert_eq!(
            err.to_string(),
            "invalid type name 'a/b': contains a path separator"
        );
    }

    #[test]
    fn kind_mismatch_display() {
        let err = MetabaseError::KindMismatch {
            name: "android.R$id".to_string(),
            kind: "enum",
            field: "methods",
        };
        assert_eq!(
            err.to_string(),
            "type 'android.R$id' of kind enum cannot declare 'methods'"
        );
    }

    #[test]
    fn duplicate_display() {
        let err = MetabaseError::DuplicateType("java.lang.Object".to_string());
        assert_eq!(err.to_string(), "duplicate type 'java.lang.Object'");
    }
}
