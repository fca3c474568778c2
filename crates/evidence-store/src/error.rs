//! Error type for tree hashing and manifest assembly

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout the store.
pub type Result<T> = std::result::Result<T, ProvenanceError>;

/// Coarse classification of a [`ProvenanceError`].
///
/// Callers branch on this rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad path, unknown source or missing parameter. Raised before any hashing.
    InvalidInput,
    /// A file or directory could not be read or written.
    IoFailure,
    /// The scan produced nothing to certify.
    EmptyResult,
}

#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("unknown source '{name}' (known: {known})")]
    UnknownSource { name: String, known: String },

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no files found under {}; refusing to certify an empty ingest", dirs_display(.0))]
    EmptyIngest(Vec<PathBuf>),

    #[error("artifact already exists: {}", .0.display())]
    ArtifactExists(PathBuf),

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: invalid artifact: {reason}", .path.display())]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("{}: unsupported file name: {reason}", .path.display())]
    UnsupportedFileName { path: PathBuf, reason: &'static str },

    #[error("{}: symlink loops back to an enclosing directory", .0.display())]
    SymlinkLoop(PathBuf),
}

fn dirs_display(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ProvenanceError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotADirectory(_)
            | Self::UnknownSource { .. }
            | Self::MissingParameter(_)
            | Self::InvalidArtifact { .. }
            | Self::UnsupportedFileName { .. }
            | Self::SymlinkLoop(_) => ErrorKind::InvalidInput,
            Self::Io { .. } | Self::ArtifactExists(_) | Self::Serialize { .. } => {
                ErrorKind::IoFailure
            }
            Self::EmptyIngest(_) => ErrorKind::EmptyResult,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind as IoKind;

    #[test]
    fn io_error_names_path() {
        let err = ProvenanceError::io(
            Path::new("/data/raw/a.csv"),
            std::io::Error::new(IoKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        let msg = err.to_string();
        assert!(msg.contains("/data/raw/a.csv"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn unknown_source_is_invalid_input() {
        let err = ProvenanceError::UnknownSource {
            name: "nope".into(),
            known: "a, b".into(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn empty_ingest_lists_dirs() {
        let err = ProvenanceError::EmptyIngest(vec!["raw".into(), "canonical".into()]);
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
        assert!(err.to_string().contains("raw, canonical"));
    }
}
