//! Error types shared across difflens crates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A user-supplied path that cannot be used as given.
#[derive(Debug, Error)]
pub enum PathError {
    /// Path does not exist.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// A directory was required.
    #[error("Path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A file was required but the path points at a directory.
    #[error("Path points to a directory, but a file is needed: {path}")]
    NotAFile { path: PathBuf },

    /// `~` expansion was requested but no home directory is known.
    #[error("Cannot expand {path}: home directory is unknown")]
    HomeDirUnavailable { path: PathBuf },

    /// The working directory could not be determined.
    #[error("Cannot resolve {path} against the working directory: {source}")]
    CurrentDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The root path failed validation.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path vanished while scanning.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// An observation did not fit the shape of the fingerprint tree.
    #[error("Inconsistent fingerprint tree at {path}: {message}")]
    InconsistentTree { path: String, message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A symbolic link was skipped.
    Symlink,
    /// A directory could not be listed.
    ReadDirError,
}

/// Non-fatal anomaly encountered during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    fn new(path: PathBuf, message: String, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a skipped-symlink warning.
    pub fn symlink(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let message = format!("Found a symbolic link at path {}, skipping", path.display());
        Self::new(path, message, WarningKind::Symlink)
    }

    /// Create an unreadable-directory warning.
    pub fn read_dir_error(path: impl Into<PathBuf>, error: &dyn std::fmt::Display) -> Self {
        let path = path.into();
        let message = format!("Could not read directory {}: {error}", path.display());
        Self::new(path, message, WarningKind::ReadDirError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_io() {
        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::PermissionDenied { .. }));

        let err = ScanError::io("/test/path", std::io::Error::other("boom"));
        assert!(matches!(err, ScanError::Io { .. }));
    }

    #[test]
    fn test_path_error_converts() {
        let err: ScanError = PathError::NotADirectory { path: "/etc/hosts".into() }.into();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_symlink_warning() {
        let warning = ScanWarning::symlink("/test/link");
        assert_eq!(warning.kind, WarningKind::Symlink);
        assert!(warning.message.contains("symbolic link"));
    }
}
