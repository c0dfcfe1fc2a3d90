//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied (permissions or ownership)
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// File already exists (for operations that require new files)
    #[display("file already exists: {}", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    /// Something other than a directory occupies a directory path
    #[display("not a directory: {}", _0.display())]
    NotADirectory(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
    /// Path rejected by extension filter (e.g. ExtensionBackend)
    #[display("filtered path: {}", _0.display())]
    FilteredPath(#[error(not(source))] PathBuf),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Map an I/O error that happened while touching `path` onto the
    /// actionable categories above.
    pub fn from_io(err: IoError, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.into()),
            std::io::ErrorKind::NotADirectory => Self::NotADirectory(path.into()),
            _ => Self::Io(err),
        }
    }
}
