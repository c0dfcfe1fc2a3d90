//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Storage failures are kept as child
//! frames underneath the catalog error that describes what the caller was
//! trying to do.

use crate::category::Category;
use appshelf_storage::error::Error as StorageError;
use derive_more::{Display, Error};
use std::time::Duration;

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies catalog failures.
///
/// ### Scan Errors
/// - [`ErrorKind::DirectoryUnavailable`]
/// - [`ErrorKind::ScanIo`]
///
/// ### Upload Errors
/// Rejections happen before anything touches the disk:
/// - [`ErrorKind::InvalidFileName`]
/// - [`ErrorKind::UnsupportedFileType`]
/// - [`ErrorKind::TooLarge`]
///
/// Failures happen while writing:
/// - [`ErrorKind::AlreadyExists`]
/// - [`ErrorKind::StorageWrite`]
///
/// ### Other
/// - [`ErrorKind::Timeout`]
/// - [`ErrorKind::UnknownCategory`]
/// - [`ErrorKind::InvalidRegistry`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The category directory does not exist (yet).
    #[display("directory for category {_0} is unavailable")]
    DirectoryUnavailable(#[error(not(source))] Category),
    /// The category directory exists but could not be listed.
    #[display("failed to scan {category}: {detail}")]
    ScanIo { category: Category, detail: String },
    /// The uploaded file's extension doesn't belong to the category.
    #[display("wrong file type for {category}: {name:?} is not a .{expected} file")]
    UnsupportedFileType {
        category: Category,
        name: String,
        expected: String,
    },
    /// The declared file name is empty or is not a single path component.
    #[display("invalid file name: {_0:?}")]
    InvalidFileName(#[error(not(source))] String),
    /// The upload exceeds the configured size limit.
    #[display("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    /// A file with that name already exists and the collision policy forbids
    /// replacing it.
    #[display("file already exists: {_0:?}")]
    AlreadyExists(#[error(not(source))] String),
    /// Creating the directory or writing the file failed.
    #[display("failed to store upload: {_0}")]
    StorageWrite(#[error(not(source))] String),
    /// The operation did not finish within the configured timeout.
    #[display("operation timed out after {}s", _0.as_secs_f64())]
    Timeout(#[error(not(source))] Duration),
    /// A category identifier could not be parsed.
    #[display("unknown category: {_0:?}")]
    UnknownCategory(#[error(not(source))] String),
    /// Category definitions are inconsistent with each other.
    #[display("invalid category definition: {_0}")]
    InvalidRegistry(#[error(not(source))] String),
}

impl ErrorKind {
    /// Wrap a storage listing failure, keeping the storage frame as a child.
    #[track_caller]
    pub(crate) fn scan_io(category: Category, err: StorageError) -> Error {
        let detail = (*err).to_string();
        err.raise(ErrorKind::ScanIo { category, detail })
    }

    /// Wrap a storage write failure, keeping the storage frame as a child.
    #[track_caller]
    pub(crate) fn storage_write(err: StorageError) -> Error {
        let detail = (*err).to_string();
        err.raise(ErrorKind::StorageWrite(detail))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ScanIo { .. } | Self::StorageWrite(_) | Self::Timeout(_))
    }

    /// Returns `true` if the request was refused before anything was written.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidFileName(_) | Self::UnsupportedFileType { .. } | Self::TooLarge { .. } | Self::AlreadyExists(_)
        )
    }
}
