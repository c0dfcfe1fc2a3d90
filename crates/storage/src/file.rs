//! Metadata for files held by a storage backend.

use std::path::PathBuf;
use time::OffsetDateTime;

/// File metadata returned by storage backends.
///
/// This represents information about a file in storage, used for listing
/// and stat operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
        }
    }

    /// Final component of the path, if it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}
