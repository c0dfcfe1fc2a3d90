//! Catalogued file records.

use appshelf_storage::FileInfo;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One file found by a scan. Immutable: a refresh produces new records
/// rather than updating old ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    name: String,
    size: u64,
    modified: OffsetDateTime,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, size: u64, modified: OffsetDateTime) -> Self {
        Self {
            name: name.into(),
            size,
            modified,
        }
    }

    /// Build a record from storage metadata. Returns `None` when the file
    /// name isn't valid UTF-8, since it could never be searched or served.
    pub fn from_info(info: &FileInfo) -> Option<Self> {
        info.file_name().map(|name| Self::new(name, info.size, info.modified))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> OffsetDateTime {
        self.modified
    }

    /// Modification time in whole seconds since the Unix epoch, rounded down.
    pub fn last_modified_epoch(&self) -> i64 {
        self.modified.unix_timestamp()
    }
}

/// Wire shape of a [`FileRecord`] for the query interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    /// Seconds since the Unix epoch.
    #[serde(rename = "lastModified")]
    pub last_modified: i64,
}

impl From<&FileRecord> for FileEntry {
    fn from(record: &FileRecord) -> Self {
        Self {
            name: record.name.clone(),
            size: record.size,
            last_modified: record.last_modified_epoch(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_last_modified_epoch_rounds_down() {
        let modified = OffsetDateTime::UNIX_EPOCH + Duration::milliseconds(1_700_000_000_999);
        let record = FileRecord::new("app.apk", 10, modified);
        assert_eq!(record.last_modified_epoch(), 1_700_000_000);
    }

    #[test]
    fn test_from_info() {
        let info = FileInfo::new("android/app.apk", 42, OffsetDateTime::UNIX_EPOCH);
        let record = FileRecord::from_info(&info).unwrap();
        assert_eq!(record.name(), "app.apk");
        assert_eq!(record.size(), 42);
    }

    #[test]
    fn test_entry_serialization() {
        let record = FileRecord::new("app.apk", 1024, OffsetDateTime::UNIX_EPOCH + Duration::seconds(60));
        let json = serde_json::to_value(FileEntry::from(&record)).unwrap();
        assert_eq!(json, serde_json::json!({"name": "app.apk", "size": 1024, "lastModified": 60}));
    }
}
