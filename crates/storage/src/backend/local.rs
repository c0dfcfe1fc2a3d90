//! Local filesystem storage backend.
//!
//! This module provides a storage backend implementation for the local filesystem.
//! Files are stored in a configured directory and accessed using standard filesystem
//! operations via `tokio::fs` for async I/O.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};
use tokio::io::AsyncWriteExt;

/// Suffix for in-flight writes. Never matches a category extension, so a
/// half-written upload can't show up in a listing.
const PARTIAL_SUFFIX: &str = "part";

enum WalkEntry {
    File(FileInfo),
    Skip,
}

/// Local filesystem storage backend.
///
/// Stores files in a directory on the local filesystem. All paths are relative
/// to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use appshelf_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("downloads", "/srv/appshelf/downloads")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory holding one subdirectory per category
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the storage root directory
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::NotADirectory(root));
            }
        } else {
            // Blocking, but only ever runs once at startup.
            sync_create_dir(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        }

        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path for a relative storage path.
    ///
    /// Validates the path and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage path.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        if !absolute.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!(
                "attempting to get relative path of non-absolute path `{:?}`",
                absolute
            )))
        }
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        Ok(validate_path(relative)?)
    }

    fn metadata(path: &Path, metadata: Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(FileInfo::new(path, metadata.len(), OffsetDateTime::from(modified)))
    }

    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        // Follow symlinks, the same way a plain `stat` would.
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            // Deleted between the listing and the stat, or a dangling symlink.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(path = %path.display(), "Entry vanished during listing");
                return Ok(WalkEntry::Skip);
            },
            Err(e) => exn::bail!(ErrorKind::from_io(e, &path)),
        };
        if !metadata.is_file() {
            return Ok(WalkEntry::Skip);
        }
        let relative = self.relative_path(&path)?;
        Ok(WalkEntry::File(Self::metadata(&relative, metadata)?))
    }

    /// Stage `data` in a hidden sibling of `target`.
    ///
    /// The staged file is removed when the returned handle drops, so a write
    /// abandoned at any await point (a timeout, for one) leaves nothing behind.
    async fn stage(target: &Path, data: &[u8]) -> std::io::Result<NamedTempFile> {
        let dir = target.parent().ok_or_else(|| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
        let name = target.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let (prefix, suffix) = (format!(".{name}."), format!(".{PARTIAL_SUFFIX}"));
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(&suffix);
        // Published downloads must stay readable by whoever serves them.
        #[cfg(unix)]
        builder.permissions(std::os::unix::fs::PermissionsExt::from_mode(0o644));
        // Synchronous, so there is no window where the file exists but no
        // handle owns it yet.
        let staged = builder.tempfile_in(dir)?;
        let mut file = fs::File::from_std(staged.as_file().try_clone()?);
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(staged)
    }

    async fn write_in_place(target: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new().write(true).create_new(true).open(target).await?;
        file.write_all(data).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, dir: Option<&'a Path>) -> FileInfoStream<'a> {
        let current = match dir.map(|d| self.absolute_path(d)).transpose() {
            Ok(Some(current)) => current,
            Ok(None) => self.root.clone(),
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };

        Box::pin(stream! {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                // Asking for the contents of a directory that doesn't exist
                // results in an empty list not an error.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
                Err(err) => {
                    yield Err(exn::Exn::from(ErrorKind::from_io(err, &current)));
                    return;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    // A broken directory handle won't get any better by
                    // asking again; report it and stop.
                    Err(e) => {
                        yield Err(exn::Exn::from(ErrorKind::from_io(e, &current)));
                        break;
                    },
                };
                match self.process_entry(entry).await {
                    Ok(WalkEntry::File(f)) => yield Ok(f),
                    Ok(WalkEntry::Skip) => {},
                    Err(e) => yield Err(e),
                };
            }
        })
    }

    async fn dir_exists(&self, dir: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(dir)?;
        match fs::metadata(&abs_path).await {
            Ok(metadata) if metadata.is_dir() => Ok(true),
            // Something is there, but it can't hold any files.
            Ok(_) => exn::bail!(ErrorKind::NotADirectory(dir.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => exn::bail!(ErrorKind::from_io(e, dir)),
        }
    }

    async fn ensure_dir(&self, dir: &Path) -> Result<()> {
        let abs_path = self.absolute_path(dir)?;
        // `create_dir_all` already treats "created by somebody else in the
        // meantime" as success, which is what makes this safe to race.
        match fs::create_dir_all(&abs_path).await {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.kind(), std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::NotADirectory) => {
                exn::bail!(ErrorKind::NotADirectory(dir.to_path_buf()))
            },
            Err(e) => exn::bail!(ErrorKind::from_io(e, dir)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        let staged = Self::stage(&abs_path, data).await.map_err(|e| ErrorKind::from_io(e, path))?;
        // Rename replaces the target atomically, so readers see either the
        // old file or the new one.
        staged.persist(&abs_path).map_err(|e| ErrorKind::from_io(e.into(), path))?;
        Ok(())
    }

    async fn write_new(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        let staged = Self::stage(&abs_path, data).await.map_err(|e| ErrorKind::from_io(e, path))?;
        match staged.persist_noclobber(&abs_path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                exn::bail!(ErrorKind::AlreadyExists(path.to_path_buf()))
            },
            // Filesystems without hard links: claim the name directly instead.
            Err(e) if matches!(e.error.kind(), std::io::ErrorKind::Unsupported | std::io::ErrorKind::PermissionDenied) => {
                tracing::debug!(path = %path.display(), error = %e.error, "Exclusive rename unavailable; writing in place");
                Ok(Self::write_in_place(&abs_path, data).await.map_err(|e| ErrorKind::from_io(e, path))?)
            },
            Err(e) => exn::bail!(ErrorKind::from_io(e.into(), path)),
        }
    }
}
