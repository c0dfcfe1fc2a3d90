//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for the handful of filesystem operations the catalog needs:
//! flat directory listings, directory checks and creation, and whole-file
//! writes.

mod extension;
mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::extension::ExtensionBackend;
pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// All storage operations are asynchronous so directory scans and uploads
/// never block the runtime, and so that they can be raced against a timeout
/// by the caller.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use appshelf_storage::{backend::StorageBackend, error::Result};
///
/// async fn bytes_in(backend: &dyn StorageBackend, dir: &Path) -> Result<u64> {
///     let files = backend.list(Some(dir)).await?;
///     Ok(files.iter().map(|f| f.size).sum())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// List the files directly inside `dir` (or the storage root for `None`).
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self, dir: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(dir).try_collect().await
    }

    /// Stream metadata for the files directly inside `dir`.
    ///
    /// Listings are flat: subdirectories are skipped, not descended into.
    /// Entries are yielded in the order the underlying storage reports them.
    ///
    /// # Notes
    /// - Asking for the contents of a directory that doesn't exist yields an
    ///   empty stream, not an error. Use [`dir_exists()`](Self::dir_exists)
    ///   to tell "empty" and "missing" apart.
    /// - Any other failure to read the directory is yielded as an `Err` item.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use appshelf_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(Some(Path::new("android")));
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.path.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, dir: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check whether `dir` exists.
    ///
    /// Only a path that doesn't exist at all is `Ok(false)`. Fails with
    /// [`NotADirectory`](crate::error::ErrorKind::NotADirectory) if something
    /// other than a directory occupies the path.
    async fn dir_exists(&self, dir: &Path) -> Result<bool>;

    /// Create `dir` (and any missing parents) if it does not exist yet.
    ///
    /// Idempotent and safe to call concurrently: a directory that already
    /// exists, or that another caller creates at the same moment, is a
    /// success. Fails with [`NotADirectory`](crate::error::ErrorKind::NotADirectory)
    /// if something other than a directory occupies the path.
    async fn ensure_dir(&self, dir: &Path) -> Result<()>;

    /// Write file contents, replacing any existing file at `path`.
    ///
    /// # Notes
    /// - The parent directory must already exist, see
    ///   [`ensure_dir()`](Self::ensure_dir).
    /// - Readers observe either the previous contents or the complete new
    ///   contents, never a partially written file.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use appshelf_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// backend.ensure_dir(Path::new("android")).await?;
    /// backend.write(Path::new("android/app.apk"), b"PK...").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Write file contents to a path that must not exist yet.
    ///
    /// Returns [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists) if
    /// the path is taken. The existence check and the creation are a single
    /// atomic step, so two concurrent callers can never both succeed for the
    /// same path.
    async fn write_new(&self, path: &Path, data: &[u8]) -> Result<()>;
}
