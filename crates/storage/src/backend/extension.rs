//! Extension-filtered storage backend decorator.
//!
//! Wraps another backend and restricts all file operations to a single file
//! extension, so that a directory meant for one kind of file can never list
//! or receive anything else.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{BackendHandle, StorageBackend, error::Result, has_extension};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;

/// Extension-filtered storage backend.
///
/// Listings silently drop files whose final extension doesn't match
/// (case-insensitively); every other file operation on a non-matching path
/// returns [`ErrorKind::FilteredPath`]. Directory operations pass straight
/// through.
#[derive(Clone)]
pub struct ExtensionBackend {
    inner: BackendHandle,
    extension: String,
}
impl ExtensionBackend {
    /// Wrap `inner`, accepting only files ending in `.{extension}`.
    ///
    /// A leading dot on `extension` is ignored.
    pub fn new(inner: BackendHandle, extension: impl AsRef<str>) -> Self {
        let extension = extension.as_ref().trim_start_matches('.').to_ascii_lowercase();
        Self { inner, extension }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn accepts(&self, path: impl AsRef<Path>) -> bool {
        has_extension(path, &self.extension)
    }

    fn check(&self, path: &Path) -> Result<()> {
        if !self.accepts(path) {
            exn::bail!(ErrorKind::FilteredPath(path.to_path_buf()));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for ExtensionBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream<'a>(&'a self, dir: Option<&'a Path>) -> FileInfoStream<'a> {
        Box::pin(self.inner.list_stream(dir).filter(|item| {
            std::future::ready(match item {
                Ok(info) => {
                    let keep = self.accepts(&info.path);
                    if !keep {
                        tracing::debug!(path = %info.path.display(), extension = %self.extension, "Ignoring file with foreign extension");
                    }
                    keep
                },
                Err(_) => true, // propagate errors
            })
        }))
    }

    async fn dir_exists(&self, dir: &Path) -> Result<bool> {
        self.inner.dir_exists(dir).await
    }

    async fn ensure_dir(&self, dir: &Path) -> Result<()> {
        self.inner.ensure_dir(dir).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.check(path)?;
        self.inner.write(path, data).await
    }

    async fn write_new(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.check(path)?;
        self.inner.write_new(path, data).await
    }
}
