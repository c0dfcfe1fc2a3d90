//! Directory Scanner
//!
//! Turns the current contents of one category directory into an ordered
//! sequence of [`FileRecord`]s. Files whose extension doesn't belong to the
//! category are dropped by an [`ExtensionBackend`] before they are ever
//! turned into records.

use crate::category::{Category, CategoryRegistry};
use crate::error::{ErrorKind, Result};
use crate::record::FileRecord;
use appshelf_storage::backend::{ExtensionBackend, StorageBackend};
use appshelf_storage::BackendHandle;
use futures::TryStreamExt;
use std::sync::Arc;

/// Scan one category directory.
///
/// A directory that doesn't exist yet scans as empty. Any other failure to
/// read it, including a file sitting where the directory should be, is an
/// [`ErrorKind::ScanIo`], so that "no files" and "broken mount" stay
/// distinguishable. Records come back in the order the backend
/// listed them.
#[tracing::instrument(level = "debug", skip(backend, registry), fields(backend = backend.name()))]
pub async fn scan(backend: &BackendHandle, registry: &CategoryRegistry, category: Category) -> Result<Vec<FileRecord>> {
    match scan_existing(backend, registry, category).await {
        Err(err) if matches!(&*err, ErrorKind::DirectoryUnavailable(_)) => {
            tracing::debug!("Category directory does not exist yet; nothing to scan");
            Ok(Vec::new())
        },
        result => result,
    }
}

/// Like [`scan`], but a missing directory is reported as
/// [`ErrorKind::DirectoryUnavailable`] instead of an empty result.
pub async fn scan_existing(
    backend: &BackendHandle,
    registry: &CategoryRegistry,
    category: Category,
) -> Result<Vec<FileRecord>> {
    let spec = registry.get(category);
    let exists = backend.dir_exists(spec.directory()).await.map_err(|e| ErrorKind::scan_io(category, e))?;
    if !exists {
        exn::bail!(ErrorKind::DirectoryUnavailable(category));
    }

    let filtered = ExtensionBackend::new(Arc::clone(backend), spec.extension());
    let mut files = filtered.list_stream(Some(spec.directory()));
    let mut records = Vec::new();
    while let Some(info) = files.try_next().await.map_err(|e| ErrorKind::scan_io(category, e))? {
        match FileRecord::from_info(&info) {
            Some(record) => records.push(record),
            None => tracing::warn!(path = %info.path.display(), "Skipping file with a non UTF-8 name"),
        }
    }
    tracing::debug!(files = records.len(), "Scanned category directory");
    Ok(records)
}
