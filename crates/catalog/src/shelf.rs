//! Query façade over the catalog engine.
//!
//! [`Shelf`] is what a presentation layer talks to: it lists files, accepts
//! uploads, and keeps the active search term so that views and statistics
//! stay consistent with each other across refreshes.

use crate::catalog::{Catalog, CategoryStatus, RefreshReport};
use crate::category::{Category, CategoryRegistry};
use crate::error::{ErrorKind, Result};
use crate::listing::View;
use crate::record::FileEntry;
use crate::scan::scan;
use crate::search::{SearchTerm, filter};
use crate::stats::{Stats, aggregate};
use crate::upload::{Placed, Placer, UploadRequest};
use appshelf_storage::BackendHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of [`Shelf::upload_file`], shaped for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}

pub struct Shelf {
    catalog: Arc<Catalog>,
    placer: Placer,
    search: RwLock<SearchTerm>,
}

impl Shelf {
    /// A shelf with default catalog and placer settings.
    pub fn new(backend: BackendHandle, registry: Arc<CategoryRegistry>) -> Self {
        let catalog = Arc::new(Catalog::new(Arc::clone(&backend), Arc::clone(&registry)));
        Self::from_parts(catalog, Placer::new(backend, registry))
    }

    /// Both parts should share a backend and registry; the placer writes
    /// where the catalog scans.
    pub fn from_parts(catalog: Arc<Catalog>, placer: Placer) -> Self {
        Self {
            catalog,
            placer,
            search: RwLock::new(SearchTerm::empty()),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Scan `category` right now and return its files, ignoring the search
    /// term and the published snapshot.
    pub async fn list_files(&self, category: Category) -> Result<Vec<FileEntry>> {
        let scanning = scan(self.catalog.backend(), self.catalog.registry(), category);
        let records = crate::within(self.catalog.timeout(), scanning).await?;
        Ok(records.iter().map(FileEntry::from).collect())
    }

    /// Place an upload and, if it was stored, refresh the catalog so it
    /// shows up. Nothing is refreshed after a failure.
    pub async fn upload(&self, request: UploadRequest) -> Result<Placed> {
        let placed = self.placer.place(request).await?;
        self.catalog.refresh().await;
        Ok(placed)
    }

    /// [`upload`](Self::upload) with the result flattened into an
    /// [`UploadResponse`].
    pub async fn upload_file(
        &self,
        category: Category,
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> UploadResponse {
        match self.upload(UploadRequest::new(category, file_name, content)).await {
            Ok(_) => UploadResponse::ok(),
            Err(err) => UploadResponse::failed((*err).to_string()),
        }
    }

    /// Set the search term used by [`view`](Self::view) and
    /// [`stats`](Self::stats). It stays in effect across refreshes.
    pub async fn set_search(&self, raw: impl AsRef<str>) {
        let term = SearchTerm::new(raw);
        tracing::debug!(term = %term, "Search term changed");
        *self.search.write().await = term;
    }

    pub async fn clear_search(&self) {
        self.set_search("").await;
    }

    pub async fn search(&self) -> SearchTerm {
        self.search.read().await.clone()
    }

    /// The current snapshot, filtered by the current search term.
    /// Recomputed on every call.
    pub async fn view(&self) -> View {
        let term = self.search().await;
        filter(&self.catalog.current().await, &term)
    }

    /// Statistics over [`view`](Self::view).
    pub async fn stats(&self) -> Stats {
        aggregate(&self.view().await)
    }

    pub async fn refresh(&self) -> RefreshReport {
        self.catalog.refresh().await
    }

    /// The catalog's status for `category`, or
    /// [`ErrorKind::DirectoryUnavailable`] if nothing has been uploaded to
    /// it yet.
    pub async fn category_status(&self, category: Category) -> Result<CategoryStatus> {
        let directory = self.catalog.registry().get(category).directory();
        let exists = self
            .catalog
            .backend()
            .dir_exists(directory)
            .await
            .map_err(|err| ErrorKind::scan_io(category, err))?;
        if !exists {
            exn::bail!(ErrorKind::DirectoryUnavailable(category));
        }
        Ok(self.catalog.status(category).await)
    }
}
