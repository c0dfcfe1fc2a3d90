//! File catalog and validation engine.
//!
//! Files live in one directory per [`Category`]. The [`scan`] module turns a
//! directory into [`FileRecord`]s, the [`Catalog`] keeps the latest records
//! for every category, [`filter`] and [`aggregate`] derive views and
//! statistics from them, and the [`Placer`] validates and stores uploads.
//! [`Shelf`] ties these together for callers.

pub mod catalog;
pub mod category;
pub mod error;
mod listing;
mod record;
pub mod refresh;
pub mod scan;
mod search;
pub mod shelf;
mod stats;
pub mod upload;

pub use crate::catalog::{Catalog, CategoryStatus, RefreshReport};
pub use crate::category::{Category, CategoryRegistry, CategorySpec};
pub use crate::listing::{Listing, Snapshot, View};
pub use crate::record::{FileEntry, FileRecord};
pub use crate::refresh::Refresher;
pub use crate::search::{SearchTerm, filter};
pub use crate::shelf::{Shelf, UploadResponse};
pub use crate::stats::{Stats, aggregate};
pub use crate::upload::{CollisionPolicy, Placed, Placer, UploadRequest};

use crate::error::{ErrorKind, Result};
use std::time::Duration;

/// Run `operation`, failing with [`ErrorKind::Timeout`] if it takes longer
/// than `limit`.
pub(crate) async fn within<T>(limit: Duration, operation: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => exn::bail!(ErrorKind::Timeout(limit)),
    }
}
