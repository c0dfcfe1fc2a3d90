//! Catalog
//!
//! Holds the latest scan result for every category and publishes new ones.
//!
//! Lifecycle: a catalog starts out empty, each [`refresh`](Catalog::refresh)
//! replaces the records of every category whose scan succeeded, and readers
//! take cheap [`Snapshot`] clones at any time. A category whose scan fails
//! keeps its previous records, and the failure is recorded in its
//! [`CategoryStatus`].

use crate::category::{Category, CategoryRegistry};
use crate::error::Error;
use crate::listing::Snapshot;
use crate::record::FileRecord;
use crate::scan::scan;
use appshelf_storage::BackendHandle;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};

/// Default per-category scan timeout.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Operator-facing health of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryStatus {
    /// When the category was last scanned successfully.
    pub last_success: Option<OffsetDateTime>,
    /// Why the most recent scan failed, cleared by the next success.
    pub last_error: Option<String>,
    /// Number of records currently published for the category.
    pub files: usize,
}

impl CategoryStatus {
    pub fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }
}

/// Result of scanning one category during a refresh.
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: Category,
    /// Number of records published, or why the previous ones were kept.
    pub result: Result<usize, Error>,
}

/// What a single [`Catalog::refresh`] did.
#[derive(Debug)]
pub struct RefreshReport {
    /// Monotonic counter, incremented once per completed refresh.
    pub generation: u64,
    pub outcomes: Vec<CategoryOutcome>,
}

impl RefreshReport {
    /// `true` if every category was scanned successfully.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (Category, &Error)> {
        self.outcomes.iter().filter_map(|outcome| outcome.result.as_ref().err().map(|err| (outcome.category, err)))
    }
}

#[derive(Default)]
struct State {
    snapshot: Snapshot,
    status: [CategoryStatus; 2],
    generation: u64,
}

/// The shared, refreshable catalog of every category's files.
pub struct Catalog {
    backend: BackendHandle,
    registry: Arc<CategoryRegistry>,
    timeout: Duration,
    state: RwLock<State>,
    // Serialises whole refreshes so two of them never interleave their
    // publications.
    refreshing: Mutex<()>,
}

impl Catalog {
    pub fn new(backend: BackendHandle, registry: Arc<CategoryRegistry>) -> Self {
        Self {
            backend,
            registry,
            timeout: DEFAULT_SCAN_TIMEOUT,
            state: RwLock::new(State::default()),
            refreshing: Mutex::new(()),
        }
    }

    /// Upper bound on each category's scan.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn registry(&self) -> &Arc<CategoryRegistry> {
        &self.registry
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    /// Re-scan every category and publish the results.
    ///
    /// Categories are scanned concurrently, each under the catalog timeout.
    /// Results are published together once every scan has finished, so a
    /// reader never sees one category from this refresh next to another
    /// from the previous one, unless the other failed and deliberately kept
    /// its previous records.
    pub async fn refresh(&self) -> RefreshReport {
        let _refreshing = self.refreshing.lock().await;
        let scans = Category::ALL.map(|category| {
            crate::within(self.timeout, scan(&self.backend, &self.registry, category))
        });
        let results = futures::future::join_all(scans).await;

        let now = OffsetDateTime::now_utc();
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.generation += 1;
        let generation = state.generation;
        let mut outcomes = Vec::with_capacity(Category::ALL.len());
        for (category, result) in Category::ALL.into_iter().zip(results) {
            let status = &mut state.status[category.index()];
            let result = match result {
                Ok(records) => {
                    let files = records.len();
                    *status = CategoryStatus {
                        last_success: Some(now),
                        last_error: None,
                        files,
                    };
                    state.snapshot.replace(category, records);
                    tracing::debug!(%category, files, generation, "Published category records");
                    Ok(files)
                },
                Err(err) => {
                    let message = (*err).to_string();
                    tracing::warn!(
                        %category,
                        error = %message,
                        retryable = err.is_retryable(),
                        generation,
                        "Category scan failed; keeping previous records"
                    );
                    status.last_error = Some(message);
                    Err(err)
                },
            };
            outcomes.push(CategoryOutcome { category, result });
        }
        tracing::info!(generation, files = state.snapshot.len(), "Catalog refreshed");
        RefreshReport { generation, outcomes }
    }

    /// The records published by the most recent successful scans.
    pub async fn current(&self) -> Snapshot {
        self.state.read().await.snapshot.clone()
    }

    /// One category's published records.
    pub async fn records(&self, category: Category) -> Arc<[FileRecord]> {
        self.state.read().await.snapshot.shared(category)
    }

    pub async fn status(&self, category: Category) -> CategoryStatus {
        self.state.read().await.status[category.index()].clone()
    }

    /// Number of refreshes completed so far.
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }
}
