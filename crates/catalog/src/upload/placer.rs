use crate::category::{Category, CategoryRegistry};
use crate::error::{ErrorKind, Result};
use crate::upload::conflict::{CollisionPolicy, candidates};
use appshelf_storage::backend::{ExtensionBackend, StorageBackend};
use appshelf_storage::error::ErrorKind as StorageErrorKind;
use appshelf_storage::{BackendHandle, validate_file_name};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound on a single upload.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// An uploaded file, consumed once by [`Placer::place`].
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub category: Category,
    /// Name declared by the uploader.
    pub file_name: String,
    pub content: Vec<u8>,
}

impl UploadRequest {
    pub fn new(category: Category, file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            category,
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> u64 {
        u64::try_from(self.content.len()).unwrap_or(u64::MAX)
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placed {
    pub category: Category,
    /// Final file name, which differs from the declared one only when the
    /// [`Rename`](CollisionPolicy::Rename) policy picked an alternative.
    pub name: String,
    /// Path relative to the storage root.
    pub path: PathBuf,
    pub size: u64,
}

/// Validates uploads and writes them into their category directory.
pub struct Placer {
    backend: BackendHandle,
    registry: Arc<CategoryRegistry>,
    policy: CollisionPolicy,
    max_bytes: Option<u64>,
    timeout: Duration,
}

impl Placer {
    pub fn new(backend: BackendHandle, registry: Arc<CategoryRegistry>) -> Self {
        Self {
            backend,
            registry,
            policy: CollisionPolicy::default(),
            max_bytes: None,
            timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reject uploads larger than `max_bytes` (no limit for `None`).
    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Check a request without writing anything.
    ///
    /// In order: the name must be a single path component, the content must
    /// fit the size limit, and the extension must be the one the category
    /// accepts.
    pub fn validate(&self, request: &UploadRequest) -> Result<()> {
        let name = request.file_name.as_str();
        if validate_file_name(name).is_err() {
            exn::bail!(ErrorKind::InvalidFileName(name.to_string()));
        }
        if let Some(limit) = self.max_bytes
            && request.size() > limit
        {
            exn::bail!(ErrorKind::TooLarge {
                size: request.size(),
                limit
            });
        }
        let spec = self.registry.get(request.category);
        if !spec.accepts(name) {
            exn::bail!(ErrorKind::UnsupportedFileType {
                category: request.category,
                name: name.to_string(),
                expected: spec.extension().to_string(),
            });
        }
        Ok(())
    }

    /// Validate `request` and write it into its category directory.
    ///
    /// The directory is created if it is missing; concurrent uploads into a
    /// brand new category both succeed. Writing runs under the placer
    /// timeout. Nothing is written if validation fails.
    #[tracing::instrument(level = "debug", skip_all, fields(category = %request.category, name = %request.file_name))]
    pub async fn place(&self, request: UploadRequest) -> Result<Placed> {
        let result = match self.validate(&request) {
            Ok(()) => crate::within(self.timeout, self.store(request)).await,
            Err(err) => Err(err),
        };
        match &result {
            Ok(placed) => tracing::info!(path = %placed.path.display(), bytes = placed.size, "Stored upload"),
            Err(err) => {
                let kind: &ErrorKind = err;
                match kind.is_rejection() {
                    true => tracing::info!(error = %kind, "Rejected upload"),
                    false => tracing::error!(error = %kind, retryable = kind.is_retryable(), "Failed to store upload"),
                }
            },
        }
        result
    }

    async fn store(&self, request: UploadRequest) -> Result<Placed> {
        let spec = self.registry.get(request.category);
        let target = ExtensionBackend::new(Arc::clone(&self.backend), spec.extension());
        target.ensure_dir(spec.directory()).await.map_err(ErrorKind::storage_write)?;

        let size = request.size();
        let name = match self.policy {
            CollisionPolicy::Overwrite => {
                let path = spec.path_for(&request.file_name);
                target.write(&path, &request.content).await.map_err(ErrorKind::storage_write)?;
                request.file_name
            },
            CollisionPolicy::Reject => {
                let path = spec.path_for(&request.file_name);
                match target.write_new(&path, &request.content).await {
                    Ok(()) => request.file_name,
                    Err(err) if matches!(&*err, StorageErrorKind::AlreadyExists(_)) => {
                        return Err(err.raise(ErrorKind::AlreadyExists(request.file_name)));
                    },
                    Err(err) => return Err(ErrorKind::storage_write(err)),
                }
            },
            CollisionPolicy::Rename => self.store_renamed(&target, request.category, &request).await?,
        };
        Ok(Placed {
            category: request.category,
            path: spec.path_for(&name),
            name,
            size,
        })
    }

    async fn store_renamed(
        &self,
        target: &ExtensionBackend,
        category: Category,
        request: &UploadRequest,
    ) -> Result<String> {
        let spec = self.registry.get(category);
        for name in candidates(&request.file_name) {
            match target.write_new(&spec.path_for(&name), &request.content).await {
                Ok(()) => return Ok(name),
                Err(err) if matches!(&*err, StorageErrorKind::AlreadyExists(_)) => {
                    tracing::debug!(%name, "Name taken; trying the next one");
                },
                Err(err) => return Err(ErrorKind::storage_write(err)),
            }
        }
        exn::bail!(ErrorKind::AlreadyExists(request.file_name.clone()))
    }
}
