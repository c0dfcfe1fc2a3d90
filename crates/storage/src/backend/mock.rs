//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    files: BTreeMap<PathBuf, (OffsetDateTime, Vec<u8>)>,
    dirs: BTreeSet<PathBuf>,
    failing: BTreeSet<PathBuf>,
}
impl State {
    fn add_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if !ancestor.as_os_str().is_empty() {
                self.dirs.insert(ancestor.to_path_buf());
            }
        }
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.dirs.contains(parent),
            _ => true,
        }
    }
}

/// In-memory storage backend for testing.
///
/// Files and directories live in ordered maps behind a [`RwLock`], so all
/// trait methods operate on `&self` and listings come back sorted by path.
/// Behaves like [`LocalBackend`](super::LocalBackend) where it matters to
/// callers: listings are flat, writes need an existing parent directory, and
/// missing directories list as empty.
///
/// Listing failures and latency can be injected to exercise error handling
/// and timeouts.
///
/// # Examples
///
/// ```
/// use appshelf_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("android/app.apk", b"PK.."),
/// ]);
/// assert_eq!(backend.contents("android/app.apk").await.as_deref(), Some(&b"PK.."[..]));
///
/// backend.write(Path::new("android/other.apk"), b"data...").await?;
/// assert_eq!(backend.list(Some(Path::new("android"))).await?.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    latency: Option<Duration>,
    state: RwLock<State>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files. Parent directories
    /// of every file are created implicitly.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut state = State::default();
        let now = OffsetDateTime::now_utc();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            state.add_ancestors(&validated);
            state.files.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            latency: None,
            state: RwLock::new(state),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Create an (empty) directory up front.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let state = self.state.get_mut();
        state.add_ancestors(&dir);
        state.dirs.insert(dir);
        self
    }

    /// Make every listing of `dir` fail with an I/O error.
    pub fn with_failing_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state.get_mut().failing.insert(dir.into());
        self
    }

    /// Sleep for `latency` at the start of every listing and write.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Toggle listing failures for `dir` at runtime.
    pub async fn set_failing(&self, dir: impl Into<PathBuf>, failing: bool) {
        let dir = dir.into();
        let mut state = self.state.write().await;
        match failing {
            true => state.failing.insert(dir),
            false => state.failing.remove(&dir),
        };
    }

    /// Current contents of the file at `path`, if there is one.
    pub async fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = validate_path(path.as_ref()).ok()?;
        self.state.read().await.files.get(&path).map(|(_, data)| data.clone())
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn insert(&self, path: &Path, data: &[u8], replace: bool) -> Result<()> {
        self.delay().await;
        let path = validate_path(path)?;
        let mut state = self.state.write().await;
        if !state.parent_exists(&path) {
            exn::bail!(ErrorKind::NotFound(path));
        }
        if state.dirs.contains(&path) || (!replace && state.files.contains_key(&path)) {
            exn::bail!(ErrorKind::AlreadyExists(path));
        }
        state.files.insert(path, (OffsetDateTime::now_utc(), data.to_vec()));
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, dir: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_dir = match dir.map(validate_path).transpose() {
            Ok(d) => d,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            self.delay().await;
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Result<Vec<FileInfo>> = {
                let guard = self.state.read().await;
                match &validated_dir {
                    Some(d) if guard.failing.contains(d) => Err(exn::Exn::from(ErrorKind::Io(std::io::Error::other(
                        format!("injected listing failure for {}", d.display()),
                    )))),
                    _ => Ok(guard
                        .files
                        .iter()
                        .filter(|(path, _)| match (&validated_dir, path.parent()) {
                            (Some(d), Some(parent)) => parent == d.as_path(),
                            (None, Some(parent)) => parent.as_os_str().is_empty(),
                            (_, None) => false,
                        })
                        .map(|(path, (modified, data))| FileInfo::new(path.clone(), data.len() as u64, *modified))
                        .collect()),
                }
            };
            match entries {
                Ok(entries) => for info in entries {
                    yield Ok(info);
                },
                Err(e) => yield Err(e),
            }
        })
    }

    async fn dir_exists(&self, dir: &Path) -> Result<bool> {
        let dir = validate_path(dir)?;
        let state = self.state.read().await;
        if state.files.contains_key(&dir) {
            exn::bail!(ErrorKind::NotADirectory(dir));
        }
        Ok(state.dirs.contains(&dir))
    }

    async fn ensure_dir(&self, dir: &Path) -> Result<()> {
        let dir = validate_path(dir)?;
        let mut state = self.state.write().await;
        if state.files.contains_key(&dir) {
            exn::bail!(ErrorKind::NotADirectory(dir));
        }
        state.add_ancestors(&dir);
        state.dirs.insert(dir);
        Ok(())
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.insert(path, data, true).await
    }

    async fn write_new(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.insert(path, data, false).await
    }
}
