pub mod backend;
pub mod error;
pub mod file;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::file::FileInfo;
pub use crate::path::{has_extension, validate as validate_path, validate_file_name};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
