//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A config file was asked for explicitly but isn't there.
    #[display("config file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The config file's extension isn't one of the supported formats.
    #[display("unsupported config format: {} (expected .toml, .yaml, .yml or .json)", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A source could not be parsed or didn't match the expected shape.
    #[display("failed to parse configuration")]
    Parse,
    /// Values parsed but don't make sense together.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
}
