//! Path validation and security utilities.
//!
//! This module provides functions to validate storage paths and prevent
//! security issues like path traversal attacks.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage path for security and correctness.
/// Ensures that paths don't escape the storage root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use appshelf_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("android/app.apk").is_ok());
/// assert!(validate_path("a/../app.apk").is_ok()); // (never leaves storage root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err()); // (leaves storage root)
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/.././windows//./setup.exe/").unwrap(),
///     Path::new("windows/setup.exe")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls, reject them explicitly.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Validates a bare file name, as supplied by an uploader.
///
/// Stricter than [`validate`]: the name must be exactly one normal path
/// component, so it can only ever refer to an entry directly inside the
/// directory it is joined onto. Separators, `.`/`..` and null bytes are all
/// rejected rather than resolved.
///
/// ```
/// use appshelf_storage::validate_file_name;
/// assert!(validate_file_name("app.apk").is_ok());
/// assert!(validate_file_name("nested/app.apk").is_err());
/// assert!(validate_file_name("..").is_err());
/// ```
pub fn validate_file_name(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(s)), None) if s == name && !name.contains('\0') => Ok(name),
        _ => exn::bail!(ErrorKind::InvalidPath(PathBuf::from(name))),
    }
}

/// Check whether the final extension of `path` is `extension`, ignoring
/// ASCII case.
///
/// Only the last extension counts (`app.apk.txt` is a `txt` file), and names
/// without any extension never match:
/// - `app.apk` / `apk` -> true
/// - `APP.APK` / `apk` -> true
/// - `app.apk.txt` / `apk` -> false
/// - `.apk` / `apk` -> false (hidden file named "apk", no extension)
pub fn has_extension(path: impl AsRef<Path>, extension: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate(Path::new("android/app.apk")).unwrap(), Path::new("android/app.apk"));
        assert_eq!(validate(Path::new("a/b/c/file.exe")).unwrap(), Path::new("a/b/c/file.exe"));
        assert_eq!(validate(Path::new("simple.apk")).unwrap(), Path::new("simple.apk"));
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(validate(Path::new("a//b//c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/./b/./c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("windows///")).unwrap(), Path::new("windows"));
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate(Path::new("../etc/passwd")).is_err());
        assert!(validate(Path::new("a/../../b")).is_err());
        assert!(validate(Path::new("..")).is_err());
        assert!(validate(Path::new("../..")).is_err());
        // Traversal that stays inside the root is resolved
        assert_eq!(validate(Path::new("a/b/..")).unwrap(), Path::new("a"));
    }

    #[test]
    fn test_invalid_characters_and_empty() {
        assert!(validate(Path::new("a\0b")).is_err());
        assert!(validate(Path::new("")).is_err());
        assert!(validate(Path::new(".")).is_err());
        assert!(validate(Path::new("//")).is_err());
    }

    #[rstest]
    #[case("app.apk", true)]
    #[case("My App (v2).apk", true)]
    #[case(".hidden.apk", true)]
    #[case("", false)]
    #[case(".", false)]
    #[case("..", false)]
    #[case("a/b.apk", false)]
    #[case("/app.apk", false)]
    #[case("./app.apk", false)]
    #[case("app.apk/", false)]
    #[case("a\0.apk", false)]
    fn test_validate_file_name(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_file_name(name).is_ok(), valid, "{name:?}");
    }

    #[rstest]
    #[case("app.apk", "apk", true)]
    #[case("APP.APK", "apk", true)]
    #[case("android/app.Apk", "apk", true)]
    #[case("setup.exe", "apk", false)]
    #[case("app.apk.txt", "apk", false)]
    #[case("app", "apk", false)]
    #[case(".apk", "apk", false)]
    #[case("apk", "apk", false)]
    fn test_has_extension(#[case] path: &str, #[case] extension: &str, #[case] expected: bool) {
        assert_eq!(has_extension(path, extension), expected, "{path:?}");
    }
}
