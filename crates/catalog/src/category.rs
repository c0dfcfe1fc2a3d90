//! Category Registry
//!
//! The two platform groupings files are shelved under, and the directory and
//! extension each one is bound to.

use crate::error::{ErrorKind, Result};
use appshelf_storage::{has_extension, validate_path};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A platform grouping. Every catalogued file belongs to exactly one.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[display("mobile")]
    Mobile,
    #[display("desktop")]
    Desktop,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 2] = [Category::Mobile, Category::Desktop];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }

    /// Position in [`Category::ALL`], used to index per-category slots.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Mobile => 0,
            Self::Desktop => 1,
        }
    }
}

impl FromStr for Category {
    type Err = crate::error::Error;

    /// Accepts the category names and the directory names they were
    /// historically known by (`android`, `windows`), ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" | "android" => Ok(Self::Mobile),
            "desktop" | "windows" => Ok(Self::Desktop),
            _ => exn::bail!(ErrorKind::UnknownCategory(s.to_string())),
        }
    }
}

/// Where a category's files live and which extension they must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySpec {
    directory: PathBuf,
    extension: String,
}

impl CategorySpec {
    /// The extension is stored lower-case and without a leading dot.
    pub fn new(directory: impl Into<PathBuf>, extension: impl AsRef<str>) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.as_ref().trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    /// Directory relative to the storage root.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether a file called `name` belongs here. Only the final extension
    /// counts, compared case-insensitively; names without one never match.
    ///
    /// This is stricter than a plain suffix check: a bare `.apk` is a hidden
    /// file with no extension, so it is neither listed nor accepted for
    /// upload.
    pub fn accepts(&self, name: impl AsRef<Path>) -> bool {
        has_extension(name, &self.extension)
    }

    /// Relative path of `name` inside this category's directory.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }
}

/// Static mapping from [`Category`] to [`CategorySpec`]. Lookup is total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRegistry {
    specs: [CategorySpec; 2],
}

impl CategoryRegistry {
    /// Build a registry, rejecting definitions that would let the two
    /// categories bleed into each other or out of the storage root.
    pub fn new(mobile: CategorySpec, desktop: CategorySpec) -> Result<Self> {
        for (category, spec) in [(Category::Mobile, &mobile), (Category::Desktop, &desktop)] {
            if spec.directory.as_os_str().is_empty() {
                exn::bail!(ErrorKind::InvalidRegistry(format!("{category} has an empty directory")));
            }
            if validate_path(&spec.directory).is_err() {
                exn::bail!(ErrorKind::InvalidRegistry(format!(
                    "{category} directory {} escapes the storage root",
                    spec.directory.display()
                )));
            }
            if spec.extension.is_empty() || spec.extension.contains(['.', '/', '\\', '\0']) {
                exn::bail!(ErrorKind::InvalidRegistry(format!(
                    "{category} extension {:?} is not a single file extension",
                    spec.extension
                )));
            }
        }
        if validate_path(&mobile.directory).ok() == validate_path(&desktop.directory).ok() {
            exn::bail!(ErrorKind::InvalidRegistry("both categories share one directory".to_string()));
        }
        Ok(Self { specs: [mobile, desktop] })
    }

    pub fn get(&self, category: Category) -> &CategorySpec {
        &self.specs[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategorySpec)> {
        Category::ALL.into_iter().zip(self.specs.iter())
    }
}

impl Default for CategoryRegistry {
    /// `android/*.apk` and `windows/*.exe`.
    fn default() -> Self {
        Self {
            specs: [CategorySpec::new("android", "apk"), CategorySpec::new("windows", "exe")],
        }
    }
}
