//! Layered configuration for appshelf.
//!
//! Sources, lowest priority first:
//! 1. compiled defaults,
//! 2. a config file (explicit path, or `<config dir>/appshelf/config.toml`),
//! 3. environment variables prefixed `APPSHELF_`, with `__` separating
//!    nested keys (e.g. `APPSHELF_REFRESH__INTERVAL_SECS=30`).

pub mod error;

use crate::error::{ErrorKind, Result};
use appshelf_catalog::{CategoryRegistry, CategorySpec, CollisionPolicy};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "APPSHELF_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub categories: CategoriesConfig,
    pub refresh: RefreshConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory the category directories live under. Relative paths are
    /// resolved against the working directory.
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoriesConfig {
    pub mobile: CategoryConfig,
    pub desktop: CategoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Relative to [`StorageConfig::root`].
    pub directory: PathBuf,
    /// Accepted file extension, with or without the leading dot.
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    /// Upper bound for a single scan or upload.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    pub collision: CollisionPolicy,
    pub max_bytes: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                root: PathBuf::from("./downloads"),
            },
            categories: CategoriesConfig {
                mobile: CategoryConfig {
                    directory: PathBuf::from("android"),
                    extension: "apk".to_string(),
                },
                desktop: CategoryConfig {
                    directory: PathBuf::from("windows"),
                    extension: "exe".to_string(),
                },
            },
            refresh: RefreshConfig {
                interval_secs: 10,
                timeout_secs: 30,
            },
            upload: UploadConfig {
                collision: CollisionPolicy::Overwrite,
                max_bytes: None,
            },
        }
    }
}

/// `<config dir>/appshelf/config.toml` for the current user, if the
/// platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("appshelf").join("config.toml"))
}

fn file_provider(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

impl AppConfig {
    /// Assemble every configuration source without extracting it.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used if (and only if) a file is there.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()));
        let figment = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => file_provider(figment, path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "Using default config file");
                    file_provider(figment, &path)?
                },
                None => figment,
            },
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(path)?)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, at scan or upload time.
    pub fn validate(&self) -> Result<()> {
        if self.storage.root.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("storage.root must not be empty".to_string()));
        }
        if self.refresh.interval_secs == 0 {
            exn::bail!(ErrorKind::Invalid("refresh.interval_secs must be greater than zero".to_string()));
        }
        if self.refresh.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("refresh.timeout_secs must be greater than zero".to_string()));
        }
        if self.upload.max_bytes == Some(0) {
            exn::bail!(ErrorKind::Invalid("upload.max_bytes must be greater than zero".to_string()));
        }
        self.registry()?;
        Ok(())
    }

    /// The category registry described by `categories`.
    pub fn registry(&self) -> Result<CategoryRegistry> {
        let spec = |c: &CategoryConfig| CategorySpec::new(&c.directory, &c.extension);
        let registry = CategoryRegistry::new(spec(&self.categories.mobile), spec(&self.categories.desktop));
        registry.or_raise(|| ErrorKind::Invalid("categories".to_string()))
    }

    /// [`StorageConfig::root`] made absolute against the working directory.
    pub fn storage_root(&self) -> Result<PathBuf> {
        std::path::absolute(&self.storage.root)
            .or_raise(|| ErrorKind::Invalid(format!("cannot resolve storage.root {}", self.storage.root.display())))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.refresh.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn jailed(jail: &Jail, file: Option<&str>) -> figment::Result<AppConfig> {
        let path = file.map(|f| jail.directory().join(f));
        AppConfig::load(path.as_deref()).map_err(|err| figment::Error::from((*err).to_string()))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.registry().unwrap(), CategoryRegistry::default());
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "appshelf.toml",
                r#"
                    [storage]
                    root = "/srv/apps"

                    [categories.mobile]
                    extension = ".APK"

                    [upload]
                    collision = "rename"
                    max_bytes = 1048576
                "#,
            )?;
            let config = jailed(jail, Some("appshelf.toml"))?;
            assert_eq!(config.storage.root, PathBuf::from("/srv/apps"));
            assert_eq!(config.categories.mobile.directory, PathBuf::from("android"));
            assert_eq!(config.registry().unwrap().get(appshelf_catalog::Category::Mobile).extension(), "apk");
            assert_eq!(config.upload.collision, CollisionPolicy::Rename);
            assert_eq!(config.upload.max_bytes, Some(1_048_576));
            assert_eq!(config.refresh.interval_secs, 10);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file("appshelf.yml", "refresh:\n  interval_secs: 60\n")?;
            jail.set_env("APPSHELF_REFRESH__TIMEOUT_SECS", "5");
            jail.set_env("APPSHELF_UPLOAD__COLLISION", "reject");
            let config = jailed(jail, Some("appshelf.yml"))?;
            assert_eq!(config.refresh_interval(), Duration::from_secs(60));
            assert_eq!(config.timeout(), Duration::from_secs(5));
            assert_eq!(config.upload.collision, CollisionPolicy::Reject);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("appshelf.json", r#"{"storage": {"root": "from-file"}}"#)?;
            jail.set_env("APPSHELF_STORAGE__ROOT", "from-env");
            let config = jailed(jail, Some("appshelf.json"))?;
            assert_eq!(config.storage.root, PathBuf::from("from-env"));
            Ok(())
        });
    }

    fn load_err(jail: &Jail, file: &str) -> crate::error::Error {
        match AppConfig::load(Some(&jail.directory().join(file))) {
            Ok(config) => panic!("expected {file} to be rejected, got {config:?}"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|jail| {
            let err = load_err(jail, "nope.toml");
            assert!(matches!(&*err, ErrorKind::NotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_format() {
        Jail::expect_with(|jail| {
            jail.create_file("config.ini", "root = here")?;
            let err = load_err(jail, "config.ini");
            assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
            Ok(())
        });
    }

    #[test]
    fn test_parse_error() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[upload]\ncollision = \"shred\"\n")?;
            let err = load_err(jail, "config.toml");
            assert!(matches!(&*err, ErrorKind::Parse));
            Ok(())
        });
    }

    #[rstest]
    #[case("[refresh]\ninterval_secs = 0\n")]
    #[case("[refresh]\ntimeout_secs = 0\n")]
    #[case("[upload]\nmax_bytes = 0\n")]
    #[case("[categories.desktop]\ndirectory = \"android\"\n")]
    #[case("[categories.mobile]\ndirectory = \"../outside\"\n")]
    #[case("[categories.mobile]\nextension = \"tar.gz\"\n")]
    fn test_invalid_values(#[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", contents)?;
            let err = load_err(jail, "config.toml");
            assert!(matches!(&*err, ErrorKind::Invalid(_)), "{contents}");
            Ok(())
        });
    }

    #[test]
    fn test_storage_root_is_absolute() {
        let config = AppConfig::default();
        assert!(config.storage_root().unwrap().is_absolute());
    }
}
