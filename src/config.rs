//! Fixture configuration
//!
//! A single setting drives where fixtures live on disk: the base path under
//! which each repository gets `repo_<name>` (storage) and `wc_<name>`
//! (working copy) unless explicit locations are given.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the default base path
pub const BASE_PATH_ENV: &str = "SVN_FIXTURE_BASE_PATH";

/// Configuration shared by every repository of a [`Registry`](crate::Registry)
///
/// # Examples
///
/// ```rust
/// use svn_fixture::FixtureConfig;
/// use std::path::Path;
///
/// let config = FixtureConfig::default().with_base_path("/tmp/elsewhere");
/// assert_eq!(config.storage_path("demo"), Path::new("/tmp/elsewhere/repo_demo"));
/// assert_eq!(config.working_copy_path("demo"), Path::new("/tmp/elsewhere/wc_demo"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Directory under which default repository locations are derived
    pub base_path: PathBuf,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            base_path: std::env::temp_dir().join("svn-fixture"),
        }
    }
}

impl FixtureConfig {
    /// Default configuration, with the base path taken from
    /// `SVN_FIXTURE_BASE_PATH` when it is set and non-empty
    pub fn from_env() -> Self {
        match std::env::var_os(BASE_PATH_ENV) {
            Some(path) if !path.is_empty() => Self {
                base_path: PathBuf::from(path),
            },
            _ => Self::default(),
        }
    }

    /// Replace the base path
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Default storage location for a repository named `name`
    pub fn storage_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("repo_{name}"))
    }

    /// Default working-copy location for a repository named `name`
    pub fn working_copy_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("wc_{name}"))
    }
}
