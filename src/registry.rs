//! Named repository registry
//!
//! The [`Registry`] owns every fixture repository created through it, keyed
//! by name. Default locations come from [`FixtureConfig`]: storage at
//! `<base>/repo_<name>` and the working copy at `<base>/wc_<name>`.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use svn_fixture::{Registry, RevisionOptions};
//!
//! # fn main() -> svn_fixture::Result<()> {
//! let mut registry = Registry::default();
//! registry.repo("hello_world", |repo| {
//!     repo.revision("r1", "Create directories", RevisionOptions::new(), |root| {
//!         root.child_dir("app")?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//!
//! registry.get_mut("hello_world").unwrap().commit_all()?;
//! registry.destroy_all()?;
//! # Ok(())
//! # }
//! ```

use crate::backend::{Backend, LocalBackend};
use crate::config::FixtureConfig;
use crate::error::{FixtureError, Result};
use crate::manifest::{apply_changes, FixtureManifest};
use crate::repository::Repository;
use crate::revision::RevisionOptions;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Repositories by name
#[derive(Debug)]
pub struct Registry {
    config: FixtureConfig,
    backend: Arc<dyn Backend>,
    repositories: BTreeMap<String, Repository>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(FixtureConfig::from_env(), Arc::new(LocalBackend::new()))
    }
}

impl Registry {
    /// Empty registry creating repositories with `backend`
    pub fn new(config: FixtureConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            config,
            backend,
            repositories: BTreeMap::new(),
        }
    }

    /// Configuration used for default locations
    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// Engine new repositories are created with
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Register a new repository
    ///
    /// Fails with [`FixtureError::DuplicateRepository`] if the name is taken or
    /// if either location already exists on disk.
    #[instrument(skip(self))]
    pub fn create(
        &mut self,
        name: &str,
        storage_path: Option<PathBuf>,
        working_copy_path: Option<PathBuf>,
    ) -> Result<&mut Repository> {
        if self.repositories.contains_key(name) {
            return Err(FixtureError::duplicate(name, "name already registered"));
        }

        let storage_path = storage_path.unwrap_or_else(|| self.config.storage_path(name));
        let working_copy_path =
            working_copy_path.unwrap_or_else(|| self.config.working_copy_path(name));
        if storage_path.exists() {
            return Err(FixtureError::duplicate(
                name,
                format!("storage path {storage_path:?} already exists"),
            ));
        }
        if working_copy_path.exists() {
            return Err(FixtureError::duplicate(
                name,
                format!("working copy path {working_copy_path:?} already exists"),
            ));
        }

        let repository = Repository::new(
            name,
            storage_path,
            working_copy_path,
            Arc::clone(&self.backend),
        )?;
        info!(
            "Registered repository {} at {:?}",
            name,
            repository.storage_path()
        );
        Ok(self
            .repositories
            .entry(name.to_string())
            .or_insert(repository))
    }

    /// Existing repository named `name`, or a newly registered one
    ///
    /// Paths are only used when the repository does not exist yet.
    pub fn get_or_create(
        &mut self,
        name: &str,
        storage_path: Option<PathBuf>,
        working_copy_path: Option<PathBuf>,
    ) -> Result<&mut Repository> {
        if !self.repositories.contains_key(name) {
            self.create(name, storage_path, working_copy_path)?;
        }
        self.repositories
            .get_mut(name)
            .ok_or_else(|| FixtureError::internal(format!("repository {name} vanished")))
    }

    /// Look up a repository, then run `build` against it
    pub fn repo<F>(&mut self, name: &str, build: F) -> Result<&mut Repository>
    where
        F: FnOnce(&mut Repository) -> Result<()>,
    {
        let repository = self.get_or_create(name, None, None)?;
        build(&mut *repository)?;
        Ok(repository)
    }

    /// Repository named `name`
    pub fn get(&self, name: &str) -> Option<&Repository> {
        self.repositories.get(name)
    }

    /// Mutable repository named `name`
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Repository> {
        self.repositories.get_mut(name)
    }

    /// Whether a repository named `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.repositories.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(String::as_str)
    }

    /// Number of registered repositories
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    /// Whether no repository is registered
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Destroy and unregister one repository
    ///
    /// Returns `false` if no repository with that name was registered.
    pub fn destroy(&mut self, name: &str) -> Result<bool> {
        match self.repositories.remove(name) {
            Some(repository) => {
                repository.destroy()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Destroy and unregister every repository
    ///
    /// Every repository is attempted; the first failure is returned.
    #[instrument(skip(self))]
    pub fn destroy_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for (name, repository) in std::mem::take(&mut self.repositories) {
            if let Err(e) = repository.destroy() {
                warn!("Failed to destroy repository {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Declare every revision of a manifest on its repository
    ///
    /// The repository is looked up or created first; nothing is committed.
    #[instrument(skip(self, manifest), fields(repository = %manifest.repository))]
    pub fn load_manifest(&mut self, manifest: FixtureManifest) -> Result<&mut Repository> {
        manifest.validate()?;
        let FixtureManifest {
            repository: name,
            storage_path,
            working_copy_path,
            revisions,
        } = manifest;

        let repository = self.get_or_create(&name, storage_path, working_copy_path)?;
        for entry in revisions {
            let mut options = RevisionOptions::new();
            if let Some(author) = entry.author {
                options = options.author(author);
            }
            if let Some(date) = entry.date {
                options = options.timestamp(date);
            }
            for (key, value) in entry.properties {
                options = options.property(key, value);
            }

            let changes = entry.changes;
            repository.revision(entry.name, entry.message, options, move |root| {
                apply_changes(root, &changes)
            })?;
        }
        info!(
            "Loaded {} revisions into {}",
            repository.revisions().len(),
            name
        );
        Ok(repository)
    }
}
