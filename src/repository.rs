//! Repository orchestration
//!
//! A [`Repository`] pairs a storage location with a working-copy location and
//! keeps the ordered list of revisions declared against it. It creates
//! storage, checks out, commits revisions in order and finally removes the
//! directories it created, and nothing else.

use crate::backend::{Backend, Client, RepositoryHandle};
use crate::error::{FixtureError, Result};
use crate::node::Directory;
use crate::revision::{Revision, RevisionOptions};
use crate::types::CommitReport;
use crate::utils;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// An open repository together with the client that checked it out
pub struct Session {
    repository: Box<dyn RepositoryHandle>,
    client: Box<dyn Client>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.repository.url())
            .finish()
    }
}

impl Session {
    /// Client bound to the working copy
    pub fn client(&self) -> &dyn Client {
        self.client.as_ref()
    }

    /// Opened repository
    pub fn repository(&self) -> &dyn RepositoryHandle {
        self.repository.as_ref()
    }
}

/// Reference to a revision when selecting what to commit
#[derive(Debug, Clone)]
pub enum RevisionRef {
    /// First revision declared with this name
    Name(String),
    /// A specific revision, registered or not
    Revision(Arc<Revision>),
}

impl From<&str> for RevisionRef {
    fn from(name: &str) -> Self {
        RevisionRef::Name(name.to_string())
    }
}

impl From<String> for RevisionRef {
    fn from(name: String) -> Self {
        RevisionRef::Name(name)
    }
}

impl From<Arc<Revision>> for RevisionRef {
    fn from(revision: Arc<Revision>) -> Self {
        RevisionRef::Revision(revision)
    }
}

impl From<&Arc<Revision>> for RevisionRef {
    fn from(revision: &Arc<Revision>) -> Self {
        RevisionRef::Revision(Arc::clone(revision))
    }
}

/// A fixture repository: storage, working copy and declared revisions
pub struct Repository {
    name: String,
    storage_path: PathBuf,
    working_copy_path: PathBuf,
    backend: Arc<dyn Backend>,
    revisions: Vec<Arc<Revision>>,
    dirs_created: Vec<PathBuf>,
    session: Option<Session>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("storage_path", &self.storage_path)
            .field("working_copy_path", &self.working_copy_path)
            .field("backend", &self.backend.name())
            .field("revisions", &self.revisions.len())
            .field("dirs_created", &self.dirs_created)
            .field("checked_out", &self.session.is_some())
            .finish()
    }
}

impl Repository {
    /// Create an unregistered repository
    ///
    /// Both paths are made absolute immediately. Nothing is created on disk
    /// until [`create_storage`](Self::create_storage) or
    /// [`checkout`](Self::checkout) runs.
    pub fn new(
        name: impl Into<String>,
        storage_path: impl AsRef<Path>,
        working_copy_path: impl AsRef<Path>,
        backend: Arc<dyn Backend>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            storage_path: utils::absolute_path(storage_path.as_ref())?,
            working_copy_path: utils::absolute_path(working_copy_path.as_ref())?,
            backend,
            revisions: Vec::new(),
            dirs_created: Vec::new(),
            session: None,
        })
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute storage path
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Absolute working-copy path
    pub fn working_copy_path(&self) -> &Path {
        &self.working_copy_path
    }

    /// `file://` URL of the storage
    pub fn uri(&self) -> String {
        utils::file_url(&self.storage_path)
    }

    /// Declared revisions in order
    pub fn revisions(&self) -> &[Arc<Revision>] {
        &self.revisions
    }

    /// Directories this repository created and will remove on destroy
    pub fn dirs_created(&self) -> &[PathBuf] {
        &self.dirs_created
    }

    /// Working-copy session, once checked out
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// First revision declared with `name`
    pub fn find_revision(&self, name: &str) -> Option<&Arc<Revision>> {
        self.revisions.iter().find(|rev| rev.name() == name)
    }

    /// Declare a revision and append it to the commit order
    ///
    /// ```rust,no_run
    /// # fn example(repo: &mut svn_fixture::Repository) -> svn_fixture::Result<()> {
    /// use svn_fixture::RevisionOptions;
    ///
    /// repo.revision("r1", "Create directories", RevisionOptions::new(), |root| {
    ///     root.child_dir("app")?;
    ///     root.child_dir("lib")?;
    ///     Ok(())
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn revision<F>(
        &mut self,
        name: impl Into<String>,
        message: impl Into<String>,
        options: RevisionOptions,
        changes: F,
    ) -> Result<Arc<Revision>>
    where
        F: for<'a, 'c> Fn(&'a Directory<'c>) -> Result<()> + Send + Sync + 'static,
    {
        let revision = Revision::new(name, message, options)?.with_changes(changes);
        Ok(self.push_revision(revision))
    }

    /// Append an already built revision
    pub fn push_revision(&mut self, revision: Revision) -> Arc<Revision> {
        let revision = Arc::new(revision);
        debug!("Declared revision {} on {}", revision.name(), self.name);
        self.revisions.push(Arc::clone(&revision));
        revision
    }

    /// Create the storage directory and an empty repository in it
    ///
    /// Safe to call repeatedly; an existing repository is left untouched.
    #[instrument(skip(self), fields(repository = %self.name))]
    pub fn create_storage(&mut self) -> Result<&mut Self> {
        if !self.storage_path.exists() {
            fs::create_dir_all(&self.storage_path)?;
            self.record_created(self.storage_path.clone());
        }
        if !self.backend.is_repository(&self.storage_path) {
            self.backend.create(&self.storage_path)?;
            info!(
                "Created {} repository at {:?}",
                self.backend.name(),
                self.storage_path
            );
        }
        Ok(self)
    }

    /// Check out the repository into the working-copy path
    ///
    /// Creates storage first when no repository exists yet.
    #[instrument(skip(self), fields(repository = %self.name))]
    pub fn checkout(&mut self) -> Result<&mut Self> {
        if !self.backend.is_repository(&self.storage_path) {
            self.create_storage()?;
        }
        if !self.working_copy_path.exists() {
            fs::create_dir_all(&self.working_copy_path)?;
            self.record_created(self.working_copy_path.clone());
        }

        let repository = self.backend.open(&self.storage_path)?;
        let client = self.backend.client()?;
        let rev = client.checkout(&repository.url(), &self.working_copy_path)?;
        info!("Checked out r{} into {:?}", rev, self.working_copy_path);

        self.session = Some(Session { repository, client });
        Ok(self)
    }

    /// Commit every declared revision in declaration order
    #[instrument(skip(self), fields(repository = %self.name))]
    pub fn commit_all(&mut self) -> Result<Vec<CommitReport>> {
        let revisions = self.revisions.clone();
        self.commit_revisions(revisions)
    }

    /// Commit the selected revisions in the order given
    ///
    /// Names resolve to the first revision declared with that name. Every name
    /// is resolved before anything is committed, so an unknown name fails with
    /// [`FixtureError::RevisionNotFound`] and leaves the repository untouched.
    #[instrument(skip(self, selection), fields(repository = %self.name))]
    pub fn commit_selected<I, R>(&mut self, selection: I) -> Result<Vec<CommitReport>>
    where
        I: IntoIterator<Item = R>,
        R: Into<RevisionRef>,
    {
        let revisions = selection
            .into_iter()
            .map(|reference| self.resolve(reference.into()))
            .collect::<Result<Vec<_>>>()?;
        self.commit_revisions(revisions)
    }

    /// Commit a single revision, by name or handle
    #[instrument(skip(self, reference), fields(repository = %self.name))]
    pub fn commit_one(&mut self, reference: impl Into<RevisionRef>) -> Result<CommitReport> {
        let revision = self.resolve(reference.into())?;
        let mut reports = self.commit_revisions(vec![revision])?;
        reports
            .pop()
            .ok_or_else(|| FixtureError::internal("commit produced no report"))
    }

    /// Opened repository, for reading committed state back
    pub fn inspect(&self) -> Result<&dyn RepositoryHandle> {
        self.session
            .as_ref()
            .map(Session::repository)
            .ok_or_else(|| FixtureError::NotCheckedOut(self.name.clone()))
    }

    /// Remove every directory this repository created
    ///
    /// Paths that existed before the repository touched them are kept.
    #[instrument(skip(self), fields(repository = %self.name))]
    pub fn destroy(mut self) -> Result<()> {
        self.session = None;
        for dir in self.dirs_created.iter().rev() {
            if utils::remove_path(dir)? {
                debug!("Removed {:?}", dir);
            }
        }
        info!("Destroyed repository {}", self.name);
        Ok(())
    }

    fn resolve(&self, reference: RevisionRef) -> Result<Arc<Revision>> {
        match reference {
            RevisionRef::Revision(revision) => Ok(revision),
            RevisionRef::Name(name) => self
                .find_revision(&name)
                .cloned()
                .ok_or(FixtureError::RevisionNotFound(name)),
        }
    }

    fn commit_revisions(&mut self, revisions: Vec<Arc<Revision>>) -> Result<Vec<CommitReport>> {
        if self.session.is_none() {
            self.checkout()?;
        }

        let mut reports = Vec::with_capacity(revisions.len());
        for revision in revisions {
            let outcome = revision.commit(self)?;
            reports.push(CommitReport {
                name: revision.name().to_string(),
                outcome,
            });
        }
        Ok(reports)
    }

    fn record_created(&mut self, path: PathBuf) {
        if !self.dirs_created.contains(&path) {
            self.dirs_created.push(path);
        }
    }
}
