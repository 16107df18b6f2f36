//! Revision declarations and the commit protocol
//!
//! A [`Revision`] is a named, deferred unit of change. It carries a log
//! message, optional author and timestamp, extra revision properties and a
//! closure that mutates the working copy. Nothing happens until
//! [`Revision::commit`] runs; declaring a revision only validates and
//! normalizes its metadata.
//!
//! ## Commit protocol
//!
//! 1. Build the root [`Directory`] of the working copy
//! 2. Run the change closure, if any
//! 3. Commit the whole working copy through the backend client
//! 4. If a revision was produced, stamp `svn:log`, `svn:author`, `svn:date`
//!    and every extra property on it
//! 5. If nothing changed, log a warning naming the revision and report
//!    [`CommitOutcome::NoChange`]

use crate::backend::{Client, RepositoryHandle};
use crate::error::{FixtureError, Result};
use crate::format::{format_property, format_timestamp, PropValue};
use crate::node::Directory;
use crate::repository::Repository;
use crate::types::{
    CommitOutcome, Revnum, PROP_REVISION_AUTHOR, PROP_REVISION_DATE, PROP_REVISION_LOG,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Mutation closure run against the working-copy root
pub type ChangeFn = dyn for<'a, 'c> Fn(&'a Directory<'c>) -> Result<()> + Send + Sync;

/// Optional metadata for a revision
///
/// ```rust
/// use svn_fixture::RevisionOptions;
///
/// let options = RevisionOptions::new()
///     .author("the.author")
///     .timestamp("2009-01-01 12:00:00")
///     .property("ticket", "FIX-12");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RevisionOptions {
    author: Option<String>,
    timestamp: Option<PropValue>,
    properties: Vec<(String, PropValue)>,
}

impl RevisionOptions {
    /// Options with no author, no timestamp and no extra properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `svn:author` value
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the `svn:date` value
    pub fn timestamp(mut self, timestamp: impl Into<PropValue>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Add an extra revision property
    pub fn property(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }
}

/// Lifecycle of a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionState {
    /// Declared, never committed
    Declared,
    /// Changes applied to the working copy, commit pending
    Applied,
    /// Committed as the given revision number
    Committed(Revnum),
    /// Committed without producing a revision
    NoChange,
    /// Applying or committing failed
    Failed,
}

/// A named unit of change
pub struct Revision {
    name: String,
    message: String,
    author: Option<String>,
    timestamp: Option<String>,
    properties: BTreeMap<String, String>,
    changes: Option<Box<ChangeFn>>,
    state: Mutex<RevisionState>,
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Revision")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("author", &self.author)
            .field("timestamp", &self.timestamp)
            .field("properties", &self.properties)
            .field("has_changes", &self.changes.is_some())
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl Revision {
    /// Declare a revision without changes
    ///
    /// The timestamp is normalized here, so an unparseable value fails with
    /// [`FixtureError::Format`] before anything is committed.
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        options: RevisionOptions,
    ) -> Result<Self> {
        let timestamp = format_timestamp(options.timestamp.as_ref())?;
        let properties = options
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), format_property(value)))
            .collect();

        Ok(Self {
            name: name.into(),
            message: message.into(),
            author: options.author.filter(|author| !author.is_empty()),
            timestamp,
            properties,
            changes: None,
            state: Mutex::new(RevisionState::Declared),
        })
    }

    /// Attach the closure that mutates the working copy
    pub fn with_changes<F>(mut self, changes: F) -> Self
    where
        F: for<'a, 'c> Fn(&'a Directory<'c>) -> Result<()> + Send + Sync + 'static,
    {
        self.changes = Some(Box::new(changes));
        self
    }

    /// Name the revision was declared with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Author, if one was given
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Normalized timestamp, if one was given
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Extra revision properties, already formatted
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Current lifecycle state
    pub fn state(&self) -> RevisionState {
        *self.state.lock()
    }

    /// Apply and commit this revision against a checked-out repository
    pub fn commit(&self, repository: &Repository) -> Result<CommitOutcome> {
        let session = repository
            .session()
            .ok_or_else(|| FixtureError::NotCheckedOut(repository.name().to_string()))?;
        self.commit_with(
            session.client(),
            session.repository(),
            repository.working_copy_path(),
        )
    }

    pub(crate) fn commit_with(
        &self,
        client: &dyn Client,
        repository: &dyn RepositoryHandle,
        working_copy: &Path,
    ) -> Result<CommitOutcome> {
        let result = self.apply_and_commit(client, repository, working_copy);
        let mut state = self.state.lock();
        *state = match &result {
            Ok(CommitOutcome::Committed(rev)) => RevisionState::Committed(*rev),
            Ok(CommitOutcome::NoChange) => RevisionState::NoChange,
            Err(_) => RevisionState::Failed,
        };
        result
    }

    fn apply_and_commit(
        &self,
        client: &dyn Client,
        repository: &dyn RepositoryHandle,
        working_copy: &Path,
    ) -> Result<CommitOutcome> {
        let root = Directory::new(client, working_copy);
        if let Some(changes) = &self.changes {
            debug!("Applying changes for revision {}", self.name);
            changes(&root)?;
        }
        *self.state.lock() = RevisionState::Applied;

        match client.commit(working_copy)? {
            Some(rev) => {
                self.stamp(repository, rev)?;
                info!("Committed revision {} as r{}", self.name, rev);
                Ok(CommitOutcome::Committed(rev))
            }
            None => {
                warn!(
                    "No change in revision {} ({})",
                    self.name,
                    working_copy.display()
                );
                Ok(CommitOutcome::NoChange)
            }
        }
    }

    fn stamp(&self, repository: &dyn RepositoryHandle, rev: Revnum) -> Result<()> {
        if !self.message.is_empty() {
            repository.set_revision_property(PROP_REVISION_LOG, &self.message, rev)?;
        }
        if let Some(author) = &self.author {
            repository.set_revision_property(PROP_REVISION_AUTHOR, author, rev)?;
        }
        if let Some(timestamp) = &self.timestamp {
            repository.set_revision_property(PROP_REVISION_DATE, timestamp, rev)?;
        }
        for (name, value) in &self.properties {
            repository.set_revision_property(name, value, rev)?;
        }
        Ok(())
    }
}
