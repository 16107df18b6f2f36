//! Core data types shared between the fixture layer and its backends
//!
//! ## Overview
//!
//! - **Revision numbers**: [`Revnum`]
//! - **Node state**: [`NodeKind`], [`Status`], [`PropList`]
//! - **Commit results**: [`CommitOutcome`], [`CommitReport`]
//! - **Reserved property names**: [`PROP_REVISION_LOG`] and friends

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A revision number in the backing repository
pub type Revnum = u64;

/// Revision property holding the log message
pub const PROP_REVISION_LOG: &str = "svn:log";
/// Revision property holding the author
pub const PROP_REVISION_AUTHOR: &str = "svn:author";
/// Revision property holding the commit date
pub const PROP_REVISION_DATE: &str = "svn:date";

/// Properties with this prefix are maintained by the engine and never
/// reconciled by fixtures
pub const RESERVED_PROPERTY_PREFIX: &str = "svn:entry";

/// Returns `true` if `name` belongs to the engine-maintained namespace
pub fn is_reserved_property(name: &str) -> bool {
    name.starts_with(RESERVED_PROPERTY_PREFIX)
}

/// Kind of a versioned node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A regular file
    File,
    /// A directory
    Dir,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::File => f.write_str("file"),
            NodeKind::Dir => f.write_str("dir"),
        }
    }
}

/// Working-copy status of a path, as reported by a backend client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Versioned and scheduled for nothing
    Normal,
    /// Scheduled for addition, no committed history yet
    Added,
    /// Scheduled for deletion
    Deleted,
    /// Versioned with local modifications
    Modified,
    /// Present on disk but not under version control
    Unversioned,
}

impl Status {
    /// Check whether the path has no committed history
    pub fn is_added(&self) -> bool {
        matches!(self, Status::Added)
    }
}

/// Properties of one path, as returned by a property listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropList {
    /// Path the properties belong to
    pub path: PathBuf,
    /// Property name to value
    pub props: BTreeMap<String, String>,
}

/// Result of committing one revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
    /// A new revision was created and stamped with metadata
    Committed(Revnum),
    /// Nothing changed, so no revision was created
    NoChange,
}

impl CommitOutcome {
    /// Revision number produced, if any
    pub fn revision(&self) -> Option<Revnum> {
        match self {
            CommitOutcome::Committed(rev) => Some(*rev),
            CommitOutcome::NoChange => None,
        }
    }
}

/// Per-revision entry of a repository commit run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    /// Name the revision was declared with
    pub name: String,
    /// What the commit produced
    pub outcome: CommitOutcome,
}
