//! Version-control engine interface
//!
//! The fixture layer never implements version control itself. It talks to an
//! engine through three object-safe traits:
//!
//! - [`Backend`]: repository administration and client construction
//! - [`Client`]: working-copy primitives (checkout, add, move, copy, delete,
//!   property edits, status, commit)
//! - [`RepositoryHandle`]: an opened repository, used for revision properties
//!   and for reading committed trees back
//!
//! Two engines ship with the crate: [`LocalBackend`], a self-contained engine
//! storing revisions as JSON records over a content-addressed object store,
//! and [`SvnBackend`], which drives the Subversion command-line tools.

mod local;
mod svn;

pub use local::LocalBackend;
pub use svn::SvnBackend;

use crate::error::Result;
use crate::types::{NodeKind, PropList, Revnum, Status};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Repository administration for one engine
pub trait Backend: fmt::Debug + Send + Sync {
    /// Short engine name used in logs
    fn name(&self) -> &'static str;

    /// Initialize an empty repository in an existing directory
    fn create(&self, storage: &Path) -> Result<()>;

    /// Whether `storage` already holds a repository of this engine
    fn is_repository(&self, storage: &Path) -> bool;

    /// Open the repository at `storage`
    fn open(&self, storage: &Path) -> Result<Box<dyn RepositoryHandle>>;

    /// Create a client context for working-copy operations
    fn client(&self) -> Result<Box<dyn Client>>;
}

/// Working-copy operations
///
/// All paths are absolute filesystem paths inside a checked-out working copy.
pub trait Client: fmt::Debug {
    /// Check out the youngest revision of `url` into `dest`
    fn checkout(&self, url: &str, dest: &Path) -> Result<Revnum>;

    /// Schedule an on-disk path (and unversioned parents) for addition
    fn add(&self, path: &Path) -> Result<()>;

    /// Move a versioned node
    fn move_path(&self, from: &Path, to: &Path) -> Result<()>;

    /// Copy a versioned node, keeping its history
    fn copy_path(&self, from: &Path, to: &Path) -> Result<()>;

    /// Schedule a versioned node for deletion and remove it from disk
    fn delete(&self, path: &Path) -> Result<()>;

    /// Set a property on a node, optionally on all its descendants
    fn propset(&self, name: &str, value: &str, path: &Path, recursive: bool) -> Result<()>;

    /// Remove a property from a node
    fn propdel(&self, name: &str, path: &Path) -> Result<()>;

    /// Working properties of a node
    fn proplist(&self, path: &Path) -> Result<Vec<PropList>>;

    /// Report the status of `path` through `callback`
    fn status(&self, path: &Path, callback: &mut dyn FnMut(&Path, Status)) -> Result<()>;

    /// Commit every change in the working copy
    ///
    /// Returns `None` when there was nothing to commit.
    fn commit(&self, working_copy: &Path) -> Result<Option<Revnum>>;
}

/// An opened repository
///
/// Node paths are slash-separated and relative to the repository root.
pub trait RepositoryHandle: fmt::Debug {
    /// URL clients check out from
    fn url(&self) -> String;

    /// Newest revision number
    fn youngest_revision(&self) -> Result<Revnum>;

    /// Set a revision property, bypassing any hook
    fn set_revision_property(&self, name: &str, value: &str, revision: Revnum) -> Result<()>;

    /// Read a revision property
    fn revision_property(&self, name: &str, revision: Revnum) -> Result<Option<String>>;

    /// Kind of the node at `path` in `revision`, `None` if absent
    fn node_kind(&self, revision: Revnum, path: &str) -> Result<Option<NodeKind>>;

    /// Contents of the file at `path` in `revision`
    fn file_contents(&self, revision: Revnum, path: &str) -> Result<Vec<u8>>;

    /// Properties of the node at `path` in `revision`
    fn node_properties(&self, revision: Revnum, path: &str) -> Result<BTreeMap<String, String>>;

    /// Every node in `revision` below the root, keyed by path
    fn list_nodes(&self, revision: Revnum) -> Result<BTreeMap<String, NodeKind>>;
}
