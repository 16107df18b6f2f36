//! JSON fixture manifests
//!
//! A manifest describes one repository and its revisions as data, so
//! fixtures can be kept next to the tests that use them and built from the
//! command line.
//!
//! ```json
//! {
//!   "repository": "hello_world",
//!   "revisions": [
//!     {
//!       "name": "r1",
//!       "message": "Create directories",
//!       "date": "2009-01-01 12:00:00",
//!       "changes": [
//!         { "op": "dir", "name": "app" },
//!         { "op": "file", "name": "app/hello.rb", "body": "puts \"Hello World\"",
//!           "props": { "is_ruby": "Yes" } }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Each change maps onto one [`Directory`] or [`File`](crate::node::File)
//! operation, applied relative to the directory that contains it.

use crate::error::{FixtureError, Result};
use crate::node::Directory;
use crate::utils::is_plain_relative;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A repository and its revisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureManifest {
    /// Registry name of the repository
    pub repository: String,
    /// Storage location, defaults to `<base>/repo_<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
    /// Working-copy location, defaults to `<base>/wc_<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_copy_path: Option<PathBuf>,
    /// Revisions in commit order
    #[serde(default)]
    pub revisions: Vec<RevisionManifest>,
}

/// One revision of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevisionManifest {
    /// Revision name
    pub name: String,
    /// Log message
    #[serde(default)]
    pub message: String,
    /// `svn:author`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// `svn:date`, in any accepted timestamp layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Extra revision properties
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Working-copy changes in order
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// A single working-copy change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Change {
    /// Ensure a directory exists, set properties on it, then apply nested changes
    Dir {
        name: String,
        #[serde(default)]
        props: BTreeMap<String, String>,
        #[serde(default)]
        recursive: bool,
        #[serde(default)]
        changes: Vec<Change>,
    },
    /// Ensure a file exists, set its properties and optionally its body
    ///
    /// With `exact_props` the file's properties are reconciled to `props`
    /// instead of merged into.
    File {
        name: String,
        #[serde(default)]
        body: Option<String>,
        #[serde(default)]
        props: BTreeMap<String, String>,
        #[serde(default)]
        exact_props: bool,
    },
    /// Move a node
    Move { from: String, to: String },
    /// Copy a node with history
    Copy { from: String, to: String },
    /// Delete a node
    Delete { name: String },
    /// Set a property on the containing directory
    Prop {
        name: String,
        value: String,
        #[serde(default)]
        recursive: bool,
    },
    /// Remove a property from the containing directory
    Propdel { name: String },
}

impl FixtureManifest {
    /// Parse a manifest from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read and parse a manifest file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading manifest {:?}", path);
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Check names and relative paths
    pub fn validate(&self) -> Result<()> {
        if self.repository.trim().is_empty() {
            return Err(FixtureError::InvalidManifest(
                "repository name is empty".to_string(),
            ));
        }
        for revision in &self.revisions {
            if revision.name.trim().is_empty() {
                return Err(FixtureError::InvalidManifest(format!(
                    "revision with message {:?} has no name",
                    revision.message
                )));
            }
            validate_changes(&revision.name, &revision.changes)?;
        }
        Ok(())
    }
}

fn validate_changes(revision: &str, changes: &[Change]) -> Result<()> {
    for change in changes {
        match change {
            Change::Dir { name, changes, .. } => {
                check_relative(revision, name)?;
                validate_changes(revision, changes)?;
            }
            Change::File { name, .. } | Change::Delete { name } => {
                check_relative(revision, name)?;
            }
            Change::Move { from, to } | Change::Copy { from, to } => {
                check_relative(revision, from)?;
                check_relative(revision, to)?;
            }
            Change::Prop { name, .. } | Change::Propdel { name } => {
                if name.is_empty() {
                    return Err(FixtureError::InvalidManifest(format!(
                        "revision {revision}: empty property name"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn check_relative(revision: &str, path: &str) -> Result<()> {
    if is_plain_relative(path) {
        Ok(())
    } else {
        Err(FixtureError::InvalidManifest(format!(
            "revision {revision}: {path:?} is not a plain relative path"
        )))
    }
}

/// Apply manifest changes under `dir`
pub fn apply_changes(dir: &Directory<'_>, changes: &[Change]) -> Result<()> {
    for change in changes {
        apply_change(dir, change)?;
    }
    Ok(())
}

fn apply_change(dir: &Directory<'_>, change: &Change) -> Result<()> {
    match change {
        Change::Dir {
            name,
            props,
            recursive,
            changes,
        } => {
            let child = dir.child_dir(name)?;
            for (key, value) in props {
                child.set_property(key, value.as_str(), *recursive)?;
            }
            apply_changes(&child, changes)
        }
        Change::File {
            name,
            body,
            props,
            exact_props,
        } => {
            let file = dir.child_file(name)?;
            if *exact_props {
                file.reconcile_properties(props.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
            } else {
                for (key, value) in props {
                    file.set_property(key, value.as_str())?;
                }
            }
            match body {
                Some(body) => file.set_body(body),
                None => Ok(()),
            }
        }
        Change::Move { from, to } => dir.move_node(from, to),
        Change::Copy { from, to } => dir.copy_node(from, to),
        Change::Delete { name } => dir.delete(name),
        Change::Prop {
            name,
            value,
            recursive,
        } => dir.set_property(name, value.as_str(), *recursive),
        Change::Propdel { name } => dir.delete_property(name),
    }
}
