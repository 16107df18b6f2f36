//! Directory and file nodes inside a working copy
//!
//! A revision's change closure receives the root [`Directory`] of the working
//! copy and walks down from there. Nodes are cheap handles: a borrowed client
//! and an absolute path. They are built fresh on every traversal and hold no
//! state between revisions.
//!
//! ## Idempotence
//!
//! [`Directory::child_dir`] and [`Directory::child_file`] only create and
//! stage entries that are missing on disk. Running the same closure twice
//! against the same tree issues no additional `add` calls.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use svn_fixture::node::Directory;
//! # fn example(root: &Directory<'_>) -> svn_fixture::Result<()> {
//! root.dir("app", |app| {
//!     app.set_property("full_name", "Application", false)?;
//!     app.file("hello.rb", |hello| {
//!         hello.set_property("is_ruby", "Yes")?;
//!         hello.set_body("puts \"Hello World\"")
//!     })?;
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

use crate::backend::Client;
use crate::error::{FixtureError, Result};
use crate::format::{format_property, PropValue};
use crate::types::{is_reserved_property, Status};
use crate::utils::is_plain_relative;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// A directory in the working copy
#[derive(Clone)]
pub struct Directory<'c> {
    client: &'c dyn Client,
    path: PathBuf,
}

impl fmt::Debug for Directory<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory").field("path", &self.path).finish()
    }
}

impl<'c> Directory<'c> {
    /// Handle for the directory at `path` (absolute, inside a working copy)
    pub fn new(client: &'c dyn Client, path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }

    /// Path of this directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure a subdirectory exists and is versioned
    ///
    /// Creates and stages the directory only if it is not already a directory
    /// on disk. A directory that exists but was never staged is left alone.
    pub fn child_dir(&self, name: &str) -> Result<Directory<'c>> {
        let path = self.child_path(name)?;
        if !path.is_dir() {
            fs::create_dir_all(&path)?;
            self.client.add(&path)?;
            debug!("Created directory {:?}", path);
        }
        Ok(Directory::new(self.client, path))
    }

    /// [`child_dir`](Self::child_dir), then run `build` against it
    pub fn dir<F>(&self, name: &str, build: F) -> Result<Directory<'c>>
    where
        F: FnOnce(&Directory<'c>) -> Result<()>,
    {
        let dir = self.child_dir(name)?;
        build(&dir)?;
        Ok(dir)
    }

    /// Ensure a file exists and is versioned
    ///
    /// New files are created empty; fill them with [`File::set_body`].
    pub fn child_file(&self, name: &str) -> Result<File<'c>> {
        let path = self.child_path(name)?;
        if !path.is_file() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, b"")?;
            self.client.add(&path)?;
            debug!("Created file {:?}", path);
        }
        Ok(File::new(self.client, path))
    }

    /// [`child_file`](Self::child_file), then run `build` against it
    pub fn file<F>(&self, name: &str, build: F) -> Result<File<'c>>
    where
        F: FnOnce(&File<'c>) -> Result<()>,
    {
        let file = self.child_file(name)?;
        build(&file)?;
        Ok(file)
    }

    /// Move a node; both paths are relative to this directory
    pub fn move_node(&self, from: &str, to: &str) -> Result<()> {
        let source = self.existing(from)?;
        let target = self.child_path(to)?;
        self.client.move_path(&source, &target)
    }

    /// Copy a node; both paths are relative to this directory
    pub fn copy_node(&self, from: &str, to: &str) -> Result<()> {
        let source = self.existing(from)?;
        let target = self.child_path(to)?;
        self.client.copy_path(&source, &target)
    }

    /// Delete a child node
    pub fn delete(&self, name: &str) -> Result<()> {
        let target = self.existing(name)?;
        self.client.delete(&target)
    }

    /// Set a property on this directory, optionally on every descendant too
    pub fn set_property(
        &self,
        name: &str,
        value: impl Into<PropValue>,
        recursive: bool,
    ) -> Result<()> {
        let value = format_property(&value.into());
        trace!("propset {}={:?} on {:?}", name, value, self.path);
        self.client.propset(name, &value, &self.path, recursive)
    }

    /// Remove a property from this directory
    pub fn delete_property(&self, name: &str) -> Result<()> {
        self.client.propdel(name, &self.path)
    }

    /// `name` joined onto this directory; must not climb out of it
    fn child_path(&self, name: &str) -> Result<PathBuf> {
        if is_plain_relative(name) {
            Ok(self.path.join(name))
        } else {
            Err(FixtureError::node(
                self.path.join(name),
                format!("{name:?} is not a plain relative path"),
            ))
        }
    }

    fn existing(&self, relative: &str) -> Result<PathBuf> {
        let path = self.child_path(relative)?;
        if path.exists() {
            Ok(path)
        } else {
            Err(FixtureError::node(path, "does not exist"))
        }
    }
}

/// A file in the working copy
#[derive(Clone)]
pub struct File<'c> {
    client: &'c dyn Client,
    path: PathBuf,
}

impl fmt::Debug for File<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File").field("path", &self.path).finish()
    }
}

impl<'c> File<'c> {
    /// Handle for the file at `path` (absolute, inside a working copy)
    pub fn new(client: &'c dyn Client, path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }

    /// Path of this file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set a property on this file
    pub fn set_property(&self, name: &str, value: impl Into<PropValue>) -> Result<()> {
        let value = format_property(&value.into());
        trace!("propset {}={:?} on {:?}", name, value, self.path);
        self.client.propset(name, &value, &self.path, false)
    }

    /// Remove a property from this file
    pub fn delete_property(&self, name: &str) -> Result<()> {
        self.client.propdel(name, &self.path)
    }

    /// Overwrite the file's content
    ///
    /// Only the filesystem is touched; the next commit picks the change up.
    pub fn set_body(&self, content: impl AsRef<[u8]>) -> Result<()> {
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Make the file's properties exactly `desired`
    ///
    /// Existing properties missing from `desired` are deleted, then every
    /// desired property is set. Names in the reserved `svn:entry` namespace are
    /// neither deleted nor set. A file scheduled for addition has no committed
    /// properties, so the deletion pass is skipped for it.
    pub fn reconcile_properties<I, K, V>(&self, desired: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropValue>,
    {
        let desired: BTreeMap<String, PropValue> = desired
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();

        let mut newly_added = false;
        self.client.status(&self.path, &mut |path: &Path, status: Status| {
            if path == self.path && status.is_added() {
                newly_added = true;
            }
        })?;

        if !newly_added {
            let existing = self
                .client
                .proplist(&self.path)?
                .into_iter()
                .find(|list| list.path == self.path);
            if let Some(existing) = existing {
                for name in existing.props.keys() {
                    if !desired.contains_key(name) && !is_reserved_property(name) {
                        self.delete_property(name)?;
                    }
                }
            }
        }

        for (name, value) in desired {
            if !is_reserved_property(&name) {
                self.set_property(&name, value)?;
            }
        }
        Ok(())
    }
}
