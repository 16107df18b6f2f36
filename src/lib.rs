//! # svn-fixture - Declarative version-controlled fixture trees
//!
//! Build small, known repositories for tests by declaring what each revision
//! should change, then committing the revisions in order.
//!
//! ## Overview
//!
//! A fixture is a named repository with a storage location, a working copy
//! and an ordered list of revisions. Each revision carries:
//! - A log message, and optionally an author and a timestamp
//! - Extra revision properties
//! - A closure that creates directories and files, sets properties, moves,
//!   copies and deletes nodes in the working copy
//!
//! Committing a revision runs its closure, commits the working copy and then
//! stamps the revision metadata directly on the new revision, so dates and
//! authors are exactly what the fixture declared.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use svn_fixture::{Registry, RevisionOptions};
//!
//! # fn main() -> svn_fixture::Result<()> {
//! let mut registry = Registry::default();
//! let repo = registry.get_or_create("hello_world", None, None)?;
//!
//! repo.revision(
//!     "r1",
//!     "Create directories",
//!     RevisionOptions::new().timestamp("2009-01-01 12:00:00"),
//!     |root| {
//!         root.child_dir("app")?;
//!         root.child_dir("docs")?;
//!         root.child_dir("lib")?;
//!         Ok(())
//!     },
//! )?;
//!
//! repo.revision("r2", "Add hello.rb", RevisionOptions::new(), |root| {
//!     root.dir("app", |app| {
//!         app.set_property("full_name", "Application", false)?;
//!         app.file("hello.rb", |hello| {
//!             hello.set_property("is_ruby", "Yes")?;
//!             hello.set_body("puts \"Hello World\"")
//!         })?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//!
//! let reports = repo.commit_all()?;
//! println!("{:?}", reports);
//!
//! registry.destroy_all()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Engines
//!
//! The fixture layer talks to version control through the traits in
//! [`backend`]. [`LocalBackend`] is a self-contained engine and the default;
//! [`SvnBackend`] drives the Subversion command-line tools.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, FixtureError>`. Nothing is retried and a
//! failed revision is not rolled back; a commit that changes nothing is not an
//! error, it is logged as a warning and reported as
//! [`CommitOutcome::NoChange`].
//!
//! ## Module Organization
//!
//! - [`registry`]: named repositories and their default locations
//! - [`repository`]: storage, checkout, commit ordering and teardown
//! - [`revision`]: revision declarations and the commit protocol
//! - [`node`]: directory and file operations inside a working copy
//! - [`format`]: timestamp and property value formatting
//! - [`manifest`]: JSON fixture descriptions
//! - [`backend`]: engine traits and implementations
//! - [`config`]: base path configuration
//! - [`types`]: common types and reserved property names
//! - [`error`]: error types and handling

// Public API modules
pub mod backend;
pub mod config;
pub mod error;
pub mod format;
pub mod manifest;
pub mod node;
pub mod registry;
pub mod repository;
pub mod revision;
pub mod types;

// Internal modules (not part of public API)
mod utils;

// Re-export main types for convenience
pub use backend::{Backend, Client, LocalBackend, RepositoryHandle, SvnBackend};
pub use config::FixtureConfig;
pub use error::{FixtureError, Result};
pub use format::PropValue;
pub use manifest::FixtureManifest;
pub use node::{Directory, File};
pub use registry::Registry;
pub use repository::{Repository, RevisionRef};
pub use revision::{Revision, RevisionOptions, RevisionState};
pub use types::*;
