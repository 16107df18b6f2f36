//! Utility functions for svn-fixture
//!
//! Hashing, path manipulation and small filesystem helpers used by the
//! repository orchestration and the local backend.

use crate::error::{FixtureError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// Hash arbitrary data using SHA-256
///
/// Returns the hash as a 64-character hexadecimal string.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Make `path` absolute against the current directory, without touching the
/// filesystem
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

/// `file://` URL for a local path
///
/// ```rust,ignore
/// assert_eq!(file_url(Path::new("/test/path")), "file:///test/path");
/// ```
pub fn file_url(path: &Path) -> String {
    let mut url = String::from("file://");
    for component in path.components() {
        match component {
            Component::RootDir => url.push('/'),
            Component::Normal(part) => {
                if !url.ends_with('/') {
                    url.push('/');
                }
                url.push_str(&part.to_string_lossy());
            }
            Component::Prefix(prefix) => {
                url.push('/');
                url.push_str(&prefix.as_os_str().to_string_lossy().replace('\\', "/"));
            }
            Component::CurDir | Component::ParentDir => {}
        }
    }
    url
}

/// Local path named by a `file://` URL
pub fn path_from_file_url(url: &str) -> Result<PathBuf> {
    url.strip_prefix("file://")
        .map(PathBuf::from)
        .ok_or_else(|| FixtureError::backend("checkout", format!("unsupported URL {url}")))
}

/// Slash-separated key of `path` relative to `base`
///
/// The base itself maps to the empty key. Fails with a node error if `path`
/// is outside `base`.
pub fn relative_key(path: &Path, base: &Path) -> Result<String> {
    let relative = path.strip_prefix(base).map_err(|_| {
        FixtureError::node(path, format!("path is outside working copy {base:?}"))
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(FixtureError::node(
                    path,
                    "path must not contain parent or root components",
                ))
            }
        }
    }
    Ok(parts.join("/"))
}

/// Parent key of a slash-separated key, `None` for the root key
pub fn parent_key(key: &str) -> Option<&str> {
    if key.is_empty() {
        None
    } else {
        Some(key.rfind('/').map_or("", |idx| &key[..idx]))
    }
}

/// Returns `true` if `key` is `ancestor` or lies below it
pub fn key_is_within(key: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || key == ancestor
        || (key.starts_with(ancestor) && key.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

/// Returns `true` if `path` is non-empty and made only of normal components
///
/// Rejects `..`, `.`, roots and prefixes, so joining it onto a directory can
/// never leave that directory.
pub fn is_plain_relative(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Join a slash-separated key onto a filesystem base
pub fn key_to_path(base: &Path, key: &str) -> PathBuf {
    if key.is_empty() {
        base.to_path_buf()
    } else {
        key.split('/').fold(base.to_path_buf(), |path, part| path.join(part))
    }
}

/// Copy a file or directory tree, skipping entries named `skip`
pub fn copy_recursive(from: &Path, to: &Path, skip: &str) -> Result<()> {
    if from.is_file() {
        fs::copy(from, to)?;
        return Ok(());
    }

    for entry in WalkDir::new(from)
        .into_iter()
        .filter_entry(|e| e.file_name() != skip)
    {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from).map_err(|_| {
            FixtureError::internal(format!("{:?} escaped {:?}", entry.path(), from))
        })?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
        trace!("Copied {:?} -> {:?}", entry.path(), target);
    }
    Ok(())
}

/// Remove a file or directory tree if it exists
pub fn remove_path(path: &Path) -> Result<bool> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
        Ok(true)
    } else if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Write a file atomically by writing a sibling temp file and renaming it
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
