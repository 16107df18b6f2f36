//! Self-contained version-control engine
//!
//! [`LocalBackend`] needs nothing but the filesystem. It keeps just enough of
//! the Subversion model for fixtures: numbered revisions, versioned
//! directories and files, node properties, revision properties, and a working
//! copy with scheduled additions and deletions.
//!
//! ## Storage layout
//!
//! ```text
//! storage_root/
//! ├── format.json           # Format version, repository UUID, creation time
//! ├── current               # Youngest revision number
//! ├── revisions/
//! │   └── <n>.json          # Node map and revision properties of revision n
//! └── objects/              # File contents, addressed by SHA-256
//!     └── <prefix>/         # First 2 chars of hash
//!         └── <suffix>      # Remaining hash chars
//! ```
//!
//! ## Working copy layout
//!
//! A checked-out tree carries `.fixture/entries.json`, recording the storage it
//! came from, the revision it is based on, and one entry per versioned path
//! with its kind, schedule (`normal`, `added`, `deleted`) and working
//! properties. File contents are read from disk at commit time.

use crate::backend::{Backend, Client, RepositoryHandle};
use crate::error::{FixtureError, Result};
use crate::format::{format_property, PropValue};
use crate::types::{NodeKind, PropList, Revnum, Status, PROP_REVISION_DATE};
use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};
use uuid::Uuid;
use walkdir::WalkDir;

const FORMAT_FILE: &str = "format.json";
const CURRENT_FILE: &str = "current";
const REVISIONS_DIR: &str = "revisions";
const OBJECTS_DIR: &str = "objects";
const FORMAT_VERSION: u32 = 1;

/// Administrative directory inside every working copy
pub const ADMIN_DIR: &str = ".fixture";
const ENTRIES_FILE: &str = "entries.json";

/// Self-contained engine over a content-addressed object store
///
/// # Examples
///
/// ```rust,no_run
/// use svn_fixture::backend::{Backend, LocalBackend};
/// use std::path::Path;
///
/// # fn main() -> svn_fixture::Result<()> {
/// let backend = LocalBackend::new();
/// backend.create(Path::new("/tmp/repo"))?;
/// let client = backend.client()?;
/// client.checkout("file:///tmp/repo", Path::new("/tmp/wc"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

impl LocalBackend {
    /// Create the engine
    pub fn new() -> Self {
        Self
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn create(&self, storage: &Path) -> Result<()> {
        let store = Store::new(storage);
        if store.is_initialized() {
            return Err(FixtureError::backend(
                "create",
                format!("a repository already exists at {storage:?}"),
            ));
        }
        store.init()?;
        info!("Created local repository at {:?}", storage);
        Ok(())
    }

    fn is_repository(&self, storage: &Path) -> bool {
        Store::new(storage).is_initialized()
    }

    fn open(&self, storage: &Path) -> Result<Box<dyn RepositoryHandle>> {
        let store = Store::new(storage);
        if !store.is_initialized() {
            return Err(FixtureError::backend(
                "open",
                format!("no repository at {storage:?}"),
            ));
        }
        Ok(Box::new(LocalRepository { store }))
    }

    fn client(&self) -> Result<Box<dyn Client>> {
        Ok(Box::new(LocalClient))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StorageFormat {
    format: u32,
    uuid: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct NodeRecord {
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    props: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RevisionRecord {
    number: Revnum,
    nodes: BTreeMap<String, NodeRecord>,
    #[serde(default)]
    revprops: BTreeMap<String, String>,
}

/// On-disk repository
#[derive(Debug, Clone)]
struct Store {
    root: PathBuf,
}

impl Store {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn is_initialized(&self) -> bool {
        self.root.join(FORMAT_FILE).is_file()
    }

    fn init(&self) -> Result<()> {
        fs::create_dir_all(self.root.join(OBJECTS_DIR))?;
        fs::create_dir_all(self.root.join(REVISIONS_DIR))?;

        let mut nodes = BTreeMap::new();
        nodes.insert(
            String::new(),
            NodeRecord {
                kind: NodeKind::Dir,
                content: None,
                props: BTreeMap::new(),
            },
        );
        self.write_revision(&RevisionRecord {
            number: 0,
            nodes,
            revprops: now_revprops(),
        })?;
        self.set_youngest(0)?;

        let format = StorageFormat {
            format: FORMAT_VERSION,
            uuid: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        utils::atomic_write(
            &self.root.join(FORMAT_FILE),
            &serde_json::to_vec_pretty(&format)?,
        )
    }

    fn youngest(&self) -> Result<Revnum> {
        let text = fs::read_to_string(self.root.join(CURRENT_FILE))?;
        text.trim().parse().map_err(|_| {
            FixtureError::backend("youngest", format!("corrupt revision counter {text:?}"))
        })
    }

    fn set_youngest(&self, revision: Revnum) -> Result<()> {
        utils::atomic_write(
            &self.root.join(CURRENT_FILE),
            format!("{revision}\n").as_bytes(),
        )
    }

    fn revision_path(&self, revision: Revnum) -> PathBuf {
        self.root.join(REVISIONS_DIR).join(format!("{revision}.json"))
    }

    fn read_revision(&self, revision: Revnum) -> Result<RevisionRecord> {
        let path = self.revision_path(revision);
        if !path.is_file() {
            return Err(FixtureError::NoSuchRevision(revision));
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    fn write_revision(&self, record: &RevisionRecord) -> Result<()> {
        utils::atomic_write(
            &self.revision_path(record.number),
            &serde_json::to_vec_pretty(record)?,
        )
    }

    fn object_path(&self, hash: &str) -> PathBuf {
        let (prefix, suffix) = hash.split_at(2);
        self.root.join(OBJECTS_DIR).join(prefix).join(suffix)
    }

    fn store_object(&self, data: &[u8]) -> Result<String> {
        let hash = utils::hash_data(data);
        let path = self.object_path(&hash);
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            utils::atomic_write(&path, data)?;
            trace!("Stored object {} ({} bytes)", hash, data.len());
        }
        Ok(hash)
    }

    fn load_object(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.object_path(hash);
        if !path.is_file() {
            return Err(FixtureError::backend(
                "load object",
                format!("object {hash} is missing from {:?}", self.root),
            ));
        }
        Ok(fs::read(path)?)
    }
}

fn now_revprops() -> BTreeMap<String, String> {
    let mut revprops = BTreeMap::new();
    revprops.insert(
        PROP_REVISION_DATE.to_string(),
        format_property(&PropValue::Time(Utc::now())),
    );
    revprops
}

fn node_key(path: &str) -> &str {
    path.trim_matches('/')
}

/// Opened local repository
#[derive(Debug)]
struct LocalRepository {
    store: Store,
}

impl LocalRepository {
    fn node(&self, revision: Revnum, path: &str) -> Result<Option<NodeRecord>> {
        let record = self.store.read_revision(revision)?;
        Ok(record.nodes.get(node_key(path)).cloned())
    }
}

impl RepositoryHandle for LocalRepository {
    fn url(&self) -> String {
        utils::file_url(&self.store.root)
    }

    fn youngest_revision(&self) -> Result<Revnum> {
        self.store.youngest()
    }

    fn set_revision_property(&self, name: &str, value: &str, revision: Revnum) -> Result<()> {
        let mut record = self.store.read_revision(revision)?;
        record.revprops.insert(name.to_string(), value.to_string());
        self.store.write_revision(&record)?;
        debug!("Set revision property {}={:?} on r{}", name, value, revision);
        Ok(())
    }

    fn revision_property(&self, name: &str, revision: Revnum) -> Result<Option<String>> {
        Ok(self.store.read_revision(revision)?.revprops.get(name).cloned())
    }

    fn node_kind(&self, revision: Revnum, path: &str) -> Result<Option<NodeKind>> {
        Ok(self.node(revision, path)?.map(|node| node.kind))
    }

    fn file_contents(&self, revision: Revnum, path: &str) -> Result<Vec<u8>> {
        match self.node(revision, path)? {
            Some(NodeRecord {
                content: Some(hash),
                ..
            }) => self.store.load_object(&hash),
            _ => Err(FixtureError::node(
                path,
                format!("not a file in revision {revision}"),
            )),
        }
    }

    fn node_properties(&self, revision: Revnum, path: &str) -> Result<BTreeMap<String, String>> {
        self.node(revision, path)?
            .map(|node| node.props)
            .ok_or_else(|| FixtureError::node(path, format!("not found in revision {revision}")))
    }

    fn list_nodes(&self, revision: Revnum) -> Result<BTreeMap<String, NodeKind>> {
        Ok(self
            .store
            .read_revision(revision)?
            .nodes
            .into_iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, node)| (key, node.kind))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Schedule {
    Normal,
    Added,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WcEntry {
    kind: NodeKind,
    schedule: Schedule,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    props: BTreeMap<String, String>,
}

impl WcEntry {
    fn is_live(&self) -> bool {
        self.schedule != Schedule::Deleted
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WcState {
    storage: PathBuf,
    base_revision: Revnum,
    entries: BTreeMap<String, WcEntry>,
}

fn entries_path(root: &Path) -> PathBuf {
    root.join(ADMIN_DIR).join(ENTRIES_FILE)
}

/// A loaded working copy
struct WorkingCopy {
    root: PathBuf,
    state: WcState,
}

impl WorkingCopy {
    /// Find the working copy containing `path`
    fn locate(path: &Path) -> Result<Self> {
        let root = path
            .ancestors()
            .find(|candidate| entries_path(candidate).is_file())
            .ok_or_else(|| FixtureError::node(path, "not inside a working copy"))?
            .to_path_buf();
        let state = serde_json::from_slice(&fs::read(entries_path(&root))?)?;
        Ok(Self { root, state })
    }

    fn save(&self) -> Result<()> {
        utils::atomic_write(
            &entries_path(&self.root),
            &serde_json::to_vec_pretty(&self.state)?,
        )
    }

    fn key(&self, path: &Path) -> Result<String> {
        utils::relative_key(path, &self.root)
    }

    fn live(&self, key: &str) -> Option<&WcEntry> {
        self.state.entries.get(key).filter(|entry| entry.is_live())
    }

    fn require_live(&self, path: &Path, key: &str) -> Result<&WcEntry> {
        self.live(key)
            .ok_or_else(|| FixtureError::node(path, "not under version control"))
    }

    fn live_keys_within(&self, key: &str) -> Vec<String> {
        self.state
            .entries
            .iter()
            .filter(|(candidate, entry)| entry.is_live() && utils::key_is_within(candidate, key))
            .map(|(candidate, _)| candidate.clone())
            .collect()
    }

    fn schedule_add(&mut self, key: &str, kind: NodeKind) {
        trace!("Scheduling {:?} ({}) for addition", key, kind);
        self.state.entries.insert(
            key.to_string(),
            WcEntry {
                kind,
                schedule: Schedule::Added,
                props: BTreeMap::new(),
            },
        );
    }

    /// Resolve the target of a move or copy, descending into an existing
    /// versioned directory the way `svn mv a dir/` does
    fn resolve_target(&self, from: &Path, to: &Path) -> Result<(PathBuf, String)> {
        let key = self.key(to)?;
        if to.is_dir() && self.live(&key).map(|e| e.kind) == Some(NodeKind::Dir) {
            let name = from
                .file_name()
                .ok_or_else(|| FixtureError::node(from, "source has no file name"))?;
            let nested = to.join(name);
            let nested_key = self.key(&nested)?;
            return Ok((nested, nested_key));
        }
        Ok((to.to_path_buf(), key))
    }

    fn check_transfer(&self, from: &Path, from_key: &str, to: &Path, to_key: &str) -> Result<()> {
        self.require_live(from, from_key)?;
        if from_key.is_empty() {
            return Err(FixtureError::node(from, "cannot move or copy the working copy root"));
        }
        if !from.exists() {
            return Err(FixtureError::node(from, "does not exist"));
        }
        if to.exists() {
            return Err(FixtureError::node(to, "already exists"));
        }
        if utils::key_is_within(to_key, from_key) {
            return Err(FixtureError::node(to, "cannot move or copy a node into itself"));
        }
        let parent = utils::parent_key(to_key).unwrap_or("");
        match self.live(parent) {
            Some(entry) if entry.kind == NodeKind::Dir => Ok(()),
            _ => Err(FixtureError::node(to, "parent directory is not under version control")),
        }
    }

    /// Replicate every live entry under `from_key` at `to_key`
    fn transplant(&mut self, from_key: &str, to_key: &str, keep_source: bool) {
        let moved: Vec<(String, WcEntry)> = self
            .state
            .entries
            .iter()
            .filter(|(key, entry)| entry.is_live() && utils::key_is_within(key, from_key))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();

        for (key, entry) in moved {
            let new_key = format!("{}{}", to_key, &key[from_key.len()..]);
            self.state.entries.insert(
                new_key,
                WcEntry {
                    kind: entry.kind,
                    schedule: Schedule::Added,
                    props: entry.props.clone(),
                },
            );
            if !keep_source {
                self.retire(&key, entry.schedule);
            }
        }
    }

    fn retire(&mut self, key: &str, schedule: Schedule) {
        if schedule == Schedule::Added {
            self.state.entries.remove(key);
        } else if let Some(entry) = self.state.entries.get_mut(key) {
            entry.schedule = Schedule::Deleted;
        }
    }
}

fn kind_on_disk(path: &Path) -> NodeKind {
    if path.is_dir() {
        NodeKind::Dir
    } else {
        NodeKind::File
    }
}

/// Client for [`LocalBackend`] working copies
///
/// Stateless: every call locates the working copy from the path it is given.
#[derive(Debug, Default, Clone, Copy)]
struct LocalClient;

impl Client for LocalClient {
    fn checkout(&self, url: &str, dest: &Path) -> Result<Revnum> {
        let storage = utils::path_from_file_url(url)?;
        let store = Store::new(&storage);
        if !store.is_initialized() {
            return Err(FixtureError::backend(
                "checkout",
                format!("no repository at {url}"),
            ));
        }

        if entries_path(dest).is_file() {
            let existing = WorkingCopy::locate(dest)?;
            if existing.state.storage == storage {
                debug!("{:?} is already a working copy of {}", dest, url);
                return Ok(existing.state.base_revision);
            }
            return Err(FixtureError::backend(
                "checkout",
                format!("{dest:?} is a working copy of {:?}", existing.state.storage),
            ));
        }

        let youngest = store.youngest()?;
        let record = store.read_revision(youngest)?;
        fs::create_dir_all(dest.join(ADMIN_DIR))?;

        let mut entries = BTreeMap::new();
        for (key, node) in &record.nodes {
            let path = utils::key_to_path(dest, key);
            match (&node.kind, &node.content) {
                (NodeKind::Dir, _) => fs::create_dir_all(&path)?,
                (NodeKind::File, Some(hash)) => fs::write(&path, store.load_object(hash)?)?,
                (NodeKind::File, None) => fs::write(&path, b"")?,
            }
            entries.insert(
                key.clone(),
                WcEntry {
                    kind: node.kind,
                    schedule: Schedule::Normal,
                    props: node.props.clone(),
                },
            );
        }

        let wc = WorkingCopy {
            root: dest.to_path_buf(),
            state: WcState {
                storage,
                base_revision: youngest,
                entries,
            },
        };
        wc.save()?;
        info!("Checked out r{} of {} into {:?}", youngest, url, dest);
        Ok(youngest)
    }

    fn add(&self, path: &Path) -> Result<()> {
        let mut wc = WorkingCopy::locate(path)?;
        let key = wc.key(path)?;
        if !path.exists() {
            return Err(FixtureError::node(path, "does not exist"));
        }
        if wc.live(&key).is_some() {
            return Err(FixtureError::node(path, "already under version control"));
        }

        let mut parents = Vec::new();
        let mut parent = utils::parent_key(&key);
        while let Some(candidate) = parent {
            if wc.live(candidate).is_some() {
                break;
            }
            parents.push(candidate.to_string());
            parent = utils::parent_key(candidate);
        }
        for candidate in parents.iter().rev() {
            wc.schedule_add(candidate, NodeKind::Dir);
        }

        let kind = kind_on_disk(path);
        wc.schedule_add(&key, kind);
        if kind == NodeKind::Dir {
            for entry in WalkDir::new(path)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.file_name() != ADMIN_DIR)
            {
                let entry = entry?;
                let child_key = wc.key(entry.path())?;
                if wc.live(&child_key).is_none() {
                    wc.schedule_add(&child_key, kind_on_disk(entry.path()));
                }
            }
        }
        wc.save()?;
        debug!("Added {:?}", path);
        Ok(())
    }

    fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        let mut wc = WorkingCopy::locate(from)?;
        let from_key = wc.key(from)?;
        let (to, to_key) = wc.resolve_target(from, to)?;
        wc.check_transfer(from, &from_key, &to, &to_key)?;

        fs::rename(from, &to)?;
        wc.transplant(&from_key, &to_key, false);
        wc.save()?;
        debug!("Moved {:?} -> {:?}", from, to);
        Ok(())
    }

    fn copy_path(&self, from: &Path, to: &Path) -> Result<()> {
        let mut wc = WorkingCopy::locate(from)?;
        let from_key = wc.key(from)?;
        let (to, to_key) = wc.resolve_target(from, to)?;
        wc.check_transfer(from, &from_key, &to, &to_key)?;

        utils::copy_recursive(from, &to, ADMIN_DIR)?;
        wc.transplant(&from_key, &to_key, true);
        wc.save()?;
        debug!("Copied {:?} -> {:?}", from, to);
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        let mut wc = WorkingCopy::locate(path)?;
        let key = wc.key(path)?;
        wc.require_live(path, &key)?;
        if key.is_empty() {
            return Err(FixtureError::node(path, "cannot delete the working copy root"));
        }

        utils::remove_path(path)?;
        for doomed in wc.live_keys_within(&key) {
            let schedule = wc.state.entries[&doomed].schedule;
            wc.retire(&doomed, schedule);
        }
        wc.save()?;
        debug!("Deleted {:?}", path);
        Ok(())
    }

    fn propset(&self, name: &str, value: &str, path: &Path, recursive: bool) -> Result<()> {
        let mut wc = WorkingCopy::locate(path)?;
        let key = wc.key(path)?;
        wc.require_live(path, &key)?;

        let targets = if recursive {
            wc.live_keys_within(&key)
        } else {
            vec![key]
        };
        for target in targets {
            if let Some(entry) = wc.state.entries.get_mut(&target) {
                entry.props.insert(name.to_string(), value.to_string());
            }
        }
        wc.save()?;
        trace!("Set property {}={:?} on {:?} (recursive: {})", name, value, path, recursive);
        Ok(())
    }

    fn propdel(&self, name: &str, path: &Path) -> Result<()> {
        let mut wc = WorkingCopy::locate(path)?;
        let key = wc.key(path)?;
        wc.require_live(path, &key)?;
        if let Some(entry) = wc.state.entries.get_mut(&key) {
            entry.props.remove(name);
        }
        wc.save()?;
        trace!("Deleted property {} on {:?}", name, path);
        Ok(())
    }

    fn proplist(&self, path: &Path) -> Result<Vec<PropList>> {
        let wc = WorkingCopy::locate(path)?;
        let key = wc.key(path)?;
        let entry = wc.require_live(path, &key)?;
        Ok(vec![PropList {
            path: path.to_path_buf(),
            props: entry.props.clone(),
        }])
    }

    fn status(&self, path: &Path, callback: &mut dyn FnMut(&Path, Status)) -> Result<()> {
        let wc = WorkingCopy::locate(path)?;
        let key = wc.key(path)?;
        if !wc.state.entries.contains_key(&key) {
            if path.exists() {
                callback(path, Status::Unversioned);
            }
            return Ok(());
        }

        let store = Store::new(&wc.state.storage);
        let base = store.read_revision(wc.state.base_revision)?;
        for (candidate, entry) in &wc.state.entries {
            if !utils::key_is_within(candidate, &key) {
                continue;
            }
            let entry_path = utils::key_to_path(&wc.root, candidate);
            let status = match entry.schedule {
                Schedule::Added => Status::Added,
                Schedule::Deleted => Status::Deleted,
                Schedule::Normal => {
                    let modified = match base.nodes.get(candidate) {
                        Some(node) if node.props != entry.props => true,
                        Some(NodeRecord {
                            content: Some(hash),
                            ..
                        }) => fs::read(&entry_path)
                            .map(|data| &utils::hash_data(&data) != hash)
                            .unwrap_or(true),
                        Some(_) => false,
                        None => true,
                    };
                    if modified {
                        Status::Modified
                    } else {
                        Status::Normal
                    }
                }
            };
            callback(&entry_path, status);
        }
        Ok(())
    }

    fn commit(&self, working_copy: &Path) -> Result<Option<Revnum>> {
        let mut wc = WorkingCopy::locate(working_copy)?;
        let store = Store::new(&wc.state.storage);
        let youngest = store.youngest()?;
        if wc.state.base_revision != youngest {
            return Err(FixtureError::backend(
                "commit",
                format!(
                    "working copy is at r{} but the repository is at r{}",
                    wc.state.base_revision, youngest
                ),
            ));
        }
        let base = store.read_revision(youngest)?;

        let mut nodes = BTreeMap::new();
        for (key, entry) in wc.state.entries.iter().filter(|(_, e)| e.is_live()) {
            let path = utils::key_to_path(&wc.root, key);
            let content = match entry.kind {
                NodeKind::Dir if path.is_dir() => None,
                NodeKind::File if path.is_file() => Some(store.store_object(&fs::read(&path)?)?),
                kind => {
                    return Err(FixtureError::node(
                        &path,
                        format!("versioned {kind} is missing from disk"),
                    ))
                }
            };
            nodes.insert(
                key.clone(),
                NodeRecord {
                    kind: entry.kind,
                    content,
                    props: entry.props.clone(),
                },
            );
        }

        if nodes == base.nodes {
            debug!("Nothing to commit in {:?}", working_copy);
            return Ok(None);
        }

        let revision = youngest + 1;
        store.write_revision(&RevisionRecord {
            number: revision,
            nodes,
            revprops: now_revprops(),
        })?;
        store.set_youngest(revision)?;

        wc.state.entries.retain(|_, entry| entry.is_live());
        for entry in wc.state.entries.values_mut() {
            entry.schedule = Schedule::Normal;
        }
        wc.state.base_revision = revision;
        wc.save()?;

        info!("Committed revision {} from {:?}", revision, working_copy);
        Ok(Some(revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        storage: PathBuf,
        wc: PathBuf,
        repo: Box<dyn RepositoryHandle>,
        client: Box<dyn Client>,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let storage = temp.path().join("repo");
        let wc = temp.path().join("wc");
        fs::create_dir_all(&storage).unwrap();

        let backend = LocalBackend::new();
        backend.create(&storage).unwrap();
        let repo = backend.open(&storage).unwrap();
        let client = backend.client().unwrap();
        client.checkout(&repo.url(), &wc).unwrap();

        Fixture {
            _temp: temp,
            storage,
            wc,
            repo,
            client,
        }
    }

    fn status_of(client: &dyn Client, path: &Path) -> Vec<Status> {
        let mut seen = Vec::new();
        client
            .status(path, &mut |p: &Path, status: Status| {
                if p == path {
                    seen.push(status)
                }
            })
            .unwrap();
        seen
    }

    #[test]
    fn test_create_is_not_repeatable() {
        let f = fixture();
        let backend = LocalBackend::new();
        assert!(backend.is_repository(&f.storage));
        assert!(backend.create(&f.storage).unwrap_err().is_backend_error());
        assert_eq!(f.repo.youngest_revision().unwrap(), 0);
        assert_eq!(f.repo.node_kind(0, "").unwrap(), Some(NodeKind::Dir));
    }

    #[test]
    fn test_add_and_commit_creates_revision() {
        let f = fixture();
        fs::create_dir_all(f.wc.join("app")).unwrap();
        fs::write(f.wc.join("app/hello.rb"), "puts 1").unwrap();
        f.client.add(&f.wc.join("app")).unwrap();

        assert_eq!(status_of(f.client.as_ref(), &f.wc.join("app/hello.rb")), vec![Status::Added]);
        assert_eq!(f.client.commit(&f.wc).unwrap(), Some(1));
        assert_eq!(f.repo.node_kind(1, "app").unwrap(), Some(NodeKind::Dir));
        assert_eq!(f.repo.file_contents(1, "app/hello.rb").unwrap(), b"puts 1");
        assert_eq!(status_of(f.client.as_ref(), &f.wc.join("app/hello.rb")), vec![Status::Normal]);
        assert!(f.repo.revision_property(PROP_REVISION_DATE, 1).unwrap().is_some());
    }

    #[test]
    fn test_commit_without_changes_is_none() {
        let f = fixture();
        assert_eq!(f.client.commit(&f.wc).unwrap(), None);
        assert_eq!(f.repo.youngest_revision().unwrap(), 0);
    }

    #[test]
    fn test_content_edit_is_committed() {
        let f = fixture();
        let file = f.wc.join("notes.txt");
        fs::write(&file, "one").unwrap();
        f.client.add(&file).unwrap();
        f.client.commit(&f.wc).unwrap();

        fs::write(&file, "two").unwrap();
        assert_eq!(status_of(f.client.as_ref(), &file), vec![Status::Modified]);
        assert_eq!(f.client.commit(&f.wc).unwrap(), Some(2));
        assert_eq!(f.repo.file_contents(1, "notes.txt").unwrap(), b"one");
        assert_eq!(f.repo.file_contents(2, "notes.txt").unwrap(), b"two");
    }

    #[test]
    fn test_add_unversioned_parents() {
        let f = fixture();
        fs::create_dir_all(f.wc.join("a/b")).unwrap();
        f.client.add(&f.wc.join("a/b")).unwrap();
        f.client.commit(&f.wc).unwrap();
        assert_eq!(f.repo.node_kind(1, "a").unwrap(), Some(NodeKind::Dir));
        assert_eq!(f.repo.node_kind(1, "a/b").unwrap(), Some(NodeKind::Dir));
    }

    #[test]
    fn test_add_twice_is_node_error() {
        let f = fixture();
        fs::write(f.wc.join("x"), "").unwrap();
        f.client.add(&f.wc.join("x")).unwrap();
        assert!(f.client.add(&f.wc.join("x")).unwrap_err().is_node_error());
        assert!(f.client.add(&f.wc.join("missing")).unwrap_err().is_node_error());
    }

    #[test]
    fn test_move_copy_delete() {
        let f = fixture();
        fs::create_dir_all(f.wc.join("app")).unwrap();
        fs::write(f.wc.join("app/hello.rb"), "hello").unwrap();
        fs::write(f.wc.join("app/goodbye.rb"), "bye").unwrap();
        f.client.add(&f.wc.join("app")).unwrap();
        f.client.propset("is_ruby", "Yes", &f.wc.join("app/hello.rb"), false).unwrap();
        f.client.commit(&f.wc).unwrap();

        f.client.move_path(&f.wc.join("app/goodbye.rb"), &f.wc.join("app/bye.rb")).unwrap();
        f.client.copy_path(&f.wc.join("app/hello.rb"), &f.wc.join("app/hello2.rb")).unwrap();
        assert_eq!(f.client.commit(&f.wc).unwrap(), Some(2));

        assert_eq!(f.repo.node_kind(2, "app/goodbye.rb").unwrap(), None);
        assert_eq!(f.repo.file_contents(2, "app/bye.rb").unwrap(), b"bye");
        assert_eq!(f.repo.file_contents(2, "app/hello2.rb").unwrap(), b"hello");
        assert_eq!(
            f.repo.node_properties(2, "app/hello2.rb").unwrap().get("is_ruby").map(String::as_str),
            Some("Yes")
        );

        f.client.delete(&f.wc.join("app")).unwrap();
        assert!(!f.wc.join("app").exists());
        assert_eq!(f.client.commit(&f.wc).unwrap(), Some(3));
        assert_eq!(f.repo.node_kind(3, "app").unwrap(), None);
        assert_eq!(f.repo.node_kind(3, "app/hello.rb").unwrap(), None);
    }

    #[test]
    fn test_move_into_directory() {
        let f = fixture();
        fs::create_dir_all(f.wc.join("lib")).unwrap();
        fs::write(f.wc.join("a.txt"), "a").unwrap();
        f.client.add(&f.wc.join("lib")).unwrap();
        f.client.add(&f.wc.join("a.txt")).unwrap();
        f.client.commit(&f.wc).unwrap();

        f.client.move_path(&f.wc.join("a.txt"), &f.wc.join("lib")).unwrap();
        f.client.commit(&f.wc).unwrap();
        assert_eq!(f.repo.node_kind(2, "lib/a.txt").unwrap(), Some(NodeKind::File));
        assert_eq!(f.repo.node_kind(2, "a.txt").unwrap(), None);
    }

    #[test]
    fn test_move_unversioned_is_node_error() {
        let f = fixture();
        let err = f
            .client
            .move_path(&f.wc.join("nope"), &f.wc.join("other"))
            .unwrap_err();
        assert!(err.is_node_error());
    }

    #[test]
    fn test_recursive_propset_and_propdel() {
        let f = fixture();
        fs::create_dir_all(f.wc.join("docs/api")).unwrap();
        fs::write(f.wc.join("docs/api/index.md"), "# api").unwrap();
        f.client.add(&f.wc.join("docs")).unwrap();
        f.client.propset("owner", "docs-team", &f.wc.join("docs"), true).unwrap();
        f.client.propdel("owner", &f.wc.join("docs/api")).unwrap();
        f.client.commit(&f.wc).unwrap();

        assert_eq!(f.repo.node_properties(1, "docs").unwrap().len(), 1);
        assert!(f.repo.node_properties(1, "docs/api").unwrap().is_empty());
        assert_eq!(
            f.repo.node_properties(1, "/docs/api/index.md/").unwrap()["owner"],
            "docs-team"
        );
    }

    #[test]
    fn test_revision_properties() {
        let f = fixture();
        f.repo.set_revision_property("svn:log", "Initial", 0).unwrap();
        assert_eq!(
            f.repo.revision_property("svn:log", 0).unwrap().as_deref(),
            Some("Initial")
        );
        assert!(matches!(
            f.repo.set_revision_property("svn:log", "x", 7).unwrap_err(),
            FixtureError::NoSuchRevision(7)
        ));
    }

    #[test]
    fn test_checkout_twice_reuses_working_copy() {
        let f = fixture();
        fs::write(f.wc.join("keep.txt"), "").unwrap();
        f.client.add(&f.wc.join("keep.txt")).unwrap();
        assert_eq!(f.client.checkout(&f.repo.url(), &f.wc).unwrap(), 0);
        assert_eq!(status_of(f.client.as_ref(), &f.wc.join("keep.txt")), vec![Status::Added]);
    }

    #[test]
    fn test_fresh_checkout_materializes_tree() {
        let f = fixture();
        fs::create_dir_all(f.wc.join("app")).unwrap();
        fs::write(f.wc.join("app/hello.rb"), "hi").unwrap();
        f.client.add(&f.wc.join("app")).unwrap();
        f.client.commit(&f.wc).unwrap();

        let other = f.wc.with_file_name("wc2");
        assert_eq!(f.client.checkout(&f.repo.url(), &other).unwrap(), 1);
        assert_eq!(fs::read_to_string(other.join("app/hello.rb")).unwrap(), "hi");
    }
}
