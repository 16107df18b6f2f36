//! Subversion command-line engine
//!
//! [`SvnBackend`] drives the `svn`, `svnadmin` and `svnlook` tools. Revision
//! properties are written with `svnadmin setrevprop`, which bypasses the
//! `pre-revprop-change` hook a fresh repository lacks.

use crate::backend::{Backend, Client, RepositoryHandle};
use crate::error::{FixtureError, Result};
use crate::types::{NodeKind, PropList, Revnum, Status};
use crate::utils;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, trace};

/// Engine backed by the Subversion command-line tools
#[derive(Debug, Clone)]
pub struct SvnBackend {
    svn: PathBuf,
    svnadmin: PathBuf,
    svnlook: PathBuf,
}

impl Default for SvnBackend {
    fn default() -> Self {
        Self {
            svn: PathBuf::from("svn"),
            svnadmin: PathBuf::from("svnadmin"),
            svnlook: PathBuf::from("svnlook"),
        }
    }
}

impl SvnBackend {
    /// Use the tools found on `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Use tools installed in `dir`
    pub fn with_tool_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            svn: dir.join("svn"),
            svnadmin: dir.join("svnadmin"),
            svnlook: dir.join("svnlook"),
        }
    }

    /// Whether `svn`, `svnadmin` and `svnlook` all run
    pub fn is_available(&self) -> bool {
        [&self.svn, &self.svnadmin, &self.svnlook].iter().all(|tool| {
            Command::new(tool)
                .arg("--version")
                .arg("--quiet")
                .output()
                .map(|out| out.status.success())
                .unwrap_or(false)
        })
    }
}

impl Backend for SvnBackend {
    fn name(&self) -> &'static str {
        "svn"
    }

    fn create(&self, storage: &Path) -> Result<()> {
        run(&self.svnadmin, "svnadmin create", [OsStr::new("create"), storage.as_os_str()])?;
        info!("Created Subversion repository at {:?}", storage);
        Ok(())
    }

    fn is_repository(&self, storage: &Path) -> bool {
        storage.join("format").is_file() && storage.join("db").is_dir()
    }

    fn open(&self, storage: &Path) -> Result<Box<dyn RepositoryHandle>> {
        if !self.is_repository(storage) {
            return Err(FixtureError::backend(
                "open",
                format!("no Subversion repository at {storage:?}"),
            ));
        }
        Ok(Box::new(SvnRepository {
            tools: self.clone(),
            path: storage.to_path_buf(),
        }))
    }

    fn client(&self) -> Result<Box<dyn Client>> {
        Ok(Box::new(SvnClient {
            svn: self.svn.clone(),
        }))
    }
}

/// Run a tool and return its stdout, mapping a non-zero exit to a backend error
fn run<I, S>(program: &Path, operation: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(FixtureError::backend(
            operation,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Property names from `proplist -q` style output, one indented name per line
fn parse_property_names(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.starts_with(' '))
        .map(|line| line.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Nodes from `svnlook tree --full-paths` output; directories end in `/`
fn parse_tree_paths(output: &str) -> BTreeMap<String, NodeKind> {
    output
        .lines()
        .map(str::trim_end)
        .map(|line| match line.strip_suffix('/') {
            Some(dir) => (dir.trim_start_matches('/'), NodeKind::Dir),
            None => (line.trim_start_matches('/'), NodeKind::File),
        })
        .filter(|(path, _)| !path.is_empty())
        .map(|(path, kind)| (path.to_string(), kind))
        .collect()
}

/// Arguments for `svn propset`; `--` keeps names and values that start with
/// `-` from being read as options
fn propset_args(name: &str, value: &str, path: &Path, recursive: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["propset".into()];
    if recursive {
        args.push("--recursive".into());
    }
    args.push("--".into());
    args.push(name.into());
    args.push(value.into());
    args.push(path.as_os_str().to_os_string());
    args
}

fn propdel_args(name: &str, path: &Path) -> Vec<OsString> {
    vec![
        "propdel".into(),
        "--".into(),
        name.into(),
        path.as_os_str().to_os_string(),
    ]
}

fn propget_args(name: &str, path: &Path) -> Vec<OsString> {
    vec![
        "propget".into(),
        "--no-newline".into(),
        "--".into(),
        name.into(),
        path.as_os_str().to_os_string(),
    ]
}

/// Revision number from `svn commit` output
fn parse_committed_revision(output: &str) -> Option<Revnum> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Committed revision ")
            .and_then(|rest| rest.trim_end_matches('.').parse().ok())
    })
}

/// Status from the first column of `svn status` output
fn parse_status_code(code: char) -> Status {
    match code {
        'A' => Status::Added,
        'D' => Status::Deleted,
        'M' | 'R' => Status::Modified,
        '?' => Status::Unversioned,
        _ => Status::Normal,
    }
}

/// Client running `svn` subcommands
#[derive(Debug, Clone)]
struct SvnClient {
    svn: PathBuf,
}

impl SvnClient {
    fn svn<I, S>(&self, operation: &str, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut full: Vec<OsString> = vec!["--non-interactive".into()];
        full.extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        trace!("svn {:?}", full);
        run(&self.svn, operation, full)
    }
}

impl Client for SvnClient {
    fn checkout(&self, url: &str, dest: &Path) -> Result<Revnum> {
        let output = self.svn("checkout", [OsStr::new("checkout"), OsStr::new(url), dest.as_os_str()])?;
        let revision = output
            .lines()
            .find_map(|line| {
                line.trim()
                    .strip_prefix("Checked out revision ")
                    .and_then(|rest| rest.trim_end_matches('.').parse().ok())
            })
            .unwrap_or(0);
        info!("Checked out r{} of {} into {:?}", revision, url, dest);
        Ok(revision)
    }

    fn add(&self, path: &Path) -> Result<()> {
        self.svn("add", [OsStr::new("add"), OsStr::new("--parents"), path.as_os_str()])?;
        debug!("Added {:?}", path);
        Ok(())
    }

    fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        self.svn("move", [OsStr::new("move"), from.as_os_str(), to.as_os_str()])?;
        debug!("Moved {:?} -> {:?}", from, to);
        Ok(())
    }

    fn copy_path(&self, from: &Path, to: &Path) -> Result<()> {
        self.svn("copy", [OsStr::new("copy"), from.as_os_str(), to.as_os_str()])?;
        debug!("Copied {:?} -> {:?}", from, to);
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.svn("delete", [OsStr::new("delete"), OsStr::new("--force"), path.as_os_str()])?;
        debug!("Deleted {:?}", path);
        Ok(())
    }

    fn propset(&self, name: &str, value: &str, path: &Path, recursive: bool) -> Result<()> {
        self.svn("propset", propset_args(name, value, path, recursive))?;
        Ok(())
    }

    fn propdel(&self, name: &str, path: &Path) -> Result<()> {
        self.svn("propdel", propdel_args(name, path))?;
        Ok(())
    }

    fn proplist(&self, path: &Path) -> Result<Vec<PropList>> {
        let names = parse_property_names(&self.svn(
            "proplist",
            [OsStr::new("proplist"), OsStr::new("--quiet"), path.as_os_str()],
        )?);

        let mut props = BTreeMap::new();
        for name in names {
            let value = self.svn("propget", propget_args(&name, path))?;
            props.insert(name, value);
        }
        Ok(vec![PropList {
            path: path.to_path_buf(),
            props,
        }])
    }

    fn status(&self, path: &Path, callback: &mut dyn FnMut(&Path, Status)) -> Result<()> {
        let output = self.svn(
            "status",
            [OsStr::new("status"), OsStr::new("--depth"), OsStr::new("empty"), path.as_os_str()],
        )?;
        let status = output
            .lines()
            .find_map(|line| line.chars().next())
            .map(parse_status_code)
            .unwrap_or(Status::Normal);
        callback(path, status);
        Ok(())
    }

    fn commit(&self, working_copy: &Path) -> Result<Option<Revnum>> {
        let output = self.svn(
            "commit",
            [OsStr::new("commit"), OsStr::new("--message"), OsStr::new(""), working_copy.as_os_str()],
        )?;
        let revision = parse_committed_revision(&output);
        match revision {
            Some(rev) => info!("Committed revision {} from {:?}", rev, working_copy),
            None => debug!("Nothing to commit in {:?}", working_copy),
        }
        Ok(revision)
    }
}

/// A Subversion repository read through `svnlook` and written through `svnadmin`
#[derive(Debug)]
struct SvnRepository {
    tools: SvnBackend,
    path: PathBuf,
}

impl SvnRepository {
    fn svnlook<I, S>(&self, operation: &str, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        run(&self.tools.svnlook, operation, args)
    }
}

impl RepositoryHandle for SvnRepository {
    fn url(&self) -> String {
        utils::file_url(&self.path)
    }

    fn youngest_revision(&self) -> Result<Revnum> {
        let output = self.svnlook("youngest", [OsStr::new("youngest"), self.path.as_os_str()])?;
        output.trim().parse().map_err(|_| {
            FixtureError::backend("youngest", format!("unexpected output {output:?}"))
        })
    }

    fn set_revision_property(&self, name: &str, value: &str, revision: Revnum) -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(value.as_bytes())?;
        file.flush()?;

        let revision_arg = revision.to_string();
        run(
            &self.tools.svnadmin,
            "svnadmin setrevprop",
            [
                OsStr::new("setrevprop"),
                self.path.as_os_str(),
                OsStr::new("-r"),
                OsStr::new(&revision_arg),
                OsStr::new(name),
                file.path().as_os_str(),
            ],
        )?;
        debug!("Set revision property {}={:?} on r{}", name, value, revision);
        Ok(())
    }

    fn revision_property(&self, name: &str, revision: Revnum) -> Result<Option<String>> {
        let revision_arg = revision.to_string();
        let names = parse_property_names(&self.svnlook(
            "svnlook proplist",
            [
                OsStr::new("proplist"),
                OsStr::new("--revprop"),
                OsStr::new("-r"),
                OsStr::new(&revision_arg),
                self.path.as_os_str(),
            ],
        )?);
        if !names.iter().any(|candidate| candidate == name) {
            return Ok(None);
        }
        self.svnlook(
            "svnlook propget",
            [
                OsStr::new("propget"),
                OsStr::new("--revprop"),
                OsStr::new("-r"),
                OsStr::new(&revision_arg),
                self.path.as_os_str(),
                OsStr::new(name),
            ],
        )
        .map(Some)
    }

    fn node_kind(&self, revision: Revnum, path: &str) -> Result<Option<NodeKind>> {
        let revision_arg = revision.to_string();
        let output = Command::new(&self.tools.svnlook)
            .args([
                OsStr::new("tree"),
                OsStr::new("--non-recursive"),
                OsStr::new("-r"),
                OsStr::new(&revision_arg),
                self.path.as_os_str(),
                OsStr::new(path),
            ])
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("E160013") {
                return Ok(None);
            }
            return Err(FixtureError::backend("svnlook tree", stderr.trim()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().map(|line| {
            if line.trim_end().ends_with('/') {
                NodeKind::Dir
            } else {
                NodeKind::File
            }
        }))
    }

    fn file_contents(&self, revision: Revnum, path: &str) -> Result<Vec<u8>> {
        let revision_arg = revision.to_string();
        let output = Command::new(&self.tools.svnlook)
            .args([
                OsStr::new("cat"),
                OsStr::new("-r"),
                OsStr::new(&revision_arg),
                self.path.as_os_str(),
                OsStr::new(path),
            ])
            .output()?;
        if !output.status.success() {
            return Err(FixtureError::node(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(output.stdout)
    }

    fn node_properties(&self, revision: Revnum, path: &str) -> Result<BTreeMap<String, String>> {
        let revision_arg = revision.to_string();
        let names = parse_property_names(&self.svnlook(
            "svnlook proplist",
            [
                OsStr::new("proplist"),
                OsStr::new("-r"),
                OsStr::new(&revision_arg),
                self.path.as_os_str(),
                OsStr::new(path),
            ],
        )?);

        let mut props = BTreeMap::new();
        for name in names {
            let value = self.svnlook(
                "svnlook propget",
                [
                    OsStr::new("propget"),
                    OsStr::new("-r"),
                    OsStr::new(&revision_arg),
                    self.path.as_os_str(),
                    OsStr::new(&name),
                    OsStr::new(path),
                ],
            )?;
            props.insert(name, value);
        }
        Ok(props)
    }

    fn list_nodes(&self, revision: Revnum) -> Result<BTreeMap<String, NodeKind>> {
        let revision_arg = revision.to_string();
        let output = self.svnlook(
            "svnlook tree",
            [
                OsStr::new("tree"),
                OsStr::new("--full-paths"),
                OsStr::new("-r"),
                OsStr::new(&revision_arg),
                self.path.as_os_str(),
            ],
        )?;
        Ok(parse_tree_paths(&output))
    }
}
