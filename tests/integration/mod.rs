//! Integration tests for svn-fixture
//!
//! Registry lifecycles, commit selection and manifest-driven fixtures,
//! all against the local engine.

use ::svn_fixture::*;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A registry rooted in its own temporary base directory
pub struct FixtureHarness {
    pub base: TempDir,
    pub registry: Registry,
}

impl FixtureHarness {
    pub fn new() -> Self {
        let base = TempDir::new().unwrap();
        let registry = Registry::new(
            FixtureConfig::default().with_base_path(base.path()),
            Arc::new(LocalBackend::new()),
        );
        Self { base, registry }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.base.path().join(name)
    }
}

impl Default for FixtureHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub const HELLO_WORLD: &str = r#"{
    "repository": "hello_world",
    "revisions": [
        {
            "name": "r1",
            "message": "Create directories",
            "date": "2009-01-01 12:00:00",
            "changes": [
                { "op": "dir", "name": "app" },
                { "op": "dir", "name": "docs" },
                { "op": "dir", "name": "lib" }
            ]
        },
        {
            "name": "r2",
            "message": "Add greetings",
            "changes": [
                { "op": "dir", "name": "app", "props": { "full_name": "Application" }, "changes": [
                    { "op": "file", "name": "hello.rb", "body": "puts \"Hello World\"",
                      "props": { "is_ruby": "Yes" } },
                    { "op": "file", "name": "goodbye.rb", "body": "puts \"Goodbye World\"" }
                ] }
            ]
        },
        {
            "name": "r3",
            "message": "Update hello.rb",
            "author": "the.author",
            "changes": [
                { "op": "file", "name": "app/hello.rb", "body": "puts \"Howdy World\"",
                  "props": { "is_ruby": "Probably" } }
            ]
        },
        {
            "name": "r4",
            "message": "Rename and copy",
            "changes": [
                { "op": "dir", "name": "app", "changes": [
                    { "op": "move", "from": "goodbye.rb", "to": "bye.rb" },
                    { "op": "copy", "from": "hello.rb", "to": "hello2.rb" }
                ] }
            ]
        }
    ]
}"#;

fn declare_dirs(repo: &mut Repository, name: &str, dirs: &'static [&'static str]) {
    repo.revision(name, format!("Create {}", dirs.join(", ")), RevisionOptions::new(), move |root| {
        for dir in dirs {
            root.child_dir(dir)?;
        }
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_manifest_builds_hello_world() {
    let mut harness = FixtureHarness::new();
    let manifest = FixtureManifest::from_json(HELLO_WORLD).unwrap();
    let repo = harness.registry.load_manifest(manifest).unwrap();
    assert_eq!(repo.revisions().len(), 4);

    let reports = repo.commit_all().unwrap();
    assert!(reports.iter().all(|r| matches!(r.outcome, CommitOutcome::Committed(_))));

    let inspect = repo.inspect().unwrap();
    assert_eq!(
        inspect.list_nodes(1).unwrap().keys().map(String::as_str).collect::<Vec<_>>(),
        ["app", "docs", "lib"]
    );
    assert!(inspect.list_nodes(1).unwrap().values().all(|kind| *kind == NodeKind::Dir));
    assert_eq!(
        inspect.revision_property(PROP_REVISION_DATE, 1).unwrap().as_deref(),
        Some("2009-01-01T12:00:00.000000Z")
    );
    assert_eq!(
        inspect.revision_property(PROP_REVISION_AUTHOR, 3).unwrap().as_deref(),
        Some("the.author")
    );
    assert_eq!(inspect.file_contents(4, "app/bye.rb").unwrap(), b"puts \"Goodbye World\"");
    assert_eq!(inspect.file_contents(4, "app/hello2.rb").unwrap(), b"puts \"Howdy World\"");
    assert_eq!(inspect.node_kind(4, "app/goodbye.rb").unwrap(), None);
}

#[test]
fn test_destroy_isolates_repositories() {
    let mut harness = FixtureHarness::new();
    for name in ["one", "two"] {
        let repo = harness.registry.get_or_create(name, None, None).unwrap();
        declare_dirs(repo, "r1", &["app"]);
        repo.commit_all().unwrap();
    }

    assert!(harness.registry.destroy("one").unwrap());
    assert!(!harness.path("repo_one").exists());
    assert!(!harness.path("wc_one").exists());

    assert!(harness.path("repo_two").exists());
    assert!(harness.path("wc_two/app").is_dir());
    assert_eq!(harness.registry.names().collect::<Vec<_>>(), ["two"]);

    // the surviving fixture keeps working
    let repo = harness.registry.get_mut("two").unwrap();
    declare_dirs(repo, "r2", &["lib"]);
    let reports = repo.commit_selected(["r2"]).unwrap();
    assert_eq!(reports[0].outcome, CommitOutcome::Committed(2));

    harness.registry.destroy_all().unwrap();
    assert!(harness.registry.is_empty());
    assert_eq!(fs::read_dir(harness.base.path()).unwrap().count(), 0);
}

#[test]
fn test_revision_cannot_touch_another_working_copy() {
    let mut harness = FixtureHarness::new();
    let repo = harness.registry.get_or_create("b", None, None).unwrap();
    declare_dirs(repo, "r1", &["app"]);
    repo.commit_all().unwrap();

    let foreign = harness.path("wc_b/app").to_str().unwrap().to_string();
    let repo = harness.registry.get_or_create("a", None, None).unwrap();
    repo.revision("r1", "Reach into b", RevisionOptions::new(), move |root| {
        root.delete(&foreign)
    })
    .unwrap();
    repo.revision("r2", "Escape upwards", RevisionOptions::new(), |root| {
        root.child_dir("../escaped").map(|_| ())
    })
    .unwrap();

    assert!(repo.commit_selected(["r1"]).unwrap_err().is_node_error());
    assert!(repo.commit_selected(["r2"]).unwrap_err().is_node_error());
    assert!(harness.path("wc_b/app").is_dir());
    assert!(!harness.path("escaped").exists());

    harness.registry.destroy_all().unwrap();
    assert_eq!(fs::read_dir(harness.base.path()).unwrap().count(), 0);
}

#[test]
fn test_destroy_keeps_directories_it_did_not_create() {
    let harness = FixtureHarness::new();
    let storage = harness.path("existing_repo");
    fs::create_dir(&storage).unwrap();
    fs::write(storage.join("keep.txt"), "precious").unwrap();

    let mut repo = Repository::new(
        "manual",
        &storage,
        harness.path("wc_manual"),
        Arc::clone(harness.registry.backend()),
    )
    .unwrap();
    declare_dirs(&mut repo, "r1", &["docs"]);
    repo.commit_all().unwrap();
    repo.destroy().unwrap();

    assert_eq!(fs::read_to_string(storage.join("keep.txt")).unwrap(), "precious");
    assert!(!harness.path("wc_manual").exists());
}

#[test]
fn test_explicit_locations_and_uri() {
    let mut harness = FixtureHarness::new();
    let storage = harness.path("custom/storage");
    let wc = harness.path("custom/wc");
    let repo = harness
        .registry
        .create("custom", Some(storage.clone()), Some(wc.clone()))
        .unwrap();
    assert_eq!(repo.storage_path(), storage);
    assert_eq!(repo.working_copy_path(), wc);
    assert!(repo.uri().starts_with("file://"));
    assert!(repo.uri().ends_with("custom/storage"));

    repo.checkout().unwrap();
    assert!(wc.is_dir());
    assert_eq!(repo.inspect().unwrap().youngest_revision().unwrap(), 0);
}

#[test]
fn test_commit_selection_recommits_by_name() {
    let mut harness = FixtureHarness::new();
    let repo = harness.registry.get_or_create("select", None, None).unwrap();
    declare_dirs(repo, "first", &["a"]);
    declare_dirs(repo, "second", &["b"]);

    let reports = repo.commit_selected(["second", "first", "second"]).unwrap();
    let outcomes: Vec<_> = reports.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        [
            CommitOutcome::Committed(1),
            CommitOutcome::Committed(2),
            CommitOutcome::NoChange
        ]
    );
    assert_eq!(
        repo.inspect().unwrap().revision_property(PROP_REVISION_LOG, 1).unwrap().as_deref(),
        Some("Create b")
    );
}

#[test]
fn test_manifest_file_round_trip() {
    let mut harness = FixtureHarness::new();
    let path = harness.path("fixture.json");
    fs::write(&path, HELLO_WORLD).unwrap();

    let manifest = FixtureManifest::from_path(&path).unwrap();
    assert_eq!(manifest.revisions[2].author.as_deref(), Some("the.author"));
    harness.registry.load_manifest(manifest).unwrap();
    assert!(harness.registry.contains("hello_world"));
    assert!(!harness.path("repo_hello_world").exists());
}
