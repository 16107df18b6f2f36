//! Property-based testing for svn-fixture
//!
//! Uses proptest to check that arbitrary fixture trees commit to exactly the
//! declared content, and that re-declaring the same tree changes nothing.

use ::svn_fixture::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Generate a file path of the form `[dir/]name.txt`
///
/// Directory names never end in `.txt`, so a generated path never needs a
/// directory and a file at the same location.
fn path_strategy() -> impl Strategy<Value = String> {
    (
        prop::option::of("[a-z]{1,6}"),
        "[a-z]{1,8}".prop_map(|s| format!("{s}.txt")),
    )
        .prop_map(|(dir, file)| match dir {
            Some(dir) => format!("{dir}/{file}"),
            None => file,
        })
}

/// Generate a tree of files with bodies
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(path_strategy(), "[a-zA-Z0-9 \n]{0,200}", 1..12)
}

fn fixture(base: &TempDir, tree: &BTreeMap<String, String>, copies: usize) -> Repository {
    let mut repo = Repository::new(
        "prop",
        base.path().join("repo_prop"),
        base.path().join("wc_prop"),
        Arc::new(LocalBackend::new()),
    )
    .unwrap();

    for i in 0..copies {
        let tree = tree.clone();
        repo.revision(format!("r{i}"), "Write tree", RevisionOptions::new(), move |root| {
            for (path, body) in &tree {
                root.file(path, |f| f.set_body(body))?;
            }
            Ok(())
        })
        .unwrap();
    }
    repo
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_committed_tree_matches_declaration(tree in tree_strategy()) {
        let base = TempDir::new().unwrap();
        let mut repo = fixture(&base, &tree, 1);
        let reports = repo.commit_all().unwrap();
        prop_assert_eq!(reports[0].outcome, CommitOutcome::Committed(1));

        let inspect = repo.inspect().unwrap();
        for (path, body) in &tree {
            prop_assert_eq!(inspect.node_kind(1, path).unwrap(), Some(NodeKind::File));
            prop_assert_eq!(inspect.file_contents(1, path).unwrap(), body.as_bytes());
        }
    }

    #[test]
    fn prop_redeclared_tree_is_no_change(tree in tree_strategy()) {
        let base = TempDir::new().unwrap();
        let mut repo = fixture(&base, &tree, 2);
        let reports = repo.commit_all().unwrap();
        prop_assert_eq!(reports[0].outcome, CommitOutcome::Committed(1));
        prop_assert_eq!(reports[1].outcome, CommitOutcome::NoChange);
        prop_assert_eq!(repo.inspect().unwrap().youngest_revision().unwrap(), 1);
    }
}
