//! Main test module for svn-fixture
//!
//! This module includes all test suites:
//! - Integration tests for registry and manifest scenarios
//! - Property-based tests for commit invariants
//! - Edge cases of the node operations against a real working copy

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::svn_fixture::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn repository(base: &TempDir) -> Repository {
        Repository::new(
            "edge",
            base.path().join("repo_edge"),
            base.path().join("wc_edge"),
            Arc::new(LocalBackend::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_special_filenames() {
        let base = TempDir::new().unwrap();
        let mut repo = repository(&base);
        let names = [
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file.with.dots.txt",
            "file(with)parens.txt",
            "файл.txt",
            "文件.txt",
        ];

        repo.revision("r1", "Odd names", RevisionOptions::new(), move |root| {
            for name in names {
                root.file(name, |f| f.set_body(name))?;
            }
            Ok(())
        })
        .unwrap();
        repo.commit_all().unwrap();

        let inspect = repo.inspect().unwrap();
        for name in names {
            assert_eq!(inspect.file_contents(1, name).unwrap(), name.as_bytes());
        }
    }

    #[test]
    fn test_deep_nesting_adds_parents() {
        let base = TempDir::new().unwrap();
        let mut repo = repository(&base);
        repo.revision("r1", "Deep", RevisionOptions::new(), |root| {
            root.file("a/b/c/d/leaf.txt", |f| f.set_body("leaf"))
                .map(|_| ())
        })
        .unwrap();
        repo.commit_all().unwrap();

        let inspect = repo.inspect().unwrap();
        for dir in ["a", "a/b", "a/b/c", "a/b/c/d"] {
            assert_eq!(inspect.node_kind(1, dir).unwrap(), Some(NodeKind::Dir));
        }
        assert_eq!(inspect.node_kind(1, "a/b/c/d/leaf.txt").unwrap(), Some(NodeKind::File));
    }

    #[test]
    fn test_delete_then_recreate() {
        let base = TempDir::new().unwrap();
        let mut repo = repository(&base);
        repo.revision("add", "Add", RevisionOptions::new(), |root| {
            root.file("doc.txt", |f| f.set_body("v1")).map(|_| ())
        })
        .unwrap();
        repo.revision("delete", "Delete", RevisionOptions::new(), |root| {
            root.delete("doc.txt")
        })
        .unwrap();
        repo.revision("recreate", "Recreate", RevisionOptions::new(), |root| {
            root.file("doc.txt", |f| f.set_body("v2")).map(|_| ())
        })
        .unwrap();

        let reports = repo.commit_all().unwrap();
        assert_eq!(reports.len(), 3);

        let inspect = repo.inspect().unwrap();
        assert_eq!(inspect.node_kind(2, "doc.txt").unwrap(), None);
        assert_eq!(inspect.file_contents(3, "doc.txt").unwrap(), b"v2");
    }

    #[test]
    fn test_unstaged_directory_stays_unversioned() {
        let base = TempDir::new().unwrap();
        let mut repo = repository(&base);
        repo.checkout().unwrap();
        fs::create_dir(repo.working_copy_path().join("scratch")).unwrap();

        repo.revision("r1", "Touch scratch", RevisionOptions::new(), |root| {
            root.child_dir("scratch")?;
            root.child_dir("tracked")?;
            Ok(())
        })
        .unwrap();
        repo.commit_all().unwrap();

        let inspect = repo.inspect().unwrap();
        assert_eq!(inspect.node_kind(1, "scratch").unwrap(), None);
        assert_eq!(inspect.node_kind(1, "tracked").unwrap(), Some(NodeKind::Dir));
    }

    #[test]
    fn test_directory_property_delete() {
        let base = TempDir::new().unwrap();
        let mut repo = repository(&base);
        repo.revision("set", "Set", RevisionOptions::new(), |root| {
            root.dir("app", |app| app.set_property("owner", "team", false))
                .map(|_| ())
        })
        .unwrap();
        repo.revision("unset", "Unset", RevisionOptions::new(), |root| {
            root.dir("app", |app| app.delete_property("owner")).map(|_| ())
        })
        .unwrap();
        repo.commit_all().unwrap();

        let inspect = repo.inspect().unwrap();
        assert!(inspect.node_properties(1, "app").unwrap().contains_key("owner"));
        assert!(inspect.node_properties(2, "app").unwrap().is_empty());
    }
}
