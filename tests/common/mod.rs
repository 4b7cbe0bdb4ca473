#![allow(dead_code)]

use strata::store::{SqliteStore, Store};
use strata::types::{Branch, Commit, FileWrite, Repository};
use tempfile::TempDir;

pub struct TestStore {
    pub store: SqliteStore,
    _temp_dir: TempDir,
}

pub fn test_store() -> TestStore {
    let temp_dir = TempDir::new().expect("create temp dir");
    let store = SqliteStore::new(temp_dir.path().join("strata.db")).expect("open database");
    store.initialize().expect("initialize schema");

    TestStore {
        store,
        _temp_dir: temp_dir,
    }
}

impl TestStore {
    pub fn repo(&self, name: &str) -> Repository {
        self.store.create_repository(name).expect("create repository")
    }

    pub fn commit(&self, repository_id: &str, parent: Option<&str>, message: &str) -> Commit {
        self.store
            .create_commit(repository_id, parent, None, message)
            .expect("create commit")
    }

    pub fn write(&self, commit_id: &str, path: &str, content: &str) {
        self.store
            .put_file(commit_id, &FileWrite::file(path, content))
            .expect("write file");
    }

    pub fn main_branch(&self, repo: &Repository) -> Branch {
        let id = repo.default_branch_id.as_deref().expect("default branch id");
        self.store
            .get_branch(id)
            .expect("get branch")
            .expect("main branch")
    }
}
