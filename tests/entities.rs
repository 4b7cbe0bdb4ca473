mod common;

use common::test_store;
use strata::error::Error;
use strata::store::Store;
use strata::types::FileWrite;

#[test]
fn repository_creation_wires_default_branch() {
    let t = test_store();
    let repo = t.repo("project");

    let main = t.main_branch(&repo);
    assert_eq!(main.name, "main");
    assert_eq!(main.repository_id, repo.id);
    assert!(main.head_commit_id.is_none());

    let by_name = t
        .store
        .get_branch_by_name(&repo.id, "main")
        .unwrap()
        .expect("main exists");
    assert_eq!(by_name.id, main.id);
}

#[test]
fn branch_defaults_to_default_branch_head() {
    let t = test_store();
    let repo = t.repo("project");
    let main = t.main_branch(&repo);

    let c0 = t.commit(&repo.id, None, "init");
    t.store
        .update_branch_head(&main.id, Some(&c0.id))
        .unwrap();

    let feature = t.store.create_branch(&repo.id, "feature", None).unwrap();
    assert_eq!(feature.head_commit_id.as_deref(), Some(c0.id.as_str()));

    // An explicit head is kept as given.
    let c1 = t.commit(&repo.id, Some(&c0.id), "more");
    let pinned = t
        .store
        .create_branch(&repo.id, "pinned", Some(&c1.id))
        .unwrap();
    assert_eq!(pinned.head_commit_id.as_deref(), Some(c1.id.as_str()));
}

#[test]
fn branch_creation_never_creates_commits() {
    let t = test_store();
    let repo = t.repo("project");

    t.store.create_branch(&repo.id, "feature", None).unwrap();
    assert!(t.store.list_commits(&repo.id, "", 100).unwrap().is_empty());
}

#[test]
fn duplicate_branch_name_is_rejected() {
    let t = test_store();
    let repo = t.repo("project");

    let err = t.store.create_branch(&repo.id, "main", None).unwrap_err();
    assert!(matches!(err, Error::Database(_)));
}

#[test]
fn commit_parent_must_share_repository() {
    let t = test_store();
    let repo_a = t.repo("a");
    let repo_b = t.repo("b");

    let c0 = t.commit(&repo_a.id, None, "init");
    let err = t
        .store
        .create_commit(&repo_b.id, Some(&c0.id), None, "cross")
        .unwrap_err();
    assert!(matches!(err, Error::CrossRepository));

    let err = t
        .store
        .create_commit(&repo_a.id, Some("no-such-commit"), None, "dangling")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCommit(_)));
}

#[test]
fn branch_head_must_share_repository() {
    let t = test_store();
    let repo_a = t.repo("a");
    let repo_b = t.repo("b");
    let c0 = t.commit(&repo_a.id, None, "init");

    let err = t
        .store
        .create_branch(&repo_b.id, "feature", Some(&c0.id))
        .unwrap_err();
    assert!(matches!(err, Error::CrossRepository));

    let main_b = t.main_branch(&repo_b);
    let err = t
        .store
        .update_branch_head(&main_b.id, Some(&c0.id))
        .unwrap_err();
    assert!(matches!(err, Error::CrossRepository));
}

#[test]
fn put_file_upserts_on_commit_and_path() {
    let t = test_store();
    let repo = t.repo("project");
    let c0 = t.commit(&repo.id, None, "init");

    let first = t
        .store
        .put_file(&c0.id, &FileWrite::file("/a.txt", "one"))
        .unwrap();
    let second = t
        .store
        .put_file(&c0.id, &FileWrite::file("/a.txt", "two"))
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.content.as_deref(), Some("two"));
    assert_eq!(t.store.list_commit_files(&c0.id).unwrap().len(), 1);
}

#[test]
fn tombstone_invariants_are_enforced() {
    let t = test_store();
    let repo = t.repo("project");
    let c0 = t.commit(&repo.id, None, "init");

    let mut bad = FileWrite::tombstone("/a.txt");
    bad.content = Some("leftover".to_string());
    assert!(matches!(
        t.store.put_file(&c0.id, &bad),
        Err(Error::InvalidFileEntry(_))
    ));

    let mut bad = FileWrite::tombstone("/a.txt");
    bad.is_symlink = true;
    assert!(matches!(
        t.store.put_file(&c0.id, &bad),
        Err(Error::InvalidFileEntry(_))
    ));

    let mut bad = FileWrite::symlink("/link", "/target");
    bad.content = None;
    assert!(matches!(t.store.put_file(&c0.id, &bad), Err(Error::PathNull)));
}

#[test]
fn delete_file_entry_removes_the_row() {
    let t = test_store();
    let repo = t.repo("project");
    let c0 = t.commit(&repo.id, None, "init");
    t.write(&c0.id, "/a.txt", "one");

    assert!(t.store.delete_file_entry(&c0.id, "a.txt/").unwrap());
    assert!(!t.store.delete_file_entry(&c0.id, "/a.txt").unwrap());
    assert!(t.store.get_file_entry(&c0.id, "/a.txt").unwrap().is_none());
}

#[test]
fn repository_listing_paginates_by_cursor() {
    let t = test_store();
    for name in ["one", "two", "three"] {
        t.repo(name);
    }

    let first_page = t.store.list_repositories("", 2).unwrap();
    assert_eq!(first_page.len(), 2);

    let rest = t
        .store
        .list_repositories(&first_page[1].id, 10)
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert!(first_page[1].id < rest[0].id);
}

#[test]
fn delete_repository_cascades() {
    let t = test_store();
    let repo = t.repo("doomed");
    let c0 = t.commit(&repo.id, None, "init");
    t.write(&c0.id, "/a.txt", "one");

    assert!(t.store.delete_repository(&repo.id).unwrap());
    assert!(!t.store.delete_repository(&repo.id).unwrap());
    assert!(t.store.get_commit(&c0.id).unwrap().is_none());
    assert!(t.store.list_branches(&repo.id).unwrap().is_empty());
}

#[test]
fn delete_branch_leaves_commits_behind() {
    let t = test_store();
    let repo = t.repo("project");
    let c0 = t.commit(&repo.id, None, "init");
    let feature = t
        .store
        .create_branch(&repo.id, "feature", Some(&c0.id))
        .unwrap();

    assert!(t.store.delete_branch(&feature.id).unwrap());
    assert!(t.store.get_commit(&c0.id).unwrap().is_some());
}
