mod common;

use common::test_store;
use strata::error::Error;
use strata::store::Store;
use strata::types::FileWrite;

#[test]
fn basic_write_read() {
    let t = test_store();
    let repo = t.repo("r");
    let c0 = t.commit(&repo.id, None, "init");

    t.write(&c0.id, "/test.txt", "Hello World");

    assert_eq!(
        t.store.read_file(&c0.id, "/test.txt").unwrap().as_deref(),
        Some("Hello World")
    );
}

#[test]
fn reads_cascade_to_ancestors_until_overridden() {
    let t = test_store();
    let repo = t.repo("r");
    let c1 = t.commit(&repo.id, None, "c1");
    let c2 = t.commit(&repo.id, Some(&c1.id), "c2");

    t.write(&c1.id, "/persistent.txt", "v1");
    assert_eq!(
        t.store.read_file(&c1.id, "/persistent.txt").unwrap().as_deref(),
        Some("v1")
    );
    assert_eq!(
        t.store.read_file(&c2.id, "/persistent.txt").unwrap().as_deref(),
        Some("v1")
    );

    t.write(&c2.id, "/persistent.txt", "v2");
    assert_eq!(
        t.store.read_file(&c1.id, "/persistent.txt").unwrap().as_deref(),
        Some("v1")
    );
    assert_eq!(
        t.store.read_file(&c2.id, "/persistent.txt").unwrap().as_deref(),
        Some("v2")
    );
}

#[test]
fn tombstone_masks_ancestor_writes() {
    let t = test_store();
    let repo = t.repo("r");
    let c1 = t.commit(&repo.id, None, "c1");
    let c2 = t.commit(&repo.id, Some(&c1.id), "c2");

    t.write(&c1.id, "/x", "hello");
    t.store
        .put_file(&c2.id, &FileWrite::tombstone("/x"))
        .unwrap();

    assert_eq!(
        t.store.read_file(&c1.id, "/x").unwrap().as_deref(),
        Some("hello")
    );
    assert!(t.store.read_file(&c2.id, "/x").unwrap().is_none());

    let snapshot = t.store.get_commit_snapshot(&c2.id).unwrap();
    assert!(snapshot.iter().all(|v| v.path != "/x"));

    // History still lists both the tombstone and the ancestor version.
    let history = t.store.get_file_history(&c2.id, "/x").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|r| r.is_deleted).count(), 1);
    assert!(history
        .iter()
        .any(|r| r.content.as_deref() == Some("hello")));
}

#[test]
fn paths_normalize_on_write() {
    let t = test_store();
    let repo = t.repo("r");
    let c0 = t.commit(&repo.id, None, "init");

    let entry = t
        .store
        .put_file(&c0.id, &FileWrite::file("//src//main.ts/", "code"))
        .unwrap();
    assert_eq!(entry.path, "/src/main.ts");

    // read_file normalizes its path argument the same way.
    assert_eq!(
        t.store.read_file(&c0.id, "src/main.ts").unwrap().as_deref(),
        Some("code")
    );
}

#[test]
fn symlink_targets_normalize_on_write() {
    let t = test_store();
    let repo = t.repo("r");
    let c0 = t.commit(&repo.id, None, "init");

    let entry = t
        .store
        .put_file(&c0.id, &FileWrite::symlink("/link.txt", "target.txt"))
        .unwrap();
    assert!(entry.is_symlink);
    assert_eq!(entry.content.as_deref(), Some("/target.txt"));

    // The stored target is returned as the content; no transparent
    // resolution to the target's own content.
    assert_eq!(
        t.store.read_file(&c0.id, "/link.txt").unwrap().as_deref(),
        Some("/target.txt")
    );
}

#[test]
fn invalid_paths_are_rejected_on_read() {
    let t = test_store();
    let repo = t.repo("r");
    let c0 = t.commit(&repo.id, None, "init");

    assert!(matches!(
        t.store.read_file(&c0.id, ""),
        Err(Error::PathNull)
    ));
    assert!(matches!(
        t.store.read_file(&c0.id, "/a\nb"),
        Err(Error::PathControlChars)
    ));
    assert!(matches!(
        t.store.read_file(&c0.id, "/a*b"),
        Err(Error::PathWindowsInvalid)
    ));
}

#[test]
fn empty_content_is_a_file() {
    let t = test_store();
    let repo = t.repo("r");
    let c0 = t.commit(&repo.id, None, "init");

    t.write(&c0.id, "/empty", "");
    assert_eq!(t.store.read_file(&c0.id, "/empty").unwrap().as_deref(), Some(""));
    assert!(t.store.read_file(&c0.id, "/missing").unwrap().is_none());
}

#[test]
fn delta_lists_only_the_commit_entries() {
    let t = test_store();
    let repo = t.repo("r");
    let c1 = t.commit(&repo.id, None, "first");
    let c2 = t.commit(&repo.id, Some(&c1.id), "second");

    t.write(&c1.id, "/inherited.txt", "old");
    t.write(&c2.id, "/fresh.txt", "new");

    let delta = t.store.get_commit_delta(&c2.id).unwrap();
    assert_eq!(delta.len(), 1);
    assert_eq!(delta[0].path, "/fresh.txt");
    assert_eq!(delta[0].repository_name, "r");
    assert_eq!(delta[0].commit_message, "second");
}

#[test]
fn snapshot_agrees_with_reads() {
    let t = test_store();
    let repo = t.repo("r");
    let c1 = t.commit(&repo.id, None, "c1");
    let c2 = t.commit(&repo.id, Some(&c1.id), "c2");
    let c3 = t.commit(&repo.id, Some(&c2.id), "c3");

    t.write(&c1.id, "/a", "a1");
    t.write(&c1.id, "/b", "b1");
    t.write(&c2.id, "/a", "a2");
    t.store
        .put_file(&c3.id, &FileWrite::tombstone("/b"))
        .unwrap();
    t.write(&c3.id, "/c", "c3");

    let snapshot = t.store.get_commit_snapshot(&c3.id).unwrap();
    let paths: Vec<&str> = snapshot.iter().map(|v| v.path.as_str()).collect();
    assert_eq!(paths, ["/a", "/c"]);

    for version in &snapshot {
        let read = t.store.read_file(&c3.id, &version.path).unwrap();
        assert_eq!(read, version.content);
    }

    // The winning entry reports the commit that recorded it.
    let a = snapshot.iter().find(|v| v.path == "/a").unwrap();
    assert_eq!(a.commit_id, c2.id);
    assert_eq!(a.commit_message, "c2");
}

#[test]
fn history_is_scoped_to_ancestry() {
    let t = test_store();
    let repo = t.repo("r");
    let c1 = t.commit(&repo.id, None, "c1");
    let c2 = t.commit(&repo.id, Some(&c1.id), "c2");
    let sibling = t.commit(&repo.id, Some(&c1.id), "sibling");

    t.write(&c1.id, "/a", "v1");
    t.write(&c2.id, "/a", "v2");
    t.write(&sibling.id, "/a", "elsewhere");

    let history = t.store.get_file_history(&c2.id, "/a").unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.commit_id != sibling.id));
}
