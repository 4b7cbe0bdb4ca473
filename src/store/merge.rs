//! Three-way conflict detection and the merge/rebase finalization protocol.
//!
//! Content is never text-merged here. Conflicting paths must carry a
//! caller-authored resolution entry on the merge commit before finalization
//! advances the branch head; rebase refuses to proceed at all while conflicts
//! remain.

use std::collections::{BTreeSet, HashMap};

use rusqlite::{Connection, params};

use super::dag;
use super::sqlite::{
    branch_by_id, commit_by_id, file_by_commit_and_path, insert_commit, set_branch_head,
    upsert_file,
};
use crate::error::{Error, Result};
use crate::types::{
    Conflict, ConflictKind, FileWrite, FinalizeOperation, FinalizeOutcome, RebaseOperation,
    RebaseOutcome,
};

/// What a path looks like on one side of a three-way comparison. Absence from
/// the side map means the path does not exist there (never written, or
/// tombstoned).
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileState {
    content: Option<String>,
    is_symlink: bool,
}

fn states_at(conn: &Connection, commit_id: Option<&str>) -> Result<HashMap<String, FileState>> {
    let Some(commit_id) = commit_id else {
        return Ok(HashMap::new());
    };

    let states = dag::effective_files(conn, commit_id)?
        .into_iter()
        .filter(|(_, file)| !file.is_deleted)
        .map(|(path, file)| {
            (
                path,
                FileState {
                    content: file.content,
                    is_symlink: file.is_symlink,
                },
            )
        })
        .collect();

    Ok(states)
}

struct ThreeWay {
    base_commit_id: Option<String>,
    base: HashMap<String, FileState>,
    left: HashMap<String, FileState>,
    right: HashMap<String, FileState>,
    conflicts: Vec<Conflict>,
}

fn state_fields(state: Option<&FileState>) -> (bool, Option<String>, bool) {
    match state {
        Some(s) => (true, s.content.clone(), s.is_symlink),
        None => (false, None, false),
    }
}

/// Compares left and right against their merge base and classifies every path
/// that is not trivially resolvable. A `None` left side reads as an empty
/// tree with no shared history.
fn three_way(conn: &Connection, left: Option<&str>, right: &str) -> Result<ThreeWay> {
    dag::require_commit(conn, right)?;

    let base_commit_id = match left {
        Some(left) => dag::merge_base(conn, left, right)?,
        None => None,
    };

    let base = states_at(conn, base_commit_id.as_deref())?;
    let left = states_at(conn, left)?;
    let right_states = states_at(conn, Some(right))?;

    let paths: BTreeSet<&String> = base
        .keys()
        .chain(left.keys())
        .chain(right_states.keys())
        .collect();

    let mut conflicts = Vec::new();
    for path in paths {
        let in_base = base.get(path);
        let in_left = left.get(path);
        let in_right = right_states.get(path);

        // One-sided or identical changes resolve trivially.
        if in_left == in_base || in_right == in_base || in_left == in_right {
            continue;
        }

        let kind = match (in_base, in_left, in_right) {
            (None, Some(_), Some(_)) => ConflictKind::AddAdd,
            (Some(_), None, Some(_)) => ConflictKind::DeleteModify,
            (Some(_), Some(_), None) => ConflictKind::ModifyDelete,
            (Some(_), Some(_), Some(_)) => ConflictKind::ModifyModify,
            // Remaining shapes imply an unchanged side, filtered above.
            _ => continue,
        };

        let (base_exists, base_content, base_is_symlink) = state_fields(in_base);
        let (left_exists, left_content, left_is_symlink) = state_fields(in_left);
        let (right_exists, right_content, right_is_symlink) = state_fields(in_right);

        conflicts.push(Conflict {
            merge_base_commit_id: base_commit_id.clone(),
            path: path.clone(),
            base_exists,
            left_exists,
            right_exists,
            base_content,
            left_content,
            right_content,
            base_is_symlink,
            left_is_symlink,
            right_is_symlink,
            kind,
        });
    }

    Ok(ThreeWay {
        base_commit_id,
        base,
        left,
        right: right_states,
        conflicts,
    })
}

pub(super) fn conflicts(conn: &Connection, left: &str, right: &str) -> Result<Vec<Conflict>> {
    dag::require_commit(conn, left)?;
    Ok(three_way(conn, Some(left), right)?.conflicts)
}

fn count_commit_files(conn: &Connection, commit_id: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM files WHERE commit_id = ?1",
        params![commit_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Lands a commit on a branch.
///
/// Non-merge commits fast-forward the head and nothing else. Merge commits go
/// through resolution validation and copy the incoming side's one-sided
/// changes onto the merge commit before the head advances.
pub(super) fn finalize(
    conn: &Connection,
    commit_id: &str,
    target_branch_id: &str,
) -> Result<FinalizeOutcome> {
    let commit =
        commit_by_id(conn, commit_id)?.ok_or_else(|| Error::InvalidCommit(commit_id.to_string()))?;
    let branch = branch_by_id(conn, target_branch_id)?.ok_or(Error::NotFound)?;
    if commit.repository_id != branch.repository_id {
        return Err(Error::CrossRepository);
    }

    let Some(source) = commit.merged_from_commit_id.clone() else {
        // Plain commit: only valid directly on top of the current head.
        if branch.head_commit_id != commit.parent_commit_id {
            return Err(Error::FastForwardRequired);
        }

        let applied = count_commit_files(conn, commit_id)?;
        set_branch_head(conn, target_branch_id, Some(commit_id))?;
        tracing::debug!(branch = %branch.name, commit = %commit_id, "committed");

        return Ok(FinalizeOutcome {
            operation: FinalizeOperation::Committed,
            merge_commit_id: None,
            new_target_head_commit_id: commit_id.to_string(),
            applied_file_count: applied,
        });
    };

    // Incoming side already reachable from the target head: the merge commit
    // still lands, recording the intent, but nothing is applied.
    if let Some(head) = branch.head_commit_id.as_deref() {
        if dag::is_ancestor(conn, &source, head)? {
            set_branch_head(conn, target_branch_id, Some(commit_id))?;
            return Ok(FinalizeOutcome {
                operation: FinalizeOperation::AlreadyUpToDate,
                merge_commit_id: Some(commit_id.to_string()),
                new_target_head_commit_id: commit_id.to_string(),
                applied_file_count: 0,
            });
        }
    }

    let tw = three_way(conn, commit.parent_commit_id.as_deref(), &source)?;

    // Every conflicting path needs a caller-authored entry on the merge
    // commit before the head may advance.
    let mut unresolved = Vec::new();
    for conflict in &tw.conflicts {
        if file_by_commit_and_path(conn, commit_id, &conflict.path)?.is_none() {
            unresolved.push(conflict.path.clone());
        }
    }
    if !unresolved.is_empty() {
        tracing::warn!(
            branch = %branch.name,
            commit = %commit_id,
            unresolved = unresolved.len(),
            "merge finalization missing resolutions"
        );
        return Err(Error::MergeRequiresResolutions(unresolved));
    }

    // Copy one-sided incoming changes the target never touched, unless the
    // merge commit already overrides the path. Incoming deletions copy as
    // tombstones.
    let mut applied = 0;
    let paths: BTreeSet<&String> = tw.base.keys().chain(tw.right.keys()).collect();
    for path in paths {
        let in_base = tw.base.get(path);
        let incoming = tw.right.get(path);
        let target = tw.left.get(path);

        if incoming == in_base || target != in_base {
            continue;
        }
        if file_by_commit_and_path(conn, commit_id, path)?.is_some() {
            continue;
        }

        let write = match incoming {
            Some(state) => FileWrite {
                path: path.clone(),
                content: state.content.clone(),
                is_deleted: false,
                is_symlink: state.is_symlink,
            },
            None => FileWrite::tombstone(path),
        };
        upsert_file(conn, commit_id, &write)?;
        applied += 1;
    }

    set_branch_head(conn, target_branch_id, Some(commit_id))?;

    let operation = if tw.conflicts.is_empty() {
        FinalizeOperation::Merged
    } else {
        FinalizeOperation::MergedWithConflictsResolved
    };
    tracing::debug!(
        branch = %branch.name,
        commit = %commit_id,
        base = ?tw.base_commit_id,
        applied,
        "merge finalized"
    );

    Ok(FinalizeOutcome {
        operation,
        merge_commit_id: Some(commit_id.to_string()),
        new_target_head_commit_id: commit_id.to_string(),
        applied_file_count: applied,
    })
}

/// Reparents a branch onto another branch's tip as one squashed commit.
pub(super) fn rebase(
    conn: &Connection,
    branch_id: &str,
    onto_branch_id: &str,
    message: &str,
) -> Result<RebaseOutcome> {
    let branch = branch_by_id(conn, branch_id)?.ok_or(Error::NotFound)?;
    let onto = branch_by_id(conn, onto_branch_id)?.ok_or(Error::NotFound)?;
    if branch.repository_id != onto.repository_id {
        return Err(Error::CrossRepository);
    }

    let Some(onto_head) = onto.head_commit_id.clone() else {
        // Nothing to move onto.
        return Ok(RebaseOutcome {
            operation: RebaseOperation::AlreadyUpToDate,
            rebased_commit_id: None,
            new_branch_head_commit_id: branch.head_commit_id,
            applied_file_count: 0,
        });
    };

    let Some(branch_head) = branch.head_commit_id.clone() else {
        set_branch_head(conn, branch_id, Some(&onto_head))?;
        return Ok(RebaseOutcome {
            operation: RebaseOperation::FastForward,
            rebased_commit_id: None,
            new_branch_head_commit_id: Some(onto_head),
            applied_file_count: 0,
        });
    };

    if branch_head == onto_head || dag::is_ancestor(conn, &onto_head, &branch_head)? {
        return Ok(RebaseOutcome {
            operation: RebaseOperation::AlreadyUpToDate,
            rebased_commit_id: None,
            new_branch_head_commit_id: Some(branch_head),
            applied_file_count: 0,
        });
    }

    if dag::is_ancestor(conn, &branch_head, &onto_head)? {
        set_branch_head(conn, branch_id, Some(&onto_head))?;
        tracing::debug!(branch = %branch.name, onto = %onto.name, "fast-forwarded");
        return Ok(RebaseOutcome {
            operation: RebaseOperation::FastForward,
            rebased_commit_id: None,
            new_branch_head_commit_id: Some(onto_head),
            applied_file_count: 0,
        });
    }

    // Diverged: squash the branch's effective changes since the merge base
    // into a single commit on top of the new tip.
    let tw = three_way(conn, Some(&onto_head), &branch_head)?;
    if !tw.conflicts.is_empty() {
        tracing::warn!(
            branch = %branch.name,
            onto = %onto.name,
            conflicts = tw.conflicts.len(),
            "rebase blocked by conflicts"
        );
        let paths = tw.conflicts.iter().map(|c| c.path.clone()).collect();
        return Err(Error::RebaseBlocked(paths));
    }

    let new_commit = insert_commit(conn, &branch.repository_id, Some(&onto_head), None, message)?;

    let mut applied = 0;
    let paths: BTreeSet<&String> = tw.base.keys().chain(tw.right.keys()).collect();
    for path in paths {
        let in_base = tw.base.get(path);
        let ours = tw.right.get(path);
        if ours == in_base {
            continue;
        }

        let write = match ours {
            Some(state) => FileWrite {
                path: path.clone(),
                content: state.content.clone(),
                is_deleted: false,
                is_symlink: state.is_symlink,
            },
            None => FileWrite::tombstone(path),
        };
        upsert_file(conn, &new_commit.id, &write)?;
        applied += 1;
    }

    set_branch_head(conn, branch_id, Some(&new_commit.id))?;
    tracing::debug!(
        branch = %branch.name,
        onto = %onto.name,
        commit = %new_commit.id,
        applied,
        "rebased"
    );

    Ok(RebaseOutcome {
        operation: RebaseOperation::Rebased,
        rebased_commit_id: Some(new_commit.id.clone()),
        new_branch_head_commit_id: Some(new_commit.id),
        applied_file_count: applied,
    })
}
