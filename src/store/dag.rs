//! Commit-DAG traversal: ancestry walks, snapshot resolution, reads, history,
//! and merge-base search.
//!
//! Snapshot resolution walks `parent_commit_id` only; content recorded on the
//! merged-from side becomes visible once the finalizer copies it into a merge
//! commit. Ancestor sets for merge-base and conflict detection walk both
//! edges. Every walk carries a visited set to bound traversal on corrupt data.

use std::collections::{HashMap, HashSet, VecDeque};

use rusqlite::{Connection, params};

use super::path::normalize_path;
use super::sqlite::{commit_by_id, file_by_commit_and_path, repository_by_id};
use crate::error::{Error, Result};
use crate::types::{Commit, FileRevision, FileVersion};

pub(super) fn require_commit(conn: &Connection, id: &str) -> Result<Commit> {
    commit_by_id(conn, id)?.ok_or_else(|| Error::InvalidCommit(id.to_string()))
}

/// The parent-only ancestry chain, nearest commit first, starting at `start`.
fn walk_parent_chain(conn: &Connection, start: &str) -> Result<Vec<Commit>> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut cursor = Some(require_commit(conn, start)?);

    while let Some(commit) = cursor {
        if !visited.insert(commit.id.clone()) {
            break;
        }
        cursor = match commit.parent_commit_id.as_deref() {
            Some(parent) => Some(require_commit(conn, parent)?),
            None => None,
        };
        chain.push(commit);
    }

    Ok(chain)
}

/// The nearest recorded entry per path across the chain, tombstones included.
#[derive(Debug, Clone)]
pub(super) struct EffectiveFile {
    pub commit_id: String,
    pub content: Option<String>,
    pub is_deleted: bool,
    pub is_symlink: bool,
}

fn effective_from_chain(
    conn: &Connection,
    chain: &[Commit],
) -> Result<HashMap<String, EffectiveFile>> {
    let mut files: HashMap<String, EffectiveFile> = HashMap::new();

    let mut stmt = conn.prepare(
        "SELECT path, content, is_deleted, is_symlink FROM files WHERE commit_id = ?1",
    )?;

    for commit in chain {
        let rows = stmt.query_map(params![commit.id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                EffectiveFile {
                    commit_id: commit.id.clone(),
                    content: row.get(1)?,
                    is_deleted: row.get(2)?,
                    is_symlink: row.get(3)?,
                },
            ))
        })?;

        for row in rows {
            let (path, file) = row?;
            // Nearest ancestor wins; later chain entries never override.
            files.entry(path).or_insert(file);
        }
    }

    Ok(files)
}

pub(super) fn effective_files(
    conn: &Connection,
    commit_id: &str,
) -> Result<HashMap<String, EffectiveFile>> {
    let chain = walk_parent_chain(conn, commit_id)?;
    effective_from_chain(conn, &chain)
}

/// Exactly the entries recorded at one commit, joined with repository and
/// commit metadata. No ancestry.
pub(super) fn delta_rows(conn: &Connection, commit_id: &str) -> Result<Vec<FileVersion>> {
    require_commit(conn, commit_id)?;

    let mut stmt = conn.prepare(
        "SELECT r.id, r.name, c.id, f.path, f.is_deleted, f.is_symlink, f.content,
                c.message, c.created_at
         FROM files f
         JOIN commits c ON f.commit_id = c.id
         JOIN repositories r ON c.repository_id = r.id
         WHERE f.commit_id = ?1
         ORDER BY f.path",
    )?;

    let rows = stmt.query_map(params![commit_id], |row| {
        Ok(FileVersion {
            repository_id: row.get(0)?,
            repository_name: row.get(1)?,
            commit_id: row.get(2)?,
            path: row.get(3)?,
            is_deleted: row.get(4)?,
            is_symlink: row.get(5)?,
            content: row.get(6)?,
            commit_message: row.get(7)?,
            commit_created_at: super::sqlite::parse_datetime(&row.get::<_, String>(8)?),
        })
    })?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// The effective file set visible at a commit: nearest entry per path wins,
/// winning tombstones are excluded.
pub(super) fn snapshot_rows(conn: &Connection, commit_id: &str) -> Result<Vec<FileVersion>> {
    let chain = walk_parent_chain(conn, commit_id)?;
    let repo = repository_by_id(conn, &chain[0].repository_id)?.ok_or(Error::NotFound)?;
    let files = effective_from_chain(conn, &chain)?;

    let meta: HashMap<&str, &Commit> = chain.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut versions: Vec<FileVersion> = files
        .into_iter()
        .filter(|(_, file)| !file.is_deleted)
        .map(|(path, file)| {
            let commit = meta[file.commit_id.as_str()];
            FileVersion {
                repository_id: repo.id.clone(),
                repository_name: repo.name.clone(),
                commit_id: file.commit_id,
                path,
                is_deleted: false,
                is_symlink: file.is_symlink,
                content: file.content,
                commit_message: commit.message.clone(),
                commit_created_at: commit.created_at,
            }
        })
        .collect();

    versions.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(versions)
}

/// Nearest-ancestor read of one path. Tombstones read as `None`; symlinks
/// read as their stored target, with no transparent resolution.
pub(super) fn read_file(conn: &Connection, commit_id: &str, path: &str) -> Result<Option<String>> {
    let path = normalize_path(path)?;
    let mut visited = HashSet::new();
    let mut cursor = Some(require_commit(conn, commit_id)?);

    while let Some(commit) = cursor {
        if !visited.insert(commit.id.clone()) {
            break;
        }
        if let Some(entry) = file_by_commit_and_path(conn, &commit.id, &path)? {
            if entry.is_deleted {
                return Ok(None);
            }
            return Ok(entry.content);
        }
        cursor = match commit.parent_commit_id.as_deref() {
            Some(parent) => Some(require_commit(conn, parent)?),
            None => None,
        };
    }

    Ok(None)
}

/// Every recorded version of a path across the parent ancestry, nearest
/// first. Tombstones and symlink entries appear verbatim.
pub(super) fn file_history(
    conn: &Connection,
    commit_id: &str,
    path: &str,
) -> Result<Vec<FileRevision>> {
    let path = normalize_path(path)?;
    let chain = walk_parent_chain(conn, commit_id)?;

    let mut revisions = Vec::new();
    for commit in &chain {
        if let Some(entry) = file_by_commit_and_path(conn, &commit.id, &path)? {
            revisions.push(FileRevision {
                commit_id: entry.commit_id,
                content: entry.content,
                is_deleted: entry.is_deleted,
                is_symlink: entry.is_symlink,
                created_at: entry.created_at,
            });
        }
    }

    Ok(revisions)
}

/// Minimum edge distance from `start` to each of its ancestors, walking both
/// parent and merged-from edges. The set includes `start` itself at 0.
pub(super) fn ancestor_distances(conn: &Connection, start: &str) -> Result<HashMap<String, u32>> {
    let mut distances = HashMap::new();
    let mut queue = VecDeque::new();

    distances.insert(start.to_string(), 0u32);
    queue.push_back(start.to_string());

    while let Some(id) = queue.pop_front() {
        let distance = distances[&id];
        let commit = require_commit(conn, &id)?;
        for edge in [commit.parent_commit_id, commit.merged_from_commit_id]
            .into_iter()
            .flatten()
        {
            if !distances.contains_key(&edge) {
                distances.insert(edge.clone(), distance + 1);
                queue.push_back(edge);
            }
        }
    }

    Ok(distances)
}

pub(super) fn is_ancestor(conn: &Connection, ancestor: &str, descendant: &str) -> Result<bool> {
    Ok(ancestor_distances(conn, descendant)?.contains_key(ancestor))
}

/// Lowest common ancestor of two commits in one repository.
///
/// Picks the common ancestor minimizing distance-from-a plus distance-from-b;
/// ties break on the lower distance from `a`, then on the smaller commit id,
/// so the result is stable across runs. `None` when the histories are
/// disjoint.
pub(super) fn merge_base(conn: &Connection, a: &str, b: &str) -> Result<Option<String>> {
    let commit_a = require_commit(conn, a)?;
    let commit_b = require_commit(conn, b)?;
    if commit_a.repository_id != commit_b.repository_id {
        return Err(Error::CrossRepository);
    }

    let from_a = ancestor_distances(conn, a)?;
    let from_b = ancestor_distances(conn, b)?;

    let mut best: Option<(u32, u32, String)> = None;
    for (id, &dist_a) in &from_a {
        let Some(&dist_b) = from_b.get(id) else {
            continue;
        };
        let candidate = (dist_a + dist_b, dist_a, id.clone());
        match &best {
            Some(current) if *current <= candidate => {}
            _ => best = Some(candidate),
        }
    }

    Ok(best.map(|(_, _, id)| id))
}
