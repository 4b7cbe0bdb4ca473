use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use uuid::Uuid;

use super::Store;
use super::dag;
use super::merge;
use super::path::normalize_path;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection so consuming
    /// applications can execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

pub(super) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(super) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

pub(super) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn repository_from_row(row: &Row) -> rusqlite::Result<Repository> {
    Ok(Repository {
        id: row.get(0)?,
        name: row.get(1)?,
        default_branch_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn branch_from_row(row: &Row) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        name: row.get(2)?,
        head_commit_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn commit_from_row(row: &Row) -> rusqlite::Result<Commit> {
    Ok(Commit {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        parent_commit_id: row.get(2)?,
        merged_from_commit_id: row.get(3)?,
        message: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn file_entry_from_row(row: &Row) -> rusqlite::Result<FileEntry> {
    Ok(FileEntry {
        id: row.get(0)?,
        commit_id: row.get(1)?,
        path: row.get(2)?,
        content: row.get(3)?,
        is_deleted: row.get(4)?,
        is_symlink: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

pub(super) fn repository_by_id(conn: &Connection, id: &str) -> Result<Option<Repository>> {
    conn.query_row(
        "SELECT id, name, default_branch_id, created_at FROM repositories WHERE id = ?1",
        params![id],
        repository_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn branch_by_id(conn: &Connection, id: &str) -> Result<Option<Branch>> {
    conn.query_row(
        "SELECT id, repository_id, name, head_commit_id, created_at FROM branches WHERE id = ?1",
        params![id],
        branch_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn commit_by_id(conn: &Connection, id: &str) -> Result<Option<Commit>> {
    conn.query_row(
        "SELECT id, repository_id, parent_commit_id, merged_from_commit_id, message, created_at
         FROM commits WHERE id = ?1",
        params![id],
        commit_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn file_by_commit_and_path(
    conn: &Connection,
    commit_id: &str,
    path: &str,
) -> Result<Option<FileEntry>> {
    conn.query_row(
        "SELECT id, commit_id, path, content, is_deleted, is_symlink, created_at
         FROM files WHERE commit_id = ?1 AND path = ?2",
        params![commit_id, path],
        file_entry_from_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Resolves the parent commit of a new non-root commit, enforcing that it
/// exists and lives in the given repository.
fn require_same_repo_commit(conn: &Connection, repository_id: &str, id: &str) -> Result<Commit> {
    let commit = commit_by_id(conn, id)?.ok_or_else(|| Error::InvalidCommit(id.to_string()))?;
    if commit.repository_id != repository_id {
        return Err(Error::CrossRepository);
    }
    Ok(commit)
}

pub(super) fn insert_commit(
    conn: &Connection,
    repository_id: &str,
    parent_commit_id: Option<&str>,
    merged_from_commit_id: Option<&str>,
    message: &str,
) -> Result<Commit> {
    if repository_by_id(conn, repository_id)?.is_none() {
        return Err(Error::NotFound);
    }

    if let Some(parent) = parent_commit_id {
        require_same_repo_commit(conn, repository_id, parent)?;
    }
    if let Some(source) = merged_from_commit_id {
        require_same_repo_commit(conn, repository_id, source)?;
    }

    let commit = Commit {
        id: new_id(),
        repository_id: repository_id.to_string(),
        parent_commit_id: parent_commit_id.map(String::from),
        merged_from_commit_id: merged_from_commit_id.map(String::from),
        message: message.to_string(),
        created_at: Utc::now(),
    };

    conn.execute(
        "INSERT INTO commits (id, repository_id, parent_commit_id, merged_from_commit_id, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            commit.id,
            commit.repository_id,
            commit.parent_commit_id,
            commit.merged_from_commit_id,
            commit.message,
            format_datetime(&commit.created_at),
        ],
    )?;

    Ok(commit)
}

/// Insert-or-update on `(commit_id, path)`, applying path normalization and
/// the tombstone/symlink invariants before the row lands.
pub(super) fn upsert_file(
    conn: &Connection,
    commit_id: &str,
    write: &FileWrite,
) -> Result<FileEntry> {
    if commit_by_id(conn, commit_id)?.is_none() {
        return Err(Error::InvalidCommit(commit_id.to_string()));
    }

    if write.is_deleted && write.content.is_some() {
        return Err(Error::InvalidFileEntry(
            "tombstone cannot carry content".to_string(),
        ));
    }
    if write.is_deleted && write.is_symlink {
        return Err(Error::InvalidFileEntry(
            "tombstone cannot be a symlink".to_string(),
        ));
    }

    let path = normalize_path(&write.path)?;
    let content = if write.is_symlink {
        let target = write.content.as_deref().ok_or(Error::PathNull)?;
        Some(normalize_path(target)?)
    } else {
        write.content.clone()
    };

    conn.execute(
        "INSERT INTO files (id, commit_id, path, content, is_deleted, is_symlink, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(commit_id, path) DO UPDATE SET
             content = excluded.content,
             is_deleted = excluded.is_deleted,
             is_symlink = excluded.is_symlink",
        params![
            new_id(),
            commit_id,
            path,
            content,
            write.is_deleted,
            write.is_symlink,
            format_datetime(&Utc::now()),
        ],
    )?;

    file_by_commit_and_path(conn, commit_id, &path)?.ok_or(Error::NotFound)
}

pub(super) fn set_branch_head(
    conn: &Connection,
    branch_id: &str,
    head_commit_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE branches SET head_commit_id = ?2 WHERE id = ?1",
        params![branch_id, head_commit_id],
    )?;
    Ok(())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Repository operations

    fn create_repository(&self, name: &str) -> Result<Repository> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let now = Utc::now();
        let repo_id = new_id();
        let branch_id = new_id();

        tx.execute(
            "INSERT INTO repositories (id, name, default_branch_id, created_at)
             VALUES (?1, ?2, NULL, ?3)",
            params![repo_id, name, format_datetime(&now)],
        )?;

        tx.execute(
            "INSERT INTO branches (id, repository_id, name, head_commit_id, created_at)
             VALUES (?1, ?2, 'main', NULL, ?3)",
            params![branch_id, repo_id, format_datetime(&now)],
        )?;

        tx.execute(
            "UPDATE repositories SET default_branch_id = ?2 WHERE id = ?1",
            params![repo_id, branch_id],
        )?;

        tx.commit()?;
        tracing::debug!(repository = %name, "created repository with default branch 'main'");

        Ok(Repository {
            id: repo_id,
            name: name.to_string(),
            default_branch_id: Some(branch_id),
            created_at: now,
        })
    }

    fn get_repository(&self, id: &str) -> Result<Option<Repository>> {
        repository_by_id(&self.conn(), id)
    }

    fn get_repository_by_name(&self, name: &str) -> Result<Option<Repository>> {
        self.conn()
            .query_row(
                "SELECT id, name, default_branch_id, created_at FROM repositories WHERE name = ?1",
                params![name],
                repository_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_repositories(&self, cursor: &str, limit: i32) -> Result<Vec<Repository>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, default_branch_id, created_at
             FROM repositories WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], repository_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_repository(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM repositories WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Branch operations

    fn create_branch(
        &self,
        repository_id: &str,
        name: &str,
        head_commit_id: Option<&str>,
    ) -> Result<Branch> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let repo = repository_by_id(&tx, repository_id)?.ok_or(Error::NotFound)?;

        // A null head defaults to the current default-branch head; creating a
        // branch never creates a commit.
        let head = match head_commit_id {
            Some(id) => {
                require_same_repo_commit(&tx, repository_id, id)?;
                Some(id.to_string())
            }
            None => match repo.default_branch_id.as_deref() {
                Some(default_id) => {
                    branch_by_id(&tx, default_id)?.and_then(|b| b.head_commit_id)
                }
                None => None,
            },
        };

        let branch = Branch {
            id: new_id(),
            repository_id: repository_id.to_string(),
            name: name.to_string(),
            head_commit_id: head,
            created_at: Utc::now(),
        };

        tx.execute(
            "INSERT INTO branches (id, repository_id, name, head_commit_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                branch.id,
                branch.repository_id,
                branch.name,
                branch.head_commit_id,
                format_datetime(&branch.created_at),
            ],
        )?;

        tx.commit()?;
        Ok(branch)
    }

    fn get_branch(&self, id: &str) -> Result<Option<Branch>> {
        branch_by_id(&self.conn(), id)
    }

    fn get_branch_by_name(&self, repository_id: &str, name: &str) -> Result<Option<Branch>> {
        self.conn()
            .query_row(
                "SELECT id, repository_id, name, head_commit_id, created_at
                 FROM branches WHERE repository_id = ?1 AND name = ?2",
                params![repository_id, name],
                branch_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_branches(&self, repository_id: &str) -> Result<Vec<Branch>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, repository_id, name, head_commit_id, created_at
             FROM branches WHERE repository_id = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![repository_id], branch_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_branch_head(&self, branch_id: &str, head_commit_id: Option<&str>) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let branch = branch_by_id(&tx, branch_id)?.ok_or(Error::NotFound)?;
        if let Some(id) = head_commit_id {
            require_same_repo_commit(&tx, &branch.repository_id, id)?;
        }

        set_branch_head(&tx, branch_id, head_commit_id)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_branch(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM branches WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Commit operations

    fn create_commit(
        &self,
        repository_id: &str,
        parent_commit_id: Option<&str>,
        merged_from_commit_id: Option<&str>,
        message: &str,
    ) -> Result<Commit> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let commit = insert_commit(
            &tx,
            repository_id,
            parent_commit_id,
            merged_from_commit_id,
            message,
        )?;
        tx.commit()?;
        Ok(commit)
    }

    fn get_commit(&self, id: &str) -> Result<Option<Commit>> {
        commit_by_id(&self.conn(), id)
    }

    fn list_commits(&self, repository_id: &str, cursor: &str, limit: i32) -> Result<Vec<Commit>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, repository_id, parent_commit_id, merged_from_commit_id, message, created_at
             FROM commits WHERE repository_id = ?1 AND id > ?2 ORDER BY id LIMIT ?3",
        )?;

        let rows = stmt.query_map(params![repository_id, cursor, limit], commit_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // File entry operations

    fn put_file(&self, commit_id: &str, write: &FileWrite) -> Result<FileEntry> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let entry = upsert_file(&tx, commit_id, write)?;
        tx.commit()?;
        Ok(entry)
    }

    fn get_file_entry(&self, commit_id: &str, path: &str) -> Result<Option<FileEntry>> {
        let path = normalize_path(path)?;
        file_by_commit_and_path(&self.conn(), commit_id, &path)
    }

    fn list_commit_files(&self, commit_id: &str) -> Result<Vec<FileEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, commit_id, path, content, is_deleted, is_symlink, created_at
             FROM files WHERE commit_id = ?1 ORDER BY path",
        )?;

        let rows = stmt.query_map(params![commit_id], file_entry_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_file_entry(&self, commit_id: &str, path: &str) -> Result<bool> {
        let path = normalize_path(path)?;
        let rows = self.conn().execute(
            "DELETE FROM files WHERE commit_id = ?1 AND path = ?2",
            params![commit_id, path],
        )?;
        Ok(rows > 0)
    }

    // Snapshot and history projections

    fn get_commit_delta(&self, commit_id: &str) -> Result<Vec<FileVersion>> {
        dag::delta_rows(&self.conn(), commit_id)
    }

    fn get_commit_snapshot(&self, commit_id: &str) -> Result<Vec<FileVersion>> {
        dag::snapshot_rows(&self.conn(), commit_id)
    }

    fn read_file(&self, commit_id: &str, path: &str) -> Result<Option<String>> {
        dag::read_file(&self.conn(), commit_id, path)
    }

    fn get_file_history(&self, commit_id: &str, path: &str) -> Result<Vec<FileRevision>> {
        dag::file_history(&self.conn(), commit_id, path)
    }

    // Merge and rebase

    fn get_merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        dag::merge_base(&self.conn(), a, b)
    }

    fn get_conflicts(&self, left: &str, right: &str) -> Result<Vec<Conflict>> {
        merge::conflicts(&self.conn(), left, right)
    }

    fn finalize_commit(&self, commit_id: &str, target_branch_id: &str) -> Result<FinalizeOutcome> {
        let mut conn = self.conn();
        // IMMEDIATE so validation and head advancement observe one snapshot.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = merge::finalize(&tx, commit_id, target_branch_id)?;
        tx.commit()?;
        Ok(outcome)
    }

    fn rebase_branch(
        &self,
        branch_id: &str,
        onto_branch_id: &str,
        message: &str,
    ) -> Result<RebaseOutcome> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = merge::rebase(&tx, branch_id, onto_branch_id, message)?;
        tx.commit()?;
        Ok(outcome)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
