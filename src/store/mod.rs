mod dag;
mod merge;
pub mod path;
mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Every method runs as a single transaction against the substrate; a failed
/// call leaves no partial state behind.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Repository operations
    fn create_repository(&self, name: &str) -> Result<Repository>;
    fn get_repository(&self, id: &str) -> Result<Option<Repository>>;
    fn get_repository_by_name(&self, name: &str) -> Result<Option<Repository>>;
    fn list_repositories(&self, cursor: &str, limit: i32) -> Result<Vec<Repository>>;
    fn delete_repository(&self, id: &str) -> Result<bool>;

    // Branch operations
    fn create_branch(
        &self,
        repository_id: &str,
        name: &str,
        head_commit_id: Option<&str>,
    ) -> Result<Branch>;
    fn get_branch(&self, id: &str) -> Result<Option<Branch>>;
    fn get_branch_by_name(&self, repository_id: &str, name: &str) -> Result<Option<Branch>>;
    fn list_branches(&self, repository_id: &str) -> Result<Vec<Branch>>;
    fn update_branch_head(&self, branch_id: &str, head_commit_id: Option<&str>) -> Result<()>;
    fn delete_branch(&self, id: &str) -> Result<bool>;

    // Commit operations
    fn create_commit(
        &self,
        repository_id: &str,
        parent_commit_id: Option<&str>,
        merged_from_commit_id: Option<&str>,
        message: &str,
    ) -> Result<Commit>;
    fn get_commit(&self, id: &str) -> Result<Option<Commit>>;
    fn list_commits(&self, repository_id: &str, cursor: &str, limit: i32) -> Result<Vec<Commit>>;

    // File entry operations
    fn put_file(&self, commit_id: &str, write: &FileWrite) -> Result<FileEntry>;
    fn get_file_entry(&self, commit_id: &str, path: &str) -> Result<Option<FileEntry>>;
    fn list_commit_files(&self, commit_id: &str) -> Result<Vec<FileEntry>>;
    fn delete_file_entry(&self, commit_id: &str, path: &str) -> Result<bool>;

    // Snapshot and history projections
    fn get_commit_delta(&self, commit_id: &str) -> Result<Vec<FileVersion>>;
    fn get_commit_snapshot(&self, commit_id: &str) -> Result<Vec<FileVersion>>;
    fn read_file(&self, commit_id: &str, path: &str) -> Result<Option<String>>;
    fn get_file_history(&self, commit_id: &str, path: &str) -> Result<Vec<FileRevision>>;

    // Merge and rebase
    fn get_merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;
    fn get_conflicts(&self, left: &str, right: &str) -> Result<Vec<Conflict>>;
    fn finalize_commit(&self, commit_id: &str, target_branch_id: &str) -> Result<FinalizeOutcome>;
    fn rebase_branch(
        &self,
        branch_id: &str,
        onto_branch_id: &str,
        message: &str,
    ) -> Result<RebaseOutcome>;

    fn close(&self) -> Result<()>;
}
