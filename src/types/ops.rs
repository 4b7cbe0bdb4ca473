use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file as seen through the delta or snapshot projections, joined with the
/// commit that recorded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVersion {
    pub repository_id: String,
    pub repository_name: String,
    /// The commit whose entry is visible, not necessarily the queried commit.
    pub commit_id: String,
    pub path: String,
    pub is_deleted: bool,
    pub is_symlink: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub commit_message: String,
    pub commit_created_at: DateTime<Utc>,
}

/// One recorded version of a path somewhere in a commit's ancestry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRevision {
    pub commit_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub is_deleted: bool,
    pub is_symlink: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Both sides added the path with differing content.
    #[serde(rename = "add/add")]
    AddAdd,
    /// Both sides modified the path, differently. Also covers a path that
    /// diverged between symlink and regular file.
    #[serde(rename = "modify/modify")]
    ModifyModify,
    /// Left deleted while right modified.
    #[serde(rename = "delete/modify")]
    DeleteModify,
    /// Left modified while right deleted.
    #[serde(rename = "modify/delete")]
    ModifyDelete,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictKind::AddAdd => "add/add",
            ConflictKind::ModifyModify => "modify/modify",
            ConflictKind::DeleteModify => "delete/modify",
            ConflictKind::ModifyDelete => "modify/delete",
        };
        write!(f, "{s}")
    }
}

/// A path that cannot be merged without a caller-authored resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_base_commit_id: Option<String>,
    pub path: String,
    pub base_exists: bool,
    pub left_exists: bool,
    pub right_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_content: Option<String>,
    pub base_is_symlink: bool,
    pub left_is_symlink: bool,
    pub right_is_symlink: bool,
    pub kind: ConflictKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeOperation {
    Committed,
    AlreadyUpToDate,
    Merged,
    MergedWithConflictsResolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub operation: FinalizeOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_commit_id: Option<String>,
    pub new_target_head_commit_id: String,
    pub applied_file_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebaseOperation {
    AlreadyUpToDate,
    FastForward,
    Rebased,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebaseOutcome {
    pub operation: RebaseOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebased_commit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_branch_head_commit_id: Option<String>,
    pub applied_file_count: usize,
}
