use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A movable pointer to a commit. Branches never own commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub repository_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_commit_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub repository_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_commit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_from_commit_id: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Commit {
    pub fn is_merge(&self) -> bool {
        self.merged_from_commit_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub commit_id: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub is_deleted: bool,
    pub is_symlink: bool,
    pub created_at: DateTime<Utc>,
}

/// One file-level change to record on a commit.
///
/// Paths (and symlink targets) are normalized by the store on write, so a
/// caller may pass `src/main.rs` and read it back as `/src/main.rs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWrite {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub is_deleted: bool,
    pub is_symlink: bool,
}

impl FileWrite {
    /// A regular file with the given content.
    pub fn file(path: &str, content: &str) -> Self {
        Self {
            path: path.to_string(),
            content: Some(content.to_string()),
            is_deleted: false,
            is_symlink: false,
        }
    }

    /// A deletion marker. Masks every ancestor version of the path.
    pub fn tombstone(path: &str) -> Self {
        Self {
            path: path.to_string(),
            content: None,
            is_deleted: true,
            is_symlink: false,
        }
    }

    /// A symbolic link. The target is stored as a normalized absolute path.
    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            path: path.to_string(),
            content: Some(target.to_string()),
            is_deleted: false,
            is_symlink: true,
        }
    }
}
