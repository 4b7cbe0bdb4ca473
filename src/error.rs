use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("path is null or empty")]
    PathNull,

    #[error("path exceeds maximum length")]
    PathTooLong,

    #[error("path contains control characters")]
    PathControlChars,

    #[error("path contains a null byte")]
    PathNullByte,

    #[error("path contains characters not permitted on windows")]
    PathWindowsInvalid,

    #[error("invalid file entry: {0}")]
    InvalidFileEntry(String),

    #[error("commits belong to different repositories")]
    CrossRepository,

    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    #[error("merge requires resolutions for {} path(s): {}", .0.len(), .0.join(", "))]
    MergeRequiresResolutions(Vec<String>),

    #[error("rebase blocked by conflicts on {} path(s): {}", .0.len(), .0.join(", "))]
    RebaseBlocked(Vec<String>),

    #[error("target branch head has moved; rebase or merge required")]
    FastForwardRequired,
}

pub type Result<T> = std::result::Result<T, Error>;
