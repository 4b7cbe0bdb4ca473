pub const SCHEMA: &str = r#"
-- Repositories own branches and commits
CREATE TABLE IF NOT EXISTS repositories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,

    -- Wired to the auto-created 'main' branch on insert
    default_branch_id TEXT REFERENCES branches(id) ON DELETE SET NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Branches are movable pointers into the commit DAG; they never own commits
CREATE TABLE IF NOT EXISTS branches (
    id TEXT PRIMARY KEY,
    repository_id TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    head_commit_id TEXT REFERENCES commits(id) ON DELETE SET NULL,  -- NULL = no commits yet
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(repository_id, name)
);

-- Commits form an append-only DAG rooted at NULL-parent commits.
-- merged_from_commit_id marks merge commits; both edges stay in one repository.
CREATE TABLE IF NOT EXISTS commits (
    id TEXT PRIMARY KEY,
    repository_id TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    parent_commit_id TEXT REFERENCES commits(id) ON DELETE CASCADE,
    merged_from_commit_id TEXT REFERENCES commits(id) ON DELETE CASCADE,
    message TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- File entries overlay ancestor state; a tombstone (is_deleted) masks it.
-- Symlink entries store the normalized absolute target path in content.
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    commit_id TEXT NOT NULL REFERENCES commits(id) ON DELETE CASCADE,
    path TEXT NOT NULL,
    content TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    is_symlink INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(commit_id, path)
);

CREATE INDEX IF NOT EXISTS idx_branches_repository ON branches(repository_id);
CREATE INDEX IF NOT EXISTS idx_commits_repository ON commits(repository_id);
CREATE INDEX IF NOT EXISTS idx_commits_parent ON commits(parent_commit_id);
CREATE INDEX IF NOT EXISTS idx_files_path ON files(path);
"#;
