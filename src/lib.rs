//! # Strata
//!
//! An embedded, versioned virtual filesystem: commits form a DAG of file
//! overlays, branches are movable pointers into it, and merges and rebases
//! are validated against a three-way diff before a branch head moves.
//!
//! File content is opaque: no byte-level diffing, no transparent symlink
//! resolution, no automatic content merge. Conflicting paths are surfaced to
//! the caller, which writes the resolved version into the merge commit before
//! finalization.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strata::store::{SqliteStore, Store};
//! use strata::types::FileWrite;
//!
//! let store = SqliteStore::new("./data/strata.db").unwrap();
//! store.initialize().unwrap();
//!
//! let repo = store.create_repository("project").unwrap();
//! let commit = store.create_commit(&repo.id, None, None, "init").unwrap();
//! store.put_file(&commit.id, &FileWrite::file("/readme.md", "hello")).unwrap();
//!
//! assert_eq!(
//!     store.read_file(&commit.id, "/readme.md").unwrap().as_deref(),
//!     Some("hello"),
//! );
//! ```

pub mod error;
pub mod store;
pub mod types;
