//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. All working-copy reads and
//! writes flow through [`GitWorkingCopy`]. Direct parsing of `.git`
//! internal files outside this module is prohibited, and no other module
//! should import `git2`.
//!
//! We use the `git2` crate exclusively (no shelling out to the git CLI).
//!
//! # Responsibilities
//!
//! - Working-copy validation and cloning
//! - Branch checkout
//! - Blob-hash lookup (`HEAD:<path>`)
//! - Staging and committing with the structured audit message
//! - Hard-reset rollback to a checkpoint
//! - Push with the plain/plain/force retry ladder
//! - Directory listing and history queries
//!
//! # Invariants
//!
//! - Multiple paths are staged sequentially (single shared index)
//! - Rollback restores the exact pre-operation state, untracked files
//!   included
//! - All operations return strong types (Oid, RelPath)

mod working_copy;

pub use working_copy::{
    push_ladder, CommitInfo, DirEntry, EntryKind, GitError, GitWorkingCopy, PathStats, PushOutcome,
};
