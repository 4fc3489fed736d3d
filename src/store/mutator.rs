//! store::mutator
//!
//! One operation per mutation kind, built on [`GitWorkingCopy`].
//!
//! Every mutation follows the same four-phase shape:
//!
//! 1. **Preflight** - existence and optimistic-concurrency checks, with
//!    zero side effects on failure
//! 2. **Mutate** - the filesystem write
//! 3. **Commit** - staging plus a commit carrying the audit record
//! 4. Push - performed by the caller (the coordinator), not here
//!
//! A checkpoint (the branch's latest commit SHA) is captured before any
//! write. If a later step fails, the working copy is hard-reset to the
//! checkpoint and cleaned, so a dangling uncommitted write can never
//! survive an operation. Commits and filesystem writes are never retried;
//! their failure always routes to rollback.

use std::fmt::Display;
use std::fs;

use tracing::{error, warn};

use crate::core::types::{Oid, RelPath};
use crate::git::{DirEntry, GitError, GitWorkingCopy};
use crate::store::error::StoreError;

/// Content and concurrency token of a tracked file.
#[derive(Debug, Clone)]
pub struct FileContent {
    /// Raw file bytes.
    pub content: Vec<u8>,
    /// Blob hash at HEAD; `None` for a file present on disk but never
    /// committed.
    pub blob_hash: Option<Oid>,
}

/// One item of a batched delete.
#[derive(Debug, Clone)]
pub struct DeleteItem {
    /// The path to remove.
    pub path: RelPath,
    /// Expected blob hash. Required for files; ignored for directories,
    /// which have no stable blob hash.
    pub expected_hash: Option<Oid>,
    /// Whether the path is a directory (removed recursively).
    pub is_directory: bool,
}

/// Result of a successful mutation against one working copy.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// The commit created by the mutation.
    pub commit: Oid,
    /// The new blob hash of the written file, for operations that leave
    /// exactly one file behind.
    pub blob_hash: Option<Oid>,
}

/// Content mutations against one working copy.
///
/// The mutator operates on whichever branch the working copy has checked
/// out; branch fan-out across `staging` and `staging-lite` belongs to the
/// coordinator.
#[derive(Debug)]
pub struct ContentMutator {
    wc: GitWorkingCopy,
}

impl ContentMutator {
    /// Wrap a working copy.
    pub fn new(wc: GitWorkingCopy) -> Self {
        Self { wc }
    }

    /// The underlying working copy.
    pub fn working_copy(&self) -> &GitWorkingCopy {
        &self.wc
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read a file's content and its current blob hash.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the path is absent or a directory
    pub fn read(&self, path: &RelPath) -> Result<FileContent, StoreError> {
        let stats = self.wc.path_stats(path)?;
        if stats.is_dir {
            return Err(StoreError::NotFound {
                path: path.to_string(),
            });
        }

        let content = self.wc.read_file(path)?;
        let blob_hash = match self.wc.blob_hash(path) {
            Ok(oid) => Some(oid),
            Err(GitError::PathNotInHead { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        Ok(FileContent { content, blob_hash })
    }

    /// List a directory, excluding the `.git` control directory.
    pub fn list(&self, path: Option<&RelPath>) -> Result<Vec<DirEntry>, StoreError> {
        Ok(self.wc.list_directory(path)?)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a new file.
    ///
    /// The parent directory is auto-created if missing; that step is
    /// fallible but needs no rollback since nothing was committed yet. An
    /// already-existing target fails with [`StoreError::Conflict`] and
    /// performs no write.
    pub fn create(
        &self,
        target: &RelPath,
        content: &[u8],
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        let checkpoint = self.checkpoint()?;
        let abs = target.resolve_in(self.wc.root());

        if let Some(parent) = target.parent() {
            let parent_abs = parent.resolve_in(self.wc.root());
            fs::create_dir_all(&parent_abs).map_err(|e| StoreError::Storage {
                message: format!("cannot create {parent}: {e}"),
            })?;
        }

        if abs.exists() {
            return Err(StoreError::Conflict {
                message: format!("{target} already exists"),
            });
        }

        if let Err(e) = fs::write(&abs, content) {
            return Err(self.rollback_after(&checkpoint, format!("write {target}: {e}")));
        }

        let commit = self.commit_or_rollback(
            &checkpoint,
            std::slice::from_ref(target),
            user_id,
            message,
            false,
        )?;

        Ok(MutationOutcome {
            blob_hash: self.wc.blob_hash(target).ok(),
            commit,
        })
    }

    /// Overwrite an existing file, guarded by its blob hash.
    ///
    /// The hash check happens **before** any write, so a stale hash fails
    /// with [`StoreError::Conflict`] and no rollback is needed on that
    /// branch of failure.
    pub fn update(
        &self,
        path: &RelPath,
        content: &[u8],
        expected_hash: &Oid,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        let stats = self.wc.path_stats(path)?;
        if stats.is_dir {
            return Err(StoreError::NotFound {
                path: path.to_string(),
            });
        }

        self.check_hash(path, expected_hash)?;

        let checkpoint = self.checkpoint()?;
        let abs = path.resolve_in(self.wc.root());

        if let Err(e) = fs::write(&abs, content) {
            return Err(self.rollback_after(&checkpoint, format!("write {path}: {e}")));
        }

        let commit = self.commit_or_rollback(
            &checkpoint,
            std::slice::from_ref(path),
            user_id,
            message,
            false,
        )?;

        Ok(MutationOutcome {
            blob_hash: self.wc.blob_hash(path).ok(),
            commit,
        })
    }

    /// Remove a file or directory.
    ///
    /// Files require a matching blob hash. Directories skip the hash check
    /// entirely - they have no stable blob hash. This asymmetry is
    /// intentional and preserved (see DESIGN.md).
    pub fn delete(
        &self,
        path: &RelPath,
        expected_hash: Option<&Oid>,
        is_directory: bool,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        self.validate_removal(path, expected_hash, is_directory)?;

        let checkpoint = self.checkpoint()?;
        let abs = path.resolve_in(self.wc.root());

        let removed = if is_directory {
            fs::remove_dir_all(&abs)
        } else {
            fs::remove_file(&abs)
        };
        if let Err(e) = removed {
            return Err(self.rollback_after(&checkpoint, format!("remove {path}: {e}")));
        }

        let commit = self.commit_or_rollback(
            &checkpoint,
            std::slice::from_ref(path),
            user_id,
            message,
            false,
        )?;

        Ok(MutationOutcome {
            commit,
            blob_hash: None,
        })
    }

    /// Remove several paths as one commit.
    ///
    /// Every item is stat-checked and hash-validated before any removal
    /// begins; one invalid item rejects the whole batch with no removals
    /// performed. A failure partway through the removals rolls back all of
    /// them - single checkpoint, single reset.
    pub fn delete_multiple(
        &self,
        items: &[DeleteItem],
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        if items.is_empty() {
            return Err(StoreError::Storage {
                message: "delete batch cannot be empty".to_string(),
            });
        }

        for item in items {
            self.validate_removal(&item.path, item.expected_hash.as_ref(), item.is_directory)?;
        }

        let checkpoint = self.checkpoint()?;

        for item in items {
            if let Err(e) = self.wc.stage_removal(&item.path, item.is_directory) {
                return Err(
                    self.rollback_after(&checkpoint, format!("remove {}: {e}", item.path))
                );
            }
        }

        let paths: Vec<RelPath> = items.iter().map(|i| i.path.clone()).collect();
        let commit = self.commit_or_rollback(&checkpoint, &paths, user_id, message, true)?;

        Ok(MutationOutcome {
            commit,
            blob_hash: None,
        })
    }

    /// Rename a single path.
    ///
    /// `old` must exist and `new` must not. The rename is staged natively
    /// (filesystem rename plus index update together), so the commit skips
    /// staging.
    pub fn rename(
        &self,
        old: &RelPath,
        new: &RelPath,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        self.wc.path_stats(old)?;
        self.ensure_absent(new)?;

        let checkpoint = self.checkpoint()?;

        if let Err(e) = self.wc.stage_rename(old, new) {
            return Err(self.rollback_after(&checkpoint, format!("rename {old} -> {new}: {e}")));
        }

        let paths = [old.clone(), new.clone()];
        let commit = self.commit_or_rollback(&checkpoint, &paths, user_id, message, true)?;

        Ok(MutationOutcome {
            blob_hash: self.wc.blob_hash(new).ok(),
            commit,
        })
    }

    /// Move a set of files from one directory to another as one commit.
    ///
    /// The destination directory is created if missing. Every target is
    /// checked for a name collision before the first rename executes; a
    /// single collision aborts the whole batch.
    pub fn move_files(
        &self,
        old_dir: &RelPath,
        new_dir: &RelPath,
        targets: &[String],
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        if targets.is_empty() {
            return Err(StoreError::Storage {
                message: "move batch cannot be empty".to_string(),
            });
        }

        let mut moves = Vec::with_capacity(targets.len());
        for target in targets {
            let old = old_dir.join(target).map_err(|e| StoreError::Storage {
                message: e.to_string(),
            })?;
            let new = new_dir.join(target).map_err(|e| StoreError::Storage {
                message: e.to_string(),
            })?;
            moves.push((old, new));
        }

        let checkpoint = self.checkpoint()?;

        let new_dir_abs = new_dir.resolve_in(self.wc.root());
        fs::create_dir_all(&new_dir_abs).map_err(|e| StoreError::Storage {
            message: format!("cannot create {new_dir}: {e}"),
        })?;

        // All collisions are verified before any rename executes
        for (old, new) in &moves {
            self.wc.path_stats(old)?;
            self.ensure_absent(new)?;
        }

        for (old, new) in &moves {
            if let Err(e) = self.wc.stage_rename(old, new) {
                return Err(self.rollback_after(&checkpoint, format!("move {old} -> {new}: {e}")));
            }
        }

        let paths: Vec<RelPath> = moves.into_iter().map(|(_, new)| new).collect();
        let commit = self.commit_or_rollback(&checkpoint, &paths, user_id, message, true)?;

        Ok(MutationOutcome {
            commit,
            blob_hash: None,
        })
    }

    // =========================================================================
    // Shared preflight and rollback plumbing
    // =========================================================================

    /// Verify `path` exists and, for files, that the hash matches.
    fn validate_removal(
        &self,
        path: &RelPath,
        expected_hash: Option<&Oid>,
        is_directory: bool,
    ) -> Result<(), StoreError> {
        let stats = self.wc.path_stats(path)?;

        if is_directory {
            if !stats.is_dir {
                return Err(StoreError::Conflict {
                    message: format!("{path} is not a directory"),
                });
            }
            // Directories have no stable blob hash; the check is skipped
            // by design
            return Ok(());
        }

        if stats.is_dir {
            return Err(StoreError::Conflict {
                message: format!("{path} is a directory"),
            });
        }

        let expected = expected_hash.ok_or_else(|| StoreError::Storage {
            message: format!("file delete of {path} requires an expected hash"),
        })?;
        self.check_hash(path, expected)
    }

    /// Optimistic-concurrency check: the caller's hash must equal the
    /// blob hash at HEAD.
    fn check_hash(&self, path: &RelPath, expected: &Oid) -> Result<(), StoreError> {
        let actual = match self.wc.blob_hash(path) {
            Ok(oid) => oid,
            // Present on disk but never committed: no hash can match
            Err(GitError::PathNotInHead { .. }) => {
                return Err(StoreError::stale_hash(path.as_str()))
            }
            Err(e) => return Err(e.into()),
        };

        if &actual != expected {
            return Err(StoreError::stale_hash(path.as_str()));
        }

        Ok(())
    }

    /// Fail with [`StoreError::Conflict`] if `path` exists.
    fn ensure_absent(&self, path: &RelPath) -> Result<(), StoreError> {
        match self.wc.path_stats(path) {
            Ok(_) => Err(StoreError::Conflict {
                message: format!("{path} already exists"),
            }),
            Err(GitError::PathNotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn checkpoint(&self) -> Result<Oid, StoreError> {
        Ok(self.wc.head_commit()?)
    }

    /// Commit, rolling back to the checkpoint if the commit fails.
    fn commit_or_rollback(
        &self,
        checkpoint: &Oid,
        paths: &[RelPath],
        user_id: &str,
        message: &str,
        skip_stage: bool,
    ) -> Result<Oid, StoreError> {
        match self.wc.commit(paths, user_id, message, skip_stage) {
            Ok(oid) => Ok(oid),
            Err(e) => Err(self.rollback_after(checkpoint, e)),
        }
    }

    /// Restore the working copy after a mid-mutation failure.
    ///
    /// The rollback's own failure is the most severe state this system can
    /// reach: it is logged at error level and surfaced distinctly.
    fn rollback_after(&self, checkpoint: &Oid, cause: impl Display) -> StoreError {
        let cause = cause.to_string();
        warn!(
            checkpoint = checkpoint.short(7),
            error = %cause,
            "mutation failed after filesystem write, rolling back"
        );

        match self.wc.rollback(checkpoint) {
            Ok(()) => StoreError::RolledBack { message: cause },
            Err(rollback_err) => {
                error!(
                    checkpoint = checkpoint.short(7),
                    error = %rollback_err,
                    "rollback failed, working copy in unknown state"
                );
                StoreError::RollbackFailed {
                    message: cause,
                    rollback_error: rollback_err.to_string(),
                }
            }
        }
    }
}
