//! store::error
//!
//! The closed error taxonomy surfaced to the editing service.
//!
//! # Propagation Policy
//!
//! Preflight failures ([`StoreError::NotFound`], [`StoreError::Conflict`])
//! propagate immediately, before any tracked content is written or
//! committed. Mid-mutation failures are
//! caught, trigger a synchronous rollback, and only then propagate - as
//! [`StoreError::RolledBack`] when the working copy was restored, or
//! [`StoreError::RollbackFailed`] when even the rollback failed, the most
//! severe state this system can reach.
//!
//! At the editing-service boundary: `NotFound` maps to 404, `Conflict` to
//! 409 with a "please retry" message, everything else to 500.

use thiserror::Error;

use crate::git::GitError;

/// Errors from content-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed path (or branch) is absent.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was addressed
        path: String,
    },

    /// Concurrency check or name collision failed.
    ///
    /// The caller is expected to re-fetch and retry at a higher level.
    #[error("conflict: {message}")]
    Conflict {
        /// What collided
        message: String,
    },

    /// The mutation failed after the filesystem was modified; the working
    /// copy was rolled back to its pre-operation checkpoint.
    #[error("mutation failed, working copy rolled back: {message}")]
    RolledBack {
        /// The failure that triggered the rollback
        message: String,
    },

    /// The mutation failed and the rollback failed too, leaving the
    /// working copy in an unknown state.
    #[error("mutation failed ({message}) and rollback failed ({rollback_error})")]
    RollbackFailed {
        /// The failure that triggered the rollback
        message: String,
        /// The rollback's own failure
        rollback_error: String,
    },

    /// Disk or Git-subprocess failure unrelated to the above.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the failure
        message: String,
    },
}

impl StoreError {
    /// Conflict with the standard lost-update message.
    pub(crate) fn stale_hash(path: &str) -> Self {
        StoreError::Conflict {
            message: format!("{path} changed recently, try again"),
        }
    }

    /// Whether this error was produced by a preflight check: no tracked
    /// content was written and no commit was made. A create may still have
    /// auto-created an empty parent directory, which Git does not track.
    pub fn is_preflight(&self) -> bool {
        matches!(self, StoreError::NotFound { .. } | StoreError::Conflict { .. })
    }
}

impl From<GitError> for StoreError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::PathNotInHead { path } | GitError::PathNotFound { path } => {
                StoreError::NotFound { path }
            }
            GitError::BranchNotFound { branch } => StoreError::NotFound { path: branch },
            other => StoreError::Storage {
                message: other.to_string(),
            },
        }
    }
}
