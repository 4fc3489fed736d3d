//! git::working_copy
//!
//! Git working-copy implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! Stagehand. One [`GitWorkingCopy`] wraps one local checkout and exposes
//! exactly the operations the store needs: validation, branch checkout,
//! blob-hash lookup, staging and committing, hard-reset rollback,
//! push-with-retry, and listing/history queries.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants. The important
//! distinction for callers is [`GitError::PathNotInHead`] (the path was
//! never committed) versus everything else (transport or IO failure):
//! the former drives optimistic-concurrency decisions, the latter does not.
//!
//! # Push Retry Ladder
//!
//! The local working copy is the source of truth, so eventual convergence
//! matters more than git-native merge semantics. A push is attempted
//! plain, plain again (covers transient network or lock errors), then
//! forced; diverging remote history is overwritten on the final attempt
//! and only that attempt's failure is terminal. See [`push_ladder`].

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::core::audit::CommitAudit;
use crate::core::paths::Variant;
use crate::core::types::{Oid, RelPath, TypeError};

/// Errors from Git working-copy operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was checked
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested branch does not exist locally or on the remote.
    #[error("branch not found: {branch}")]
    BranchNotFound {
        /// The branch that was not found
        branch: String,
    },

    /// Path exists on disk (or not at all) but is not a blob in HEAD.
    ///
    /// Distinguishes "never committed" from transport/IO failure, which is
    /// what optimistic-concurrency checks need.
    #[error("path not in HEAD: {path}")]
    PathNotInHead {
        /// The path that was looked up
        path: String,
    },

    /// Path absent from the filesystem.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was looked up
        path: String,
    },

    /// The remote rejected the pushed ref.
    #[error("push rejected: {message}")]
    PushRejected {
        /// The per-ref status reported by the remote
        message: String,
    },

    /// The caller violated the operation contract.
    #[error("usage error: {message}")]
    Usage {
        /// Description of the violation
        message: String,
    },

    /// Filesystem error.
    #[error("io error at {path}: {source}")]
    Io {
        /// The path being accessed
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::Internal {
                message: format!("{context}: not found: {}", err.message()),
            },
            git2::ErrorCode::Locked => GitError::Internal {
                message: format!("{context}: repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{context}: {}", err.message()),
            },
        }
    }

    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GitError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::Internal {
            message: err.to_string(),
        }
    }
}

/// Raw filesystem metadata for a path, independent of Git tracking.
#[derive(Debug, Clone)]
pub struct PathStats {
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Whether the path is a directory.
    pub is_dir: bool,
    /// Last modification time, when the filesystem reports one.
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
}

impl PathStats {
    /// Whether the path is a regular file.
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// One entry in a directory listing.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Final path component.
    pub name: String,
    /// File or directory.
    pub kind: EntryKind,
    /// Repository-relative path of the entry.
    pub path: RelPath,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Blob hash at HEAD. Best-effort: `None` for untracked entries and
    /// directories rather than failing the whole listing.
    pub blob_hash: Option<Oid>,
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID.
    pub oid: Oid,
    /// First line of the commit message.
    pub summary: String,
    /// Full commit message.
    pub message: String,
    /// Author name.
    pub author_name: String,
    /// Author timestamp.
    pub author_time: chrono::DateTime<chrono::Utc>,
    /// Decoded audit record, when the message is one.
    pub audit: Option<CommitAudit>,
}

/// How a push ultimately succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// First attempt succeeded.
    Clean,
    /// Second plain attempt succeeded.
    Retried,
    /// Final forced attempt succeeded; diverging remote history was
    /// overwritten.
    Forced,
}

/// Run the push retry ladder over an attempt closure.
///
/// Attempt 1: plain. Attempt 2: plain again, covering transient network or
/// lock errors. Attempt 3: forced, accepted as the final fallback. Only
/// the third attempt's failure is surfaced.
///
/// Factored over a closure so the policy is testable without a network.
///
/// # Example
///
/// ```
/// use stagehand::git::{push_ladder, PushOutcome};
///
/// let mut calls = 0;
/// let outcome = push_ladder(|force| {
///     calls += 1;
///     if force { Ok(()) } else { Err("rejected") }
/// })
/// .unwrap();
/// assert_eq!(outcome, PushOutcome::Forced);
/// assert_eq!(calls, 3);
/// ```
pub fn push_ladder<E: std::fmt::Display>(
    mut attempt: impl FnMut(bool) -> Result<(), E>,
) -> Result<PushOutcome, E> {
    match attempt(false) {
        Ok(()) => return Ok(PushOutcome::Clean),
        Err(e) => warn!(error = %e, attempt = 1, "push failed, retrying"),
    }

    match attempt(false) {
        Ok(()) => return Ok(PushOutcome::Retried),
        Err(e) => warn!(error = %e, attempt = 2, "push failed again, forcing"),
    }

    attempt(true).map(|()| PushOutcome::Forced)
}

/// One local Git checkout.
///
/// This is the **single point of interaction** with Git. All repository
/// reads and writes flow through this interface; no other module imports
/// `git2`.
///
/// # Index Discipline
///
/// A working copy has exactly one index and one index lock. Multiple paths
/// are therefore staged sequentially, and concurrent mutations against the
/// same checkout are serialized by Git itself - an operation observing the
/// lock held simply fails and is retried by the caller.
pub struct GitWorkingCopy {
    repo: git2::Repository,
    root: PathBuf,
    remote: String,
}

impl std::fmt::Debug for GitWorkingCopy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitWorkingCopy")
            .field("root", &self.root)
            .finish()
    }
}

impl GitWorkingCopy {
    // =========================================================================
    // Opening, Validation, Cloning
    // =========================================================================

    /// Open an existing checkout rooted exactly at `root`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `root` is not a repository root
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(root: &Path) -> Result<Self, GitError> {
        Self::open_with_remote(root, "origin")
    }

    /// Open a checkout whose upstream remote has a non-default name.
    pub fn open_with_remote(root: &Path, remote: &str) -> Result<Self, GitError> {
        let repo = git2::Repository::open(root).map_err(|_| GitError::NotARepo {
            path: root.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self {
            repo,
            root: root.to_path_buf(),
            remote: remote.to_string(),
        })
    }

    /// Check whether `root` holds a valid checkout of the expected remote.
    ///
    /// True iff the path exists, is a directory, is a Git repository, and
    /// its remote URL matches `expected_url`. Each false condition
    /// short-circuits the remaining checks; "doesn't exist yet" is an
    /// ordinary `false`, not an error.
    pub fn is_valid_repo(root: &Path, remote: &str, expected_url: &str) -> bool {
        if !root.is_dir() {
            return false;
        }

        let repo = match git2::Repository::open(root) {
            Ok(repo) => repo,
            Err(_) => return false,
        };

        // Named binding: the Remote's borrow of `repo` must end before
        // `repo` is dropped
        let Ok(found) = repo.find_remote(remote) else {
            return false;
        };
        found.url() == Some(expected_url)
    }

    /// Clone a repository from `url` into `root`, checked out at the
    /// variant's branch.
    ///
    /// The lite variant is cloned single-branch: its remote only fetches
    /// `staging-lite`, keeping the checkout cheap.
    pub fn clone_from(url: &str, root: &Path, variant: Variant) -> Result<Self, GitError> {
        let branch = variant.branch();

        let mut builder = git2::build::RepoBuilder::new();
        builder.branch(branch);

        if variant == Variant::Lite {
            builder.remote_create(|repo, name, url| {
                let refspec = format!(
                    "+refs/heads/{branch}:refs/remotes/{name}/{branch}",
                    branch = Variant::Lite.branch()
                );
                repo.remote_with_fetch(name, url, &refspec)
            });
        }

        let repo = builder
            .clone(url, root)
            .map_err(|e| GitError::from_git2(e, url))?;

        Ok(Self {
            repo,
            root: root.to_path_buf(),
            remote: "origin".to_string(),
        })
    }

    /// Root directory of the checkout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether Git's index lock is currently held by some operation.
    ///
    /// Mutations against one checkout are serialized by this lock, even
    /// across processes sharing a mounted filesystem.
    pub fn index_lock_held(&self) -> bool {
        self.repo.path().join("index.lock").exists()
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// The currently checked-out branch, if HEAD is on one.
    pub fn current_branch(&self) -> Result<Option<String>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };

        if head.is_branch() {
            return Ok(head.shorthand().map(String::from));
        }

        Ok(None) // Detached HEAD
    }

    /// Check out `branch` only if the current branch differs; no-op
    /// otherwise.
    ///
    /// A branch missing locally but present on the remote (the usual state
    /// right after a clone checked out at the other branch) is created
    /// from its remote-tracking ref.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchNotFound`] if the branch cannot be resolved
    pub fn ensure_branch(&self, branch: &str) -> Result<(), GitError> {
        if self.current_branch()?.as_deref() == Some(branch) {
            return Ok(());
        }

        let refname = format!("refs/heads/{branch}");

        if self.repo.find_reference(&refname).is_err() {
            let remote_ref = format!("refs/remotes/{}/{branch}", self.remote);
            let commit = self
                .repo
                .find_reference(&remote_ref)
                .and_then(|r| r.peel_to_commit())
                .map_err(|_| GitError::BranchNotFound {
                    branch: branch.to_string(),
                })?;
            self.repo
                .branch(branch, &commit, false)
                .map_err(|e| GitError::from_git2(e, branch))?;
        }

        self.repo
            .set_head(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo
            .checkout_head(Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, &refname))?;

        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// The commit OID at HEAD - the checkpoint captured before a mutation.
    pub fn head_commit(&self) -> Result<Oid, GitError> {
        let commit = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        Ok(commit.id().into())
    }

    /// The blob hash of `path` at HEAD (`HEAD:<path>`).
    ///
    /// This is the optimistic-concurrency token handed to callers.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotInHead`] if the path exists on disk but was
    ///   never committed, or does not exist at all
    pub fn blob_hash(&self, path: &RelPath) -> Result<Oid, GitError> {
        let tree = self
            .repo
            .head()
            .and_then(|h| h.peel_to_tree())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let entry = match tree.get_path(path.as_ref()) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                return Err(GitError::PathNotInHead {
                    path: path.to_string(),
                })
            }
            Err(e) => return Err(GitError::from_git2(e, path.as_str())),
        };

        // Directories have tree entries but no stable blob hash
        if entry.kind() != Some(git2::ObjectType::Blob) {
            return Err(GitError::PathNotInHead {
                path: path.to_string(),
            });
        }

        Ok(entry.id().into())
    }

    /// Raw filesystem stat for `path`, independent of Git tracking.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if the path is absent
    pub fn path_stats(&self, path: &RelPath) -> Result<PathStats, GitError> {
        let abs = path.resolve_in(&self.root);
        let meta = match fs::metadata(&abs) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GitError::PathNotFound {
                    path: path.to_string(),
                })
            }
            Err(e) => return Err(GitError::io(abs, e)),
        };

        let modified = meta
            .modified()
            .ok()
            .map(chrono::DateTime::<chrono::Utc>::from);

        Ok(PathStats {
            size: if meta.is_dir() { 0 } else { meta.len() },
            is_dir: meta.is_dir(),
            modified,
        })
    }

    /// Read the content of a file in the working copy.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if the path is absent
    pub fn read_file(&self, path: &RelPath) -> Result<Vec<u8>, GitError> {
        let abs = path.resolve_in(&self.root);
        match fs::read(&abs) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(GitError::PathNotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(GitError::io(abs, e)),
        }
    }

    // =========================================================================
    // Staging and Committing
    // =========================================================================

    /// Stage a rename, leaving it in the index (the `git mv` equivalent).
    ///
    /// The filesystem rename and the index update happen together, so a
    /// subsequent [`commit`](Self::commit) is called with `skip_stage`.
    pub fn stage_rename(&self, old: &RelPath, new: &RelPath) -> Result<(), GitError> {
        let old_abs = old.resolve_in(&self.root);
        let new_abs = new.resolve_in(&self.root);

        fs::rename(&old_abs, &new_abs).map_err(|e| GitError::io(&old_abs, e))?;

        let mut index = self.repo.index().map_err(|e| GitError::from_git2(e, "index"))?;

        if new_abs.is_dir() {
            index
                .remove_all([old.as_str()], None)
                .map_err(|e| GitError::from_git2(e, old.as_str()))?;
            index
                .add_all([new.as_str()], git2::IndexAddOption::DEFAULT, None)
                .map_err(|e| GitError::from_git2(e, new.as_str()))?;
        } else {
            index
                .remove_path(old.as_ref())
                .map_err(|e| GitError::from_git2(e, old.as_str()))?;
            index
                .add_path(new.as_ref())
                .map_err(|e| GitError::from_git2(e, new.as_str()))?;
        }

        index.write().map_err(|e| GitError::from_git2(e, "index"))?;
        Ok(())
    }

    /// Remove a path from disk and stage the removal, leaving it in the
    /// index.
    ///
    /// Used by batched deletes, which stage every removal and then commit
    /// once with `skip_stage`.
    pub fn stage_removal(&self, path: &RelPath, is_directory: bool) -> Result<(), GitError> {
        let abs = path.resolve_in(&self.root);

        if is_directory {
            fs::remove_dir_all(&abs).map_err(|e| GitError::io(&abs, e))?;
        } else {
            fs::remove_file(&abs).map_err(|e| GitError::io(&abs, e))?;
        }

        let mut index = self.repo.index().map_err(|e| GitError::from_git2(e, "index"))?;
        index
            .remove_all([path.as_str()], None)
            .map_err(|e| GitError::from_git2(e, path.as_str()))?;
        index.write().map_err(|e| GitError::from_git2(e, "index"))?;

        Ok(())
    }

    /// Stage `paths` and commit with the structured audit message.
    ///
    /// Paths are staged **sequentially** - Git's index forbids concurrent
    /// adds in one repository. A path absent from the filesystem is staged
    /// as a removal; a directory is staged recursively.
    ///
    /// With `skip_stage` the index is committed as-is (used after
    /// [`stage_rename`](Self::stage_rename) and
    /// [`stage_removal`](Self::stage_removal), which already staged their
    /// changes); `paths` then only feeds the audit record.
    ///
    /// # Errors
    ///
    /// - [`GitError::Usage`] for zero paths, or for more than two paths
    ///   when staging (a mutation touches at most an old and a new path)
    pub fn commit(
        &self,
        paths: &[RelPath],
        user_id: &str,
        message: &str,
        skip_stage: bool,
    ) -> Result<Oid, GitError> {
        if paths.is_empty() {
            return Err(GitError::Usage {
                message: "commit requires at least one path".to_string(),
            });
        }

        let mut index = self.repo.index().map_err(|e| GitError::from_git2(e, "index"))?;

        if !skip_stage {
            if paths.len() > 2 {
                return Err(GitError::Usage {
                    message: "a mutation touches at most an old path and a new path".to_string(),
                });
            }

            for path in paths {
                let abs = path.resolve_in(&self.root);
                if abs.is_dir() {
                    index
                        .add_all([path.as_str()], git2::IndexAddOption::DEFAULT, None)
                        .map_err(|e| GitError::from_git2(e, path.as_str()))?;
                } else if abs.exists() {
                    index
                        .add_path(path.as_ref())
                        .map_err(|e| GitError::from_git2(e, path.as_str()))?;
                } else {
                    index
                        .remove_all([path.as_str()], None)
                        .map_err(|e| GitError::from_git2(e, path.as_str()))?;
                }
            }

            index.write().map_err(|e| GitError::from_git2(e, "index"))?;
        }

        let tree_id = index
            .write_tree()
            .map_err(|e| GitError::from_git2(e, "index"))?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, "tree"))?;

        let audit = CommitAudit::for_paths(message, user_id, paths);
        let signature = git2::Signature::now(user_id, &format!("{user_id}@stagehand.local"))
            .map_err(|e| GitError::from_git2(e, user_id))?;

        let parent = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let oid = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &audit.encode(),
                &tree,
                &[&parent],
            )
            .map_err(|e| GitError::from_git2(e, "commit"))?;

        Ok(oid.into())
    }

    // =========================================================================
    // Rollback
    // =========================================================================

    /// Hard-reset to `to` and remove untracked files and directories,
    /// restoring the exact pre-operation state of the working copy.
    pub fn rollback(&self, to: &Oid) -> Result<(), GitError> {
        let oid = git2::Oid::from_str(to.as_str())
            .map_err(|e| GitError::from_git2(e, to.as_str()))?;
        let object = self
            .repo
            .find_object(oid, None)
            .map_err(|e| GitError::from_git2(e, to.as_str()))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo
            .reset(&object, git2::ResetType::Hard, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, to.as_str()))?;

        // Forced clean: a hard reset leaves partially-written new files
        // behind as untracked entries
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "status"))?;

        for entry in statuses.iter() {
            if !entry.status().is_wt_new() {
                continue;
            }
            let Some(rel) = entry.path() else { continue };
            let abs = self.root.join(rel);
            let result = if abs.is_dir() {
                fs::remove_dir_all(&abs)
            } else {
                fs::remove_file(&abs)
            };
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(GitError::io(abs, e)),
            }
        }

        Ok(())
    }

    // =========================================================================
    // Push
    // =========================================================================

    /// Push `branch` to the upstream remote, optionally forced.
    ///
    /// # Errors
    ///
    /// - [`GitError::PushRejected`] if the remote refuses the ref update
    pub fn push(&self, branch: &str, force: bool) -> Result<(), GitError> {
        let mut remote = self
            .repo
            .find_remote(&self.remote)
            .map_err(|e| GitError::from_git2(e, &self.remote))?;

        let refspec = if force {
            format!("+refs/heads/{branch}:refs/heads/{branch}")
        } else {
            format!("refs/heads/{branch}:refs/heads/{branch}")
        };

        let mut rejection: Option<String> = None;
        {
            let mut callbacks = git2::RemoteCallbacks::new();
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    rejection = Some(format!("{refname}: {message}"));
                }
                Ok(())
            });

            let mut opts = git2::PushOptions::new();
            opts.remote_callbacks(callbacks);

            remote
                .push(&[refspec.as_str()], Some(&mut opts))
                .map_err(|e| GitError::from_git2(e, &refspec))?;
        }

        if let Some(message) = rejection {
            return Err(GitError::PushRejected { message });
        }

        Ok(())
    }

    /// Push `branch` through the retry ladder: plain, plain, forced.
    pub fn push_with_retry(&self, branch: &str) -> Result<PushOutcome, GitError> {
        push_ladder(|force| self.push(branch, force))
    }

    // =========================================================================
    // Listing and History
    // =========================================================================

    /// List a directory of the working copy.
    ///
    /// `path` of `None` lists the checkout root. The `.git` control
    /// directory is always excluded. Blob hashes are looked up best-effort:
    /// an untracked placeholder file yields `None` rather than failing the
    /// whole listing. Entries are sorted by name.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if the directory is absent
    pub fn list_directory(&self, path: Option<&RelPath>) -> Result<Vec<DirEntry>, GitError> {
        let abs = match path {
            Some(p) => p.resolve_in(&self.root),
            None => self.root.clone(),
        };

        let read_dir = match fs::read_dir(&abs) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GitError::PathNotFound {
                    path: path.map(ToString::to_string).unwrap_or_default(),
                })
            }
            Err(e) => return Err(GitError::io(abs, e)),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| GitError::io(&abs, e))?;

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue, // Skip non-UTF8 names
            };
            if name == ".git" {
                continue;
            }

            let rel = match path {
                Some(parent) => parent.join(&name),
                None => RelPath::new(&name),
            };
            let rel = match rel {
                Ok(rel) => rel,
                Err(_) => continue,
            };

            let meta = entry.metadata().map_err(|e| GitError::io(&abs, e))?;
            let (kind, size) = if meta.is_dir() {
                (EntryKind::Directory, 0)
            } else {
                (EntryKind::File, meta.len())
            };

            let blob_hash = match kind {
                EntryKind::File => self.blob_hash(&rel).ok(),
                EntryKind::Directory => None,
            };

            entries.push(DirEntry {
                name,
                kind,
                path: rel,
                size,
                blob_hash,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// The most recent commits on the current branch, newest first.
    pub fn log(&self, limit: usize) -> Result<Vec<CommitInfo>, GitError> {
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| GitError::from_git2(e, "revwalk"))?;
        revwalk
            .push_head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let mut commits = Vec::new();
        for oid in revwalk.take(limit) {
            let oid = oid.map_err(|e| GitError::from_git2(e, "revwalk"))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| GitError::from_git2(e, "commit"))?;

            let message = commit.message().unwrap_or("").to_string();
            let author = commit.author();
            let author_time = chrono::DateTime::from_timestamp(author.when().seconds(), 0)
                .unwrap_or(chrono::DateTime::UNIX_EPOCH);

            commits.push(CommitInfo {
                oid: oid.into(),
                summary: commit.summary().unwrap_or("").to_string(),
                audit: CommitAudit::decode(&message).ok(),
                message,
                author_name: author.name().unwrap_or("").to_string(),
                author_time,
            });
        }

        Ok(commits)
    }

    /// Paths touched by a commit, relative to the repository root.
    pub fn changed_paths(&self, oid: &Oid) -> Result<Vec<String>, GitError> {
        let git_oid = git2::Oid::from_str(oid.as_str())
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        let commit = self
            .repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let tree = commit.tree().map_err(|e| GitError::from_git2(e, "tree"))?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree().map_err(|e| GitError::from_git2(e, "tree"))?),
            Err(_) => None, // Root commit
        };

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(|e| GitError::from_git2(e, "diff"))?;

        let mut paths = Vec::new();
        for delta in diff.deltas() {
            if let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) {
                paths.push(path.to_string_lossy().into_owned());
            }
        }

        Ok(paths)
    }
}
