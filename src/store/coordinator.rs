//! store::coordinator
//!
//! Fan-out of every mutation across the `staging` and `staging-lite`
//! branches.
//!
//! # Sequencing
//!
//! 1. The mutation runs against the `full`/staging checkout; its result is
//!    the one returned to the caller.
//! 2. `should_update_lite = whitelisted(repo) && !binary_asset(path)`.
//!    When it holds, the identical mutation runs against the `lite`
//!    checkout. The two checkouts are separate directories, so both
//!    mutations run as independent scoped threads, joined before any push.
//! 3. A lite failure **is** surfaced to the caller even though only the
//!    staging result is ever returned on success - swallowing it would
//!    leave the two branches silently inconsistent.
//! 4. Staging is pushed unconditionally; staging-lite only when gated in.
//!    Staging's push is always sequenced before staging-lite's: a reader
//!    observing "lite ahead of staging" is a worse inconsistency than the
//!    reverse.

use std::thread;

use tracing::{error, info, warn};

use crate::core::config::StoreConfig;
use crate::core::paths::{PathResolver, Variant};
use crate::core::types::{Oid, RelPath, RepoName};
use crate::git::{CommitInfo, DirEntry, GitWorkingCopy, PushOutcome};
use crate::store::error::StoreError;
use crate::store::mutator::{ContentMutator, DeleteItem, FileContent, MutationOutcome};
use crate::store::policy::{AssetClassifier, ConfigGate, LiteGate, SegmentClassifier};

/// One mutation, expressed once so it can be replayed identically against
/// both checkouts.
enum Mutation {
    Create {
        target: RelPath,
        content: Vec<u8>,
    },
    Update {
        path: RelPath,
        content: Vec<u8>,
        expected_hash: Oid,
    },
    Delete {
        path: RelPath,
        expected_hash: Option<Oid>,
        is_directory: bool,
    },
    DeleteMultiple {
        items: Vec<DeleteItem>,
    },
    Rename {
        old: RelPath,
        new: RelPath,
    },
    MoveFiles {
        old_dir: RelPath,
        new_dir: RelPath,
        targets: Vec<String>,
    },
}

impl Mutation {
    /// The path driving the binary-asset classification.
    fn primary_path(&self) -> &RelPath {
        match self {
            Mutation::Create { target, .. } => target,
            Mutation::Update { path, .. } => path,
            Mutation::Delete { path, .. } => path,
            // Batches are gated on their first item / destination
            Mutation::DeleteMultiple { items } => &items[0].path,
            Mutation::Rename { new, .. } => new,
            Mutation::MoveFiles { new_dir, .. } => new_dir,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Mutation::Create { .. } => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
            Mutation::DeleteMultiple { .. } => "delete_multiple",
            Mutation::Rename { .. } => "rename",
            Mutation::MoveFiles { .. } => "move_files",
        }
    }

    /// Replay this mutation against one checkout.
    fn apply(
        &self,
        mutator: &ContentMutator,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        match self {
            Mutation::Create { target, content } => {
                mutator.create(target, content, user_id, message)
            }
            Mutation::Update {
                path,
                content,
                expected_hash,
            } => mutator.update(path, content, expected_hash, user_id, message),
            Mutation::Delete {
                path,
                expected_hash,
                is_directory,
            } => mutator.delete(path, expected_hash.as_ref(), *is_directory, user_id, message),
            Mutation::DeleteMultiple { items } => {
                mutator.delete_multiple(items, user_id, message)
            }
            Mutation::Rename { old, new } => mutator.rename(old, new, user_id, message),
            Mutation::MoveFiles {
                old_dir,
                new_dir,
                targets,
            } => mutator.move_files(old_dir, new_dir, targets, user_id, message),
        }
    }
}

/// Orchestrates every content mutation across both branches of a
/// repository.
///
/// Reads (`read`, `list`, `history`) go to the `full` checkout only and
/// never push. Mutations fan out per the module docs.
pub struct DualBranchCoordinator {
    config: StoreConfig,
    resolver: PathResolver,
    classifier: Box<dyn AssetClassifier>,
    gate: Box<dyn LiteGate>,
}

impl DualBranchCoordinator {
    /// Coordinator with the default policies: segment-based asset
    /// classification and the configured whitelist.
    pub fn new(config: StoreConfig) -> Self {
        let gate = ConfigGate::from_config(&config);
        Self::with_policies(config, Box::new(SegmentClassifier::default()), Box::new(gate))
    }

    /// Coordinator with caller-supplied collaborators.
    pub fn with_policies(
        config: StoreConfig,
        classifier: Box<dyn AssetClassifier>,
        gate: Box<dyn LiteGate>,
    ) -> Self {
        let resolver = PathResolver::new(config.workspace_root.clone());
        Self {
            config,
            resolver,
            classifier,
            gate,
        }
    }

    /// The path resolver in use.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    // =========================================================================
    // Provisioning
    // =========================================================================

    /// Ensure the working copies for `repo` exist, cloning any that are
    /// missing. The lite checkout is only provisioned for whitelisted
    /// repositories.
    pub fn provision(&self, repo: &RepoName) -> Result<(), StoreError> {
        self.provision_variant(repo, Variant::Full)?;
        if self.gate.is_whitelisted(repo) {
            self.provision_variant(repo, Variant::Lite)?;
        }
        Ok(())
    }

    fn provision_variant(&self, repo: &RepoName, variant: Variant) -> Result<(), StoreError> {
        let root = self.resolver.working_copy_root(repo, variant);
        let url = self.config.expected_remote_url(repo);

        if GitWorkingCopy::is_valid_repo(&root, &self.config.remote, &url) {
            return Ok(());
        }

        if root.exists() {
            return Err(StoreError::Storage {
                message: format!(
                    "{} exists but is not a valid checkout of {url}",
                    root.display()
                ),
            });
        }

        info!(repo = %repo, %variant, %url, "cloning working copy");
        GitWorkingCopy::clone_from(&url, &root, variant)?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read a file from the staging checkout.
    pub fn read(&self, repo: &RepoName, path: &RelPath) -> Result<FileContent, StoreError> {
        self.mutator(repo, Variant::Full)?.read(path)
    }

    /// List a directory of the staging checkout.
    pub fn list(
        &self,
        repo: &RepoName,
        path: Option<&RelPath>,
    ) -> Result<Vec<DirEntry>, StoreError> {
        self.mutator(repo, Variant::Full)?.list(path)
    }

    /// Recent staging history, newest first, with decoded audit records.
    pub fn history(&self, repo: &RepoName, limit: usize) -> Result<Vec<CommitInfo>, StoreError> {
        let wc = self.working_copy(repo, Variant::Full)?;
        Ok(wc.log(limit)?)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a new file under `dir`.
    pub fn create(
        &self,
        repo: &RepoName,
        dir: &RelPath,
        file: &str,
        content: &[u8],
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        let target = dir.join(file).map_err(|e| StoreError::Storage {
            message: e.to_string(),
        })?;
        self.dispatch(
            repo,
            Mutation::Create {
                target,
                content: content.to_vec(),
            },
            user_id,
            message,
        )
    }

    /// Overwrite an existing file, guarded by its blob hash.
    pub fn update(
        &self,
        repo: &RepoName,
        path: &RelPath,
        content: &[u8],
        expected_hash: &Oid,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        self.dispatch(
            repo,
            Mutation::Update {
                path: path.clone(),
                content: content.to_vec(),
                expected_hash: expected_hash.clone(),
            },
            user_id,
            message,
        )
    }

    /// Remove a file (hash-guarded) or a directory (unguarded).
    pub fn delete(
        &self,
        repo: &RepoName,
        path: &RelPath,
        expected_hash: Option<&Oid>,
        is_directory: bool,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        self.dispatch(
            repo,
            Mutation::Delete {
                path: path.clone(),
                expected_hash: expected_hash.cloned(),
                is_directory,
            },
            user_id,
            message,
        )
    }

    /// Remove several paths as one commit per branch.
    pub fn delete_multiple(
        &self,
        repo: &RepoName,
        items: Vec<DeleteItem>,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        if items.is_empty() {
            return Err(StoreError::Storage {
                message: "delete batch cannot be empty".to_string(),
            });
        }
        self.dispatch(repo, Mutation::DeleteMultiple { items }, user_id, message)
    }

    /// Rename a single path.
    pub fn rename(
        &self,
        repo: &RepoName,
        old: &RelPath,
        new: &RelPath,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        self.dispatch(
            repo,
            Mutation::Rename {
                old: old.clone(),
                new: new.clone(),
            },
            user_id,
            message,
        )
    }

    /// Move a set of files between directories.
    pub fn move_files(
        &self,
        repo: &RepoName,
        old_dir: &RelPath,
        new_dir: &RelPath,
        targets: Vec<String>,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        self.dispatch(
            repo,
            Mutation::MoveFiles {
                old_dir: old_dir.clone(),
                new_dir: new_dir.clone(),
                targets,
            },
            user_id,
            message,
        )
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Whether a mutation of `path` in `repo` propagates to staging-lite.
    pub fn lite_gated(&self, repo: &RepoName, path: &RelPath) -> bool {
        self.gate.is_whitelisted(repo) && !self.classifier.is_binary_asset(path)
    }

    fn dispatch(
        &self,
        repo: &RepoName,
        mutation: Mutation,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        let update_lite = self.lite_gated(repo, mutation.primary_path());
        info!(
            repo = %repo,
            op = mutation.kind(),
            path = %mutation.primary_path(),
            lite = update_lite,
            "applying mutation"
        );

        // Pre-mutation head of the lite checkout, kept so a staging
        // failure can undo an already-committed lite mutation
        let lite_checkpoint = if update_lite {
            Some(self.working_copy(repo, Variant::Lite)?.head_commit()?)
        } else {
            None
        };

        // The two checkouts are separate directories: mutate them
        // concurrently, join before any push
        let (full_outcome, lite_outcome) = thread::scope(|scope| {
            let full = scope
                .spawn(|| self.apply_variant(repo, Variant::Full, &mutation, user_id, message));
            let lite = update_lite.then(|| {
                scope.spawn(|| self.apply_variant(repo, Variant::Lite, &mutation, user_id, message))
            });
            (join_task(full), lite.map(join_task))
        });

        let outcome = match full_outcome {
            Ok(outcome) => outcome,
            Err(full_err) => {
                // Staging failed; an already-committed lite mutation must
                // not survive, or lite ends up ahead of staging
                if let (Some(checkpoint), Some(Ok(_))) = (&lite_checkpoint, &lite_outcome) {
                    warn!(repo = %repo, "staging mutation failed after staging-lite commit, rolling lite back");
                    match self.working_copy(repo, Variant::Lite) {
                        Ok(wc) => {
                            if let Err(e) = wc.rollback(checkpoint) {
                                error!(repo = %repo, error = %e, "staging-lite rollback failed");
                            }
                        }
                        Err(e) => {
                            error!(repo = %repo, error = %e, "cannot reopen staging-lite for rollback");
                        }
                    }
                }
                return Err(full_err);
            }
        };

        // A lite failure surfaces even though only the staging result is
        // returned on success
        if let Some(lite) = lite_outcome {
            lite?;
        }

        self.push_variant(repo, Variant::Full)?;
        if update_lite {
            self.push_variant(repo, Variant::Lite)?;
        }

        Ok(outcome)
    }

    fn apply_variant(
        &self,
        repo: &RepoName,
        variant: Variant,
        mutation: &Mutation,
        user_id: &str,
        message: &str,
    ) -> Result<MutationOutcome, StoreError> {
        let mutator = self.mutator(repo, variant)?;
        let outcome = mutation.apply(&mutator, user_id, message)?;
        info!(
            repo = %repo,
            %variant,
            commit = outcome.commit.short(7),
            "mutation committed"
        );
        Ok(outcome)
    }

    fn push_variant(&self, repo: &RepoName, variant: Variant) -> Result<(), StoreError> {
        let wc = self.working_copy(repo, variant)?;
        let outcome = wc.push_with_retry(variant.branch())?;
        if outcome == PushOutcome::Forced {
            warn!(repo = %repo, %variant, "push required force, remote history overwritten");
        }
        info!(repo = %repo, %variant, ?outcome, "pushed");
        Ok(())
    }

    fn mutator(&self, repo: &RepoName, variant: Variant) -> Result<ContentMutator, StoreError> {
        Ok(ContentMutator::new(self.working_copy(repo, variant)?))
    }

    fn working_copy(&self, repo: &RepoName, variant: Variant) -> Result<GitWorkingCopy, StoreError> {
        let root = self.resolver.working_copy_root(repo, variant);
        let wc = GitWorkingCopy::open_with_remote(&root, &self.config.remote)?;
        if wc.index_lock_held() {
            // Git's own lock serializes mutations; the operation will fail
            // and be retried by the caller if the holder is still alive
            warn!(repo = %repo, %variant, "index lock held by another operation");
        }
        wc.ensure_branch(variant.branch())?;
        Ok(wc)
    }
}

fn join_task<T>(
    handle: thread::ScopedJoinHandle<'_, Result<T, StoreError>>,
) -> Result<T, StoreError> {
    handle.join().unwrap_or_else(|_| {
        Err(StoreError::Storage {
            message: "mutation task panicked".to_string(),
        })
    })
}
