//! Shared test fixtures.
//!
//! Tests run against real Git repositories: a bare "remote" seeded with
//! `staging` and `staging-lite` branches, and working copies cloned from
//! it under a workspace directory. Everything lives in one temp dir per
//! test.
//!
//! Each integration test binary links this module separately and uses a
//! different subset of the helpers.
#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

use stagehand::core::config::StoreConfig;
use stagehand::core::types::{Oid, RelPath, RepoName};

pub fn repo(name: &str) -> RepoName {
    RepoName::new(name).expect("valid repo name")
}

pub fn rel(path: &str) -> RelPath {
    RelPath::new(path).expect("valid relative path")
}

/// One temp dir holding bare remotes and a workspace of checkouts.
pub struct World {
    dir: TempDir,
}

impl World {
    pub fn new() -> Self {
        // Surfaces engine logs under RUST_LOG; a no-op after the first call
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn remotes_dir(&self) -> PathBuf {
        self.dir.path().join("remotes")
    }

    pub fn workspace(&self) -> PathBuf {
        self.dir.path().join("workspace")
    }

    pub fn remote_path(&self, repo: &str) -> PathBuf {
        self.remotes_dir().join(format!("{repo}.git"))
    }

    pub fn remote_url(&self, repo: &str) -> String {
        self.remote_path(repo).display().to_string()
    }

    /// Create a bare remote for `repo` with an initial commit on both
    /// `staging` and `staging-lite`.
    pub fn seed_remote(&self, repo: &str) -> PathBuf {
        let path = self.remote_path(repo);
        let remote = git2::Repository::init_bare(&path).expect("init bare remote");

        let blob = remote.blob(b"# Site\n").expect("write blob");
        let mut builder = remote.treebuilder(None).expect("tree builder");
        builder.insert("README.md", blob, 0o100_644).expect("insert");
        let tree_id = builder.write().expect("write tree");
        let tree = remote.find_tree(tree_id).expect("find tree");

        let sig = git2::Signature::now("seed", "seed@example.com").expect("signature");
        let commit = remote
            .commit(
                Some("refs/heads/staging"),
                &sig,
                &sig,
                "Initial commit",
                &tree,
                &[],
            )
            .expect("seed commit");
        remote
            .reference("refs/heads/staging-lite", commit, true, "seed")
            .expect("seed staging-lite");
        remote.set_head("refs/heads/staging").expect("set HEAD");

        path
    }

    /// Add a commit directly to a remote branch, simulating an
    /// out-of-band writer that makes the remote diverge.
    pub fn advance_remote(&self, repo: &str, branch: &str, file: &str, content: &[u8]) {
        let remote = git2::Repository::open_bare(self.remote_path(repo)).expect("open remote");
        let refname = format!("refs/heads/{branch}");
        let parent = remote
            .find_reference(&refname)
            .and_then(|r| r.peel_to_commit())
            .expect("branch head");

        let blob = remote.blob(content).expect("write blob");
        let mut builder = remote
            .treebuilder(Some(&parent.tree().expect("tree")))
            .expect("tree builder");
        builder.insert(file, blob, 0o100_644).expect("insert");
        let tree_id = builder.write().expect("write tree");
        let tree = remote.find_tree(tree_id).expect("find tree");

        let sig = git2::Signature::now("oob", "oob@example.com").expect("signature");
        remote
            .commit(Some(&refname), &sig, &sig, "Out-of-band change", &tree, &[&parent])
            .expect("advance commit");
    }

    /// Head commit of a remote branch.
    pub fn remote_head(&self, repo: &str, branch: &str) -> Oid {
        let remote = git2::Repository::open_bare(self.remote_path(repo)).expect("open remote");
        let commit = remote
            .find_reference(&format!("refs/heads/{branch}"))
            .and_then(|r| r.peel_to_commit())
            .expect("branch head");
        Oid::new(commit.id().to_string()).expect("valid oid")
    }

    /// Commit message at the head of a remote branch.
    pub fn remote_head_message(&self, repo: &str, branch: &str) -> String {
        let remote = git2::Repository::open_bare(self.remote_path(repo)).expect("open remote");
        let commit = remote
            .find_reference(&format!("refs/heads/{branch}"))
            .and_then(|r| r.peel_to_commit())
            .expect("branch head");
        commit.message().unwrap_or("").to_string()
    }

    /// Content of a file at the head of a remote branch, if present.
    pub fn remote_file(&self, repo: &str, branch: &str, path: &str) -> Option<Vec<u8>> {
        let remote = git2::Repository::open_bare(self.remote_path(repo)).expect("open remote");
        let tree = remote
            .find_reference(&format!("refs/heads/{branch}"))
            .and_then(|r| r.peel_to_tree())
            .expect("branch tree");

        let entry = tree.get_path(std::path::Path::new(path)).ok()?;
        let blob = remote.find_blob(entry.id()).ok()?;
        Some(blob.content().to_vec())
    }

    /// Store config pointing at this world's remotes and workspace.
    pub fn config(&self, whitelist: &[&str]) -> StoreConfig {
        let config = StoreConfig {
            workspace_root: self.workspace(),
            provider_base_url: self.remotes_dir().display().to_string(),
            remote: "origin".to_string(),
            lite_whitelist: whitelist.iter().map(|name| repo(name)).collect(),
        };
        config.validate().expect("valid config");
        config
    }
}
