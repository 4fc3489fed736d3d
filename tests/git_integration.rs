//! Integration tests for the Git working-copy interface.
//!
//! These tests use real git repositories created via tempfile: a bare
//! remote seeded with both branches, and checkouts cloned from it.

mod common;

use common::{rel, World};

use stagehand::core::audit::CommitAudit;
use stagehand::core::paths::Variant;
use stagehand::git::{GitError, GitWorkingCopy, PushOutcome};

fn clone_full(world: &World, repo: &str) -> GitWorkingCopy {
    world.seed_remote(repo);
    let root = world.workspace().join(repo);
    GitWorkingCopy::clone_from(&world.remote_url(repo), &root, Variant::Full)
        .expect("clone full checkout")
}

// =============================================================================
// Cloning and Validation
// =============================================================================

#[test]
fn clone_full_checks_out_staging() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    assert_eq!(wc.current_branch().unwrap().as_deref(), Some("staging"));
    assert_eq!(wc.head_commit().unwrap(), world.remote_head("site", "staging"));
    assert!(wc.root().join("README.md").exists());
}

#[test]
fn clone_lite_checks_out_staging_lite() {
    let world = World::new();
    world.seed_remote("site");
    let root = world.workspace().join("site-lite");
    let wc = GitWorkingCopy::clone_from(&world.remote_url("site"), &root, Variant::Lite)
        .expect("clone lite checkout");

    assert_eq!(wc.current_branch().unwrap().as_deref(), Some("staging-lite"));
    assert!(wc.root().join("README.md").exists());
}

#[test]
fn is_valid_repo_conditions() {
    let world = World::new();
    let wc = clone_full(&world, "site");
    let url = world.remote_url("site");

    // Valid checkout with matching remote
    assert!(GitWorkingCopy::is_valid_repo(wc.root(), "origin", &url));

    // Wrong expected URL
    assert!(!GitWorkingCopy::is_valid_repo(wc.root(), "origin", "/elsewhere/site.git"));

    // Wrong remote name
    assert!(!GitWorkingCopy::is_valid_repo(wc.root(), "upstream", &url));

    // Plain directory, no repository
    let plain = world.workspace().join("plain");
    std::fs::create_dir_all(&plain).unwrap();
    assert!(!GitWorkingCopy::is_valid_repo(&plain, "origin", &url));

    // Absent path is an ordinary false, not an error
    assert!(!GitWorkingCopy::is_valid_repo(
        &world.workspace().join("missing"),
        "origin",
        &url
    ));
}

#[test]
fn open_rejects_non_repo() {
    let world = World::new();
    let plain = world.workspace().join("plain");
    std::fs::create_dir_all(&plain).unwrap();

    assert!(matches!(
        GitWorkingCopy::open(&plain),
        Err(GitError::NotARepo { .. })
    ));
}

// =============================================================================
// Branches
// =============================================================================

#[test]
fn ensure_branch_is_noop_on_current() {
    let world = World::new();
    let wc = clone_full(&world, "site");
    let head = wc.head_commit().unwrap();

    wc.ensure_branch("staging").unwrap();
    assert_eq!(wc.current_branch().unwrap().as_deref(), Some("staging"));
    assert_eq!(wc.head_commit().unwrap(), head);
}

#[test]
fn ensure_branch_creates_local_from_remote_tracking() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    // staging-lite exists only as a remote-tracking ref after the clone
    wc.ensure_branch("staging-lite").unwrap();
    assert_eq!(wc.current_branch().unwrap().as_deref(), Some("staging-lite"));

    wc.ensure_branch("staging").unwrap();
    assert_eq!(wc.current_branch().unwrap().as_deref(), Some("staging"));
}

#[test]
fn ensure_branch_unresolvable_fails() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    assert!(matches!(
        wc.ensure_branch("no-such-branch"),
        Err(GitError::BranchNotFound { .. })
    ));
}

// =============================================================================
// Lookups
// =============================================================================

#[test]
fn blob_hash_of_committed_file() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    let hash = wc.blob_hash(&rel("README.md")).unwrap();
    // Hash of blob "# Site\n", independent of history
    let expected = git2::Oid::hash_object(git2::ObjectType::Blob, b"# Site\n").unwrap();
    assert_eq!(hash.as_str(), expected.to_string());
}

#[test]
fn blob_hash_distinguishes_untracked_from_missing_repo() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    // Never committed at all
    assert!(matches!(
        wc.blob_hash(&rel("pages/new.md")),
        Err(GitError::PathNotInHead { .. })
    ));

    // On disk but not in HEAD
    std::fs::write(wc.root().join("untracked.md"), b"draft").unwrap();
    assert!(matches!(
        wc.blob_hash(&rel("untracked.md")),
        Err(GitError::PathNotInHead { .. })
    ));
}

#[test]
fn path_stats_reports_files_and_directories() {
    let world = World::new();
    let wc = clone_full(&world, "site");
    std::fs::create_dir_all(wc.root().join("pages")).unwrap();
    std::fs::write(wc.root().join("pages/about.md"), b"Hello").unwrap();

    let file = wc.path_stats(&rel("pages/about.md")).unwrap();
    assert!(file.is_file());
    assert_eq!(file.size, 5);

    let dir = wc.path_stats(&rel("pages")).unwrap();
    assert!(dir.is_dir);
    assert_eq!(dir.size, 0);

    assert!(matches!(
        wc.path_stats(&rel("nope")),
        Err(GitError::PathNotFound { .. })
    ));
}

// =============================================================================
// Committing
// =============================================================================

#[test]
fn commit_single_path_embeds_audit_with_file_name() {
    let world = World::new();
    let wc = clone_full(&world, "site");
    let before = wc.head_commit().unwrap();

    std::fs::create_dir_all(wc.root().join("pages")).unwrap();
    std::fs::write(wc.root().join("pages/about.md"), b"Hello").unwrap();

    let commit = wc
        .commit(&[rel("pages/about.md")], "editor-1", "Added about page", false)
        .unwrap();
    assert_ne!(commit, before);
    assert_eq!(wc.head_commit().unwrap(), commit);

    let log = wc.log(1).unwrap();
    let audit = log[0].audit.as_ref().expect("audit record");
    assert_eq!(audit.user_id, "editor-1");
    assert_eq!(audit.message, "Added about page");
    assert_eq!(audit.file_name.as_deref(), Some("about.md"));
}

#[test]
fn commit_two_paths_omits_file_name() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    std::fs::write(wc.root().join("a.md"), b"a").unwrap();
    std::fs::write(wc.root().join("b.md"), b"b").unwrap();

    wc.commit(&[rel("a.md"), rel("b.md")], "editor-1", "Added two", false)
        .unwrap();

    let audit = CommitAudit::decode(&wc.log(1).unwrap()[0].message).unwrap();
    assert!(audit.file_name.is_none());
}

#[test]
fn commit_path_count_contract() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    assert!(matches!(
        wc.commit(&[], "editor-1", "Nothing", false),
        Err(GitError::Usage { .. })
    ));

    assert!(matches!(
        wc.commit(
            &[rel("a"), rel("b"), rel("c")],
            "editor-1",
            "Too many",
            false
        ),
        Err(GitError::Usage { .. })
    ));
}

#[test]
fn commit_stages_removal_of_absent_path() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    std::fs::remove_file(wc.root().join("README.md")).unwrap();
    wc.commit(&[rel("README.md")], "editor-1", "Removed readme", false)
        .unwrap();

    assert!(matches!(
        wc.blob_hash(&rel("README.md")),
        Err(GitError::PathNotInHead { .. })
    ));
}

#[test]
fn stage_rename_then_commit_skip_stage() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    wc.stage_rename(&rel("README.md"), &rel("INDEX.md")).unwrap();
    wc.commit(
        &[rel("README.md"), rel("INDEX.md")],
        "editor-1",
        "Renamed readme",
        true,
    )
    .unwrap();

    assert!(wc.blob_hash(&rel("INDEX.md")).is_ok());
    assert!(matches!(
        wc.blob_hash(&rel("README.md")),
        Err(GitError::PathNotInHead { .. })
    ));
}

// =============================================================================
// Rollback
// =============================================================================

#[test]
fn rollback_restores_exact_pre_operation_state() {
    let world = World::new();
    let wc = clone_full(&world, "site");
    let checkpoint = wc.head_commit().unwrap();

    // Tracked modification, untracked file, untracked directory
    std::fs::write(wc.root().join("README.md"), b"mangled").unwrap();
    std::fs::write(wc.root().join("partial.md"), b"half-written").unwrap();
    std::fs::create_dir_all(wc.root().join("newdir")).unwrap();
    std::fs::write(wc.root().join("newdir/inner.md"), b"x").unwrap();

    wc.rollback(&checkpoint).unwrap();

    assert_eq!(wc.head_commit().unwrap(), checkpoint);
    assert_eq!(
        std::fs::read(wc.root().join("README.md")).unwrap(),
        b"# Site\n"
    );
    assert!(!wc.root().join("partial.md").exists());
    assert!(!wc.root().join("newdir").exists());
}

// =============================================================================
// Push
// =============================================================================

#[test]
fn push_updates_remote_branch() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    std::fs::write(wc.root().join("page.md"), b"content").unwrap();
    let commit = wc
        .commit(&[rel("page.md")], "editor-1", "Added page", false)
        .unwrap();

    wc.push("staging", false).unwrap();
    assert_eq!(world.remote_head("site", "staging"), commit);
}

#[test]
fn push_retry_forces_past_divergent_remote() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    // Remote diverges after our clone
    world.advance_remote("site", "staging", "oob.md", b"out of band");

    std::fs::write(wc.root().join("page.md"), b"content").unwrap();
    let commit = wc
        .commit(&[rel("page.md")], "editor-1", "Added page", false)
        .unwrap();

    let outcome = wc.push_with_retry("staging").unwrap();
    assert_eq!(outcome, PushOutcome::Forced);

    // Diverging remote history was overwritten: remote matches us exactly
    assert_eq!(world.remote_head("site", "staging"), commit);
    assert!(world.remote_file("site", "staging", "oob.md").is_none());
}

// =============================================================================
// Listing and History
// =============================================================================

#[test]
fn list_directory_excludes_git_and_hashes_best_effort() {
    let world = World::new();
    let wc = clone_full(&world, "site");
    std::fs::write(wc.root().join("untracked.md"), b"draft").unwrap();
    std::fs::create_dir_all(wc.root().join("pages")).unwrap();

    let entries = wc.list_directory(None).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["README.md", "pages", "untracked.md"]);

    let readme = &entries[0];
    assert!(readme.blob_hash.is_some());
    assert_eq!(readme.size, 7);

    let pages = &entries[1];
    assert!(pages.blob_hash.is_none());
    assert_eq!(pages.size, 0);

    // Untracked placeholder: listed, hash lookup fails quietly
    assert!(entries[2].blob_hash.is_none());
}

#[test]
fn list_missing_directory_fails() {
    let world = World::new();
    let wc = clone_full(&world, "site");
    assert!(matches!(
        wc.list_directory(Some(&rel("nope"))),
        Err(GitError::PathNotFound { .. })
    ));
}

#[test]
fn changed_paths_of_commit() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    std::fs::create_dir_all(wc.root().join("pages")).unwrap();
    std::fs::write(wc.root().join("pages/about.md"), b"Hello").unwrap();
    let commit = wc
        .commit(&[rel("pages/about.md")], "editor-1", "Added", false)
        .unwrap();

    assert_eq!(wc.changed_paths(&commit).unwrap(), vec!["pages/about.md"]);
}

#[test]
fn log_is_newest_first_and_tolerates_plain_messages() {
    let world = World::new();
    let wc = clone_full(&world, "site");

    std::fs::write(wc.root().join("a.md"), b"a").unwrap();
    wc.commit(&[rel("a.md")], "editor-1", "Added a", false).unwrap();

    let log = wc.log(10).unwrap();
    assert_eq!(log.len(), 2);
    assert!(log[0].audit.is_some());
    // The seed commit was not written by the store
    assert!(log[1].audit.is_none());
    assert_eq!(log[1].summary, "Initial commit");
}
