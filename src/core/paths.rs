//! core::paths
//!
//! Resolution of (repository, variant) pairs to on-disk checkout roots.
//!
//! # Layout
//!
//! Every repository has up to two independent checkouts under the
//! workspace root:
//!
//! - `<workspace_root>/<repo>` - the `full` variant, tracking `staging`
//!   with complete history
//! - `<workspace_root>/<repo>-lite` - the `lite` variant, a single-branch
//!   checkout of `staging-lite`
//!
//! The two variants live in separate directories and may be mutated
//! concurrently; mutations within one variant are serialized by Git's own
//! index lock.
//!
//! **Hard rule:** no code outside this module may compute a checkout root
//! by hand. All storage locations route through [`PathResolver`].
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use stagehand::core::paths::{PathResolver, Variant};
//! use stagehand::core::types::RepoName;
//!
//! let resolver = PathResolver::new(PathBuf::from("/var/stagehand"));
//! let repo = RepoName::new("marketing-site").unwrap();
//!
//! assert_eq!(
//!     resolver.working_copy_root(&repo, Variant::Full),
//!     PathBuf::from("/var/stagehand/marketing-site")
//! );
//! assert_eq!(
//!     resolver.working_copy_root(&repo, Variant::Lite),
//!     PathBuf::from("/var/stagehand/marketing-site-lite")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::RepoName;

/// Which checkout of a repository an operation targets.
///
/// `Full` tracks the `staging` branch with complete history. `Lite` tracks
/// only `staging-lite`, a reduced-cost mirror used to speed up rebuilds for
/// whitelisted repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Complete checkout tracking the `staging` branch.
    Full,
    /// Single-branch checkout tracking `staging-lite`.
    Lite,
}

impl Variant {
    /// The branch this variant tracks.
    ///
    /// # Example
    ///
    /// ```
    /// use stagehand::core::paths::Variant;
    ///
    /// assert_eq!(Variant::Full.branch(), "staging");
    /// assert_eq!(Variant::Lite.branch(), "staging-lite");
    /// ```
    pub fn branch(&self) -> &'static str {
        match self {
            Variant::Full => "staging",
            Variant::Lite => "staging-lite",
        }
    }

    /// Directory-name suffix distinguishing the two checkouts.
    pub fn dir_suffix(&self) -> &'static str {
        match self {
            Variant::Full => "",
            Variant::Lite => "-lite",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Full => write!(f, "full"),
            Variant::Lite => write!(f, "lite"),
        }
    }
}

/// Stateless resolver from (repository, variant) to checkout roots.
///
/// # Invariants
///
/// - Distinct repositories never share a directory (`RepoName` validation
///   forbids path separators and dot segments)
/// - The full and lite roots of one repository never collide (`-lite`
///   suffix, and `RepoName` comparison is exact)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    workspace_root: PathBuf,
}

impl PathResolver {
    /// Create a resolver rooted at `workspace_root`.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    /// The workspace root all checkouts live under.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Root directory of one checkout.
    pub fn working_copy_root(&self, repo: &RepoName, variant: Variant) -> PathBuf {
        self.workspace_root
            .join(format!("{}{}", repo.as_str(), variant.dir_suffix()))
    }
}
