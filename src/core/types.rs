//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoName`] - Validated repository slug
//! - [`RelPath`] - Validated repository-relative content path
//! - [`Oid`] - Git object identifier (SHA)
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs - a `RelPath`
//! can never escape the working copy, a `RepoName` can never inject a
//! path separator into a checkout root.
//!
//! # Examples
//!
//! ```
//! use stagehand::core::types::{Oid, RelPath, RepoName};
//!
//! // Valid constructions
//! let repo = RepoName::new("marketing-site").unwrap();
//! let path = RelPath::new("pages/about.md").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//!
//! // Invalid constructions fail at creation time
//! assert!(RepoName::new("../evil").is_err());
//! assert!(RelPath::new("/etc/passwd").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository name: {0}")]
    InvalidRepoName(String),

    #[error("invalid relative path: {0}")]
    InvalidRelPath(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated repository slug.
///
/// Repository names become directory names under the workspace root and
/// path segments in provider URLs, so the charset is deliberately narrow:
/// ASCII alphanumerics plus `.`, `_`, and `-`, no leading dot.
///
/// # Example
///
/// ```
/// use stagehand::core::types::RepoName;
///
/// let name = RepoName::new("marketing-site").unwrap();
/// assert_eq!(name.as_str(), "marketing-site");
///
/// assert!(RepoName::new("").is_err());
/// assert!(RepoName::new("a/b").is_err());
/// assert!(RepoName::new(".hidden").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoName(String);

impl RepoName {
    /// Create a new validated repository name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoName` if the name is empty, starts
    /// with a dot, or contains characters outside `[A-Za-z0-9._-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidRepoName(
                "repository name cannot be empty".into(),
            ));
        }

        if name.starts_with('.') {
            return Err(TypeError::InvalidRepoName(
                "repository name cannot start with '.'".into(),
            ));
        }

        for c in name.chars() {
            if !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-') {
                return Err(TypeError::InvalidRepoName(format!(
                    "repository name cannot contain '{c}'"
                )));
            }
        }

        Ok(())
    }

    /// Get the repository name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepoName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepoName> for String {
    fn from(name: RepoName) -> Self {
        name.0
    }
}

impl AsRef<str> for RepoName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated repository-relative content path.
///
/// Relative paths are the unit of addressing for every content operation.
/// Validation guarantees the path stays inside the working copy:
/// - Cannot be empty or absolute
/// - Cannot contain `.` or `..` components
/// - Cannot contain backslashes or NUL
/// - Cannot enter the `.git` control directory
///
/// Paths are normalized to forward slashes with no trailing slash.
///
/// # Example
///
/// ```
/// use stagehand::core::types::RelPath;
///
/// let path = RelPath::new("pages/about.md").unwrap();
/// assert_eq!(path.file_name(), Some("about.md"));
/// assert_eq!(path.parent().unwrap().as_str(), "pages");
///
/// assert!(RelPath::new("../escape").is_err());
/// assert!(RelPath::new(".git/config").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    /// Create a new validated relative path.
    ///
    /// A trailing slash is stripped before validation.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRelPath` if the path is empty, absolute,
    /// contains dot components, or reaches into `.git`.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let mut path = path.into();
        while path.ends_with('/') {
            path.pop();
        }
        Self::validate(&path)?;
        Ok(Self(path))
    }

    fn validate(path: &str) -> Result<(), TypeError> {
        if path.is_empty() {
            return Err(TypeError::InvalidRelPath("path cannot be empty".into()));
        }

        if path.starts_with('/') {
            return Err(TypeError::InvalidRelPath(
                "path must be repository-relative, not absolute".into(),
            ));
        }

        if path.contains('\\') {
            return Err(TypeError::InvalidRelPath(
                "path cannot contain backslashes".into(),
            ));
        }

        if path.contains('\0') {
            return Err(TypeError::InvalidRelPath(
                "path cannot contain NUL".into(),
            ));
        }

        for component in path.split('/') {
            if component.is_empty() {
                return Err(TypeError::InvalidRelPath(
                    "path cannot contain empty components".into(),
                ));
            }
            if component == "." || component == ".." {
                return Err(TypeError::InvalidRelPath(
                    "path cannot contain '.' or '..' components".into(),
                ));
            }
            if component == ".git" {
                return Err(TypeError::InvalidRelPath(
                    "path cannot enter the .git directory".into(),
                ));
            }
        }

        Ok(())
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final component of the path.
    pub fn file_name(&self) -> Option<&str> {
        self.0.rsplit('/').next()
    }

    /// The parent path, or `None` for a single-component path.
    pub fn parent(&self) -> Option<RelPath> {
        let (parent, _) = self.0.rsplit_once('/')?;
        // Parent of a valid path is itself valid
        Some(RelPath(parent.to_string()))
    }

    /// Append a validated component, returning a new path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRelPath` if the joined path is invalid
    /// (e.g. the component contains a dot segment).
    pub fn join(&self, component: &str) -> Result<RelPath, TypeError> {
        RelPath::new(format!("{}/{}", self.0, component))
    }

    /// Resolve against a working-copy root to an absolute filesystem path.
    pub fn resolve_in(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl TryFrom<String> for RelPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.0
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for RelPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase. The same type serves as the blob hash
/// handed to callers as an optimistic-concurrency token and as the commit
/// id returned by mutations.
///
/// # Example
///
/// ```
/// use stagehand::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
///
/// let zero = Oid::zero();
/// assert!(zero.is_zero());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// The zero OID (40 zeros for SHA-1).
    const ZERO_SHA1: &'static str = "0000000000000000000000000000000000000000";

    /// Create a new validated OID.
    ///
    /// Accepts 40-character (SHA-1) or 64-character (SHA-256) hex strings,
    /// normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` for wrong lengths or non-hex input.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_lowercase();

        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex chars, got {}",
                oid.len()
            )));
        }

        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }

        Ok(Self(oid))
    }

    /// The zero OID, used as a null sentinel.
    pub fn zero() -> Self {
        Self(Self::ZERO_SHA1.to_string())
    }

    /// Check whether this is the zero OID.
    pub fn is_zero(&self) -> bool {
        self.0.chars().all(|c| c == '0')
    }

    /// Get the OID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form (first `n` characters).
    pub fn short(&self, n: usize) -> &str {
        &self.0[..n.min(self.0.len())]
    }
}

impl From<git2::Oid> for Oid {
    fn from(oid: git2::Oid) -> Self {
        // git2 emits well-formed lowercase hex
        Self(oid.to_string())
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
