//! core
//!
//! Core domain types and schemas for Stagehand.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RepoName, RelPath, Oid
//! - [`paths`] - Resolution of (repository, variant) pairs to checkout roots
//! - [`audit`] - JSON audit record embedded in commit messages
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Path validation happens once, at the boundary
//! - All verification is deterministic

pub mod audit;
pub mod config;
pub mod paths;
pub mod types;
