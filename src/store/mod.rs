//! store
//!
//! Content mutations and dual-branch commit coordination.
//!
//! # Modules
//!
//! - [`error`] - The error taxonomy surfaced to the editing service
//! - [`mutator`] - One operation per mutation kind, with preflight checks
//!   and rollback-on-failure semantics
//! - [`policy`] - Collaborator interfaces: asset classification and the
//!   lite-branch whitelist
//! - [`coordinator`] - Fan-out of every mutation across `staging` and
//!   `staging-lite`
//!
//! # Data Flow
//!
//! editing service → coordinator operation → mutator (filesystem write +
//! commit on `staging`) → the same mutation against `staging-lite` when
//! gated in → push staging, then staging-lite.

pub mod coordinator;
pub mod error;
pub mod mutator;
pub mod policy;

pub use coordinator::DualBranchCoordinator;
pub use error::StoreError;
pub use mutator::{ContentMutator, DeleteItem, FileContent, MutationOutcome};
pub use policy::{AssetClassifier, ConfigGate, LiteGate, SegmentClassifier};
