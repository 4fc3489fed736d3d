//! Stagehand - a Git-backed storage engine for editable website content
//!
//! Stagehand persists pages, collections, media, and configuration inside a
//! Git repository and exposes atomic file/directory operations (create,
//! read, update, delete, rename, move) to upstream content-editing
//! services. Every mutation becomes a Git commit with an embedded JSON
//! audit record, guarded by optimistic-concurrency checks and rolled back
//! automatically if it fails partway.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`core`] - Domain types, path resolution, audit schema, configuration
//! - [`git`] - Single interface for all Git operations (one working copy)
//! - [`store`] - Content mutations and dual-branch commit coordination
//!
//! # Correctness Invariants
//!
//! Stagehand maintains the following invariants:
//!
//! 1. The blob hash is the sole optimistic-concurrency token: a stale hash
//!    is rejected before any filesystem write happens
//! 2. A mutation that fails after touching the filesystem is always rolled
//!    back to its pre-operation checkpoint
//! 3. The staging branch is pushed before staging-lite, so a reader never
//!    observes lite ahead of staging
//! 4. Multiple paths are staged sequentially - a working copy has a single
//!    shared index

pub mod core;
pub mod git;
pub mod store;
