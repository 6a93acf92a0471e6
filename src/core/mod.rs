//! Core engine for cargo-cut
//!
//! - **config**: cut.toml parsing and credential lookup
//! - **context**: Per-invocation release state and the invocation deadline
//! - **error**: Error types with contextual help messages and exit codes
//! - **tasks**: Fan-out task group with first-error cancellation
//! - **vcs**: Git operations abstraction (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod tasks;
pub mod vcs;
