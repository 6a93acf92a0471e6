//! CLI commands for cargo-cut
//!
//! - **release**: bump, changelog, tag and publish a GitHub release
//! - **semver**: show the current version and the next candidates

pub mod release;
pub mod semver;

pub use release::{ReleaseArgs, run_release};
pub use semver::run_semver;
