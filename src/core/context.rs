//! Per-invocation release state - build once, pass everywhere
//!
//! # Design
//!
//! `ReleaseContext` is built by the orchestrator after preflight and version
//! resolution, then passed by reference to the chosen strategy. It is never
//! persisted: every invocation rebuilds it from the repository and GitHub.
//!
//! ```text
//! orchestrator:
//!   preflight -> version -> ReleaseContext::new() -> &ReleaseContext
//!   |
//!   v
//! release/direct.rs, indirect.rs:
//!   fn execute(ctx: &ReleaseContext)
//! ```

use crate::build::Artifact;
use crate::changelog::ChangelogSpec;
use crate::core::error::{CutError, CutResult};
use crate::release::version::SemVer;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Deadline covering one whole invocation
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
  started: Instant,
  limit: Duration,
}

impl Deadline {
  pub fn new(limit: Duration) -> Self {
    Self {
      started: Instant::now(),
      limit,
    }
  }

  pub fn limit(&self) -> Duration {
    self.limit
  }

  /// Time left before expiry (zero once expired)
  pub fn remaining(&self) -> Duration {
    self.limit.saturating_sub(self.started.elapsed())
  }

  /// Fail with `CutError::Timeout` if the deadline passed before `step` starts
  pub fn check(&self, step: &str) -> CutResult<()> {
    if self.started.elapsed() >= self.limit {
      tracing::warn!(step, limit_secs = self.limit.as_secs(), "release deadline expired");
      return Err(CutError::Timeout {
        step: step.to_string(),
        limit: self.limit,
      });
    }
    Ok(())
  }
}

/// Working state of one release invocation
pub struct ReleaseContext {
  /// Version being released
  pub version: SemVer,

  pub owner: String,
  pub repo: String,

  /// Repository default branch (protected branch in direct mode)
  pub default_branch: String,

  /// Throwaway review branch (`release-{version}`)
  pub release_branch: String,

  /// What the changelog generator renders for this release
  pub changelog: ChangelogSpec,

  /// Optional text prefixed to the published release notes
  pub comment: Option<String>,

  pub deadline: Deadline,

  /// Artifacts appended by concurrent build workers
  artifacts: Mutex<Vec<Artifact>>,
}

impl ReleaseContext {
  pub fn new(
    version: SemVer,
    owner: impl Into<String>,
    repo: impl Into<String>,
    default_branch: impl Into<String>,
    changelog: ChangelogSpec,
    comment: Option<String>,
    deadline: Deadline,
  ) -> Self {
    let release_branch = format!("release-{}", version);
    Self {
      version,
      owner: owner.into(),
      repo: repo.into(),
      default_branch: default_branch.into(),
      release_branch,
      changelog,
      comment,
      deadline,
      artifacts: Mutex::new(Vec::new()),
    }
  }

  /// Tag name (`v{version}`)
  pub fn tag(&self) -> String {
    self.version.tag_name()
  }

  /// Pull request title, also the key a later invocation searches for
  pub fn pr_title(&self) -> String {
    format!("RELEASE {}", self.version)
  }

  /// Release commit message
  pub fn commit_message(&self) -> String {
    format!("Release {}", self.tag())
  }

  /// Fail if the invocation deadline passed before `step`
  pub fn check_deadline(&self, step: &str) -> CutResult<()> {
    self.deadline.check(step)
  }

  /// Record a built artifact; safe to call from several workers at once
  pub fn push_artifact(&self, artifact: Artifact) {
    self.artifacts.lock().unwrap_or_else(PoisonError::into_inner).push(artifact);
  }

  /// Snapshot of the accumulated artifacts
  pub fn artifacts(&self) -> Vec<Artifact> {
    self.artifacts.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Release notes as published: the optional comment, then the changelog section
  pub fn release_notes(&self, changelog: &str) -> String {
    match self.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
      Some(comment) => format!("{}\n\n{}", comment, changelog),
      None => changelog.to_string(),
    }
  }
}
