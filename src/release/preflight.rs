//! Repository state checks that gate every release

use crate::core::error::{CutError, CutResult, StateError};
use crate::core::vcs::Vcs;
use crate::hosting::Hosting;
use std::sync::Arc;

/// Confirms the working copy can be released from
pub struct RepoStateValidator {
  vcs: Arc<dyn Vcs>,
  hosting: Arc<dyn Hosting>,
}

impl RepoStateValidator {
  pub fn new(vcs: Arc<dyn Vcs>, hosting: Arc<dyn Hosting>) -> Self {
    Self { vcs, hosting }
  }

  /// Check branch, cleanliness and freshness; returns the default branch
  ///
  /// 1. Repository metadata from GitHub
  /// 2. HEAD must be on the default branch
  /// 3. Working copy must be clean
  /// 4. Pull (fast-forward only)
  pub fn validate(&self) -> CutResult<String> {
    let repository = self.hosting.get_repository()?;
    let default_branch = repository.default_branch;

    let current = self.vcs.current_branch()?;
    if current != default_branch {
      return Err(CutError::State(StateError::NotOnDefaultBranch {
        current,
        default: default_branch,
      }));
    }

    let status = self.vcs.status()?;
    if !status.trim().is_empty() {
      return Err(CutError::State(StateError::DirtyWorkingCopy { status }));
    }

    self.vcs.pull()?;

    tracing::debug!(repository = %repository.full_name, branch = %default_branch, "preflight passed");
    Ok(default_branch)
  }
}
