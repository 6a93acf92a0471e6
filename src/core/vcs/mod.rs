pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;

use crate::core::error::{ConfigError, CutError, CutResult};
use std::path::{Path, PathBuf};

/// Information about a commit
#[derive(Debug, Clone)]
pub struct CommitInfo {
  pub sha: String,
  pub author: String,
  pub author_email: String,
  pub committer: String,
  pub committer_email: String,
  pub message: String,
  pub timestamp: i64,
  pub parent_shas: Vec<String>,
}

/// Where a git remote points: host plus `owner/repo` path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
  pub domain: String,
  pub path: String,
}

impl RemoteInfo {
  /// Split the path into `(owner, repo)`
  pub fn owner_repo(&self) -> CutResult<(String, String)> {
    match self.path.split_once('/') {
      Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
        Ok((owner.to_string(), repo.to_string()))
      }
      _ => Err(CutError::Config(ConfigError::UnsupportedRemote {
        url: format!("{}/{}", self.domain, self.path),
      })),
    }
  }
}

/// Local version-control operations the release workflow depends on
///
/// Commit and tag creation go through the `git` binary so the user's
/// signing and author configuration apply unchanged.
pub trait Vcs: Send + Sync {
  /// Working tree root
  fn work_tree(&self) -> &Path;

  /// Resolve a remote's host and `owner/repo` path
  fn remote(&self, name: &str) -> CutResult<RemoteInfo>;

  /// Current branch name (`HEAD` when detached)
  fn current_branch(&self) -> CutResult<String>;

  /// Porcelain status; empty when the working copy is clean
  fn status(&self) -> CutResult<String>;

  /// Fast-forward the current branch from its upstream
  fn pull(&self) -> CutResult<()>;

  fn add(&self, paths: &[PathBuf]) -> CutResult<()>;

  fn commit(&self, message: &str) -> CutResult<()>;

  /// Create an annotated tag at `target` (HEAD when `None`)
  fn tag(&self, name: &str, target: Option<&str>, message: &str) -> CutResult<()>;

  /// Push the current branch
  fn push(&self) -> CutResult<()>;

  fn push_tag(&self, name: &str) -> CutResult<()>;

  fn push_branch(&self, name: &str, force: bool) -> CutResult<()>;

  fn delete_branch(&self, name: &str) -> CutResult<()>;

  /// Switch branches, creating the branch first when `create` is set
  fn checkout(&self, name: &str, create: bool) -> CutResult<()>;

  /// Full SHA of the commit HEAD points at
  fn head_commit(&self) -> CutResult<String>;

  /// Commit a local tag points at, `None` when the tag doesn't exist
  fn tag_commit(&self, name: &str) -> CutResult<Option<String>>;

  /// Highest `vX.Y.Z` tag reachable from HEAD
  fn latest_version_tag(&self) -> CutResult<Option<String>>;

  /// Commits after `since` (all history when `None`), oldest first
  fn commits_since(&self, since: Option<&str>) -> CutResult<Vec<CommitInfo>>;
}
