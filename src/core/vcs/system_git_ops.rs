//! Additional operations for SystemGit (commit walking, remotes, branches, pushes)

use super::CommitInfo;
use super::system_git::SystemGit;
use crate::core::error::{CutError, CutResult, GitError, ResultExt};
use rayon::prelude::*;

impl SystemGit {
  /// SHAs after `since` up to HEAD, oldest first
  ///
  /// Uses `git rev-list` for efficient traversal.
  pub fn get_commits_since(&self, since: Option<&str>) -> CutResult<Vec<String>> {
    let mut cmd = self.git_cmd();
    cmd.args(["rev-list", "--no-merges", "--reverse"]);

    if let Some(since_ref) = since {
      cmd.arg(format!("{}..HEAD", since_ref));
    } else {
      cmd.arg("HEAD");
    }

    let output = cmd.output().context("Failed to run git rev-list")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(CutError::Git(GitError::CommandFailed {
        command: "git rev-list".to_string(),
        stderr: stderr.trim().to_string(),
      }));
    }

    let commits = String::from_utf8_lossy(&output.stdout)
      .lines()
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .collect();

    Ok(commits)
  }

  /// Get commit metadata for a single SHA
  ///
  /// Uses `git log -1 --format` for efficient single-commit lookup.
  pub fn get_commit(&self, sha: &str) -> CutResult<CommitInfo> {
    // Format: %H (hash) %an (author name) %ae (author email) %at (author time)
    //         %cn (committer name) %ce (committer email) %ct (committer time)
    //         %P (parent hashes) %B (body)
    let format = "%H%n%an%n%ae%n%at%n%cn%n%ce%n%ct%n%P%n%B";

    let output = self
      .git_cmd()
      .args(["log", "-1", &format!("--format={}", format), sha])
      .output()
      .context("Failed to get commit info")?;

    if !output.status.success() {
      return Err(CutError::Git(GitError::CommandFailed {
        command: format!("git log -1 {}", sha),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }

    parse_commit_output(&output.stdout)
  }

  /// Commit metadata for many SHAs, preserving order
  pub fn get_commits(&self, shas: &[String]) -> CutResult<Vec<CommitInfo>> {
    shas.par_iter().map(|sha| self.get_commit(sha)).collect()
  }

  /// List all remotes
  pub fn list_remotes(&self) -> CutResult<Vec<(String, String)>> {
    let output = self
      .git_cmd()
      .args(["remote", "-v"])
      .output()
      .context("Failed to list remotes")?;

    if !output.status.success() {
      return Ok(vec![]);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut remotes = Vec::new();

    for line in stdout.lines() {
      // Format: "origin  git@github.com:user/repo.git (fetch)"
      let parts: Vec<&str> = line.split_whitespace().collect();
      if parts.len() >= 2 && line.contains("(fetch)") {
        remotes.push((parts[0].to_string(), parts[1].to_string()));
      }
    }

    Ok(remotes)
  }

  /// Get remote URL
  pub fn get_remote_url(&self, name: &str) -> CutResult<Option<String>> {
    let remotes = self.list_remotes()?;
    Ok(remotes.iter().find(|(n, _)| n == name).map(|(_, url)| url.clone()))
  }

  /// Push one refspec to the release remote
  pub fn push_refspec(&self, refspec: &str, force: bool) -> CutResult<()> {
    tracing::debug!(remote = %self.remote, refspec, force, "pushing");

    let mut cmd = self.git_cmd();
    cmd.arg("push");
    if force {
      cmd.arg("--force");
    }
    cmd.arg(&self.remote).arg(refspec);

    let output = cmd.output().context("Failed to push")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(CutError::Git(GitError::PushFailed {
        remote: self.remote.clone(),
        refspec: refspec.to_string(),
        reason: stderr.trim().to_string(),
      }));
    }

    Ok(())
  }

  /// Fetch from remote
  pub fn fetch_from_remote(&self, remote_name: &str) -> CutResult<()> {
    let output = self
      .git_cmd()
      .args(["fetch", remote_name])
      .output()
      .context("Failed to fetch")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(CutError::Git(GitError::CommandFailed {
        command: "git fetch".to_string(),
        stderr: stderr.trim().to_string(),
      }));
    }

    Ok(())
  }

  /// Checkout a branch
  pub fn checkout_branch(&self, branch_name: &str) -> CutResult<()> {
    let output = self
      .git_cmd()
      .args(["checkout", branch_name])
      .output()
      .context("Failed to checkout branch")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(CutError::Git(GitError::CommandFailed {
        command: "git checkout".to_string(),
        stderr: stderr.trim().to_string(),
      }));
    }

    Ok(())
  }

  /// Create and checkout a branch, resetting it if it already exists locally
  pub fn create_and_checkout_branch(&self, branch_name: &str) -> CutResult<()> {
    let output = self
      .git_cmd()
      .args(["checkout", "-B", branch_name])
      .output()
      .context("Failed to create branch")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(CutError::Git(GitError::CommandFailed {
        command: "git checkout -B".to_string(),
        stderr: stderr.trim().to_string(),
      }));
    }

    Ok(())
  }
}

/// Parse git log output into CommitInfo
///
/// Format is %H%n%an%n%ae%n%at%n%cn%n%ce%n%ct%n%P%n%B
/// Which gives us: hash, author name, author email, author time,
///                 committer name, committer email, committer time,
///                 parent hashes, body
fn parse_commit_output(data: &[u8]) -> CutResult<CommitInfo> {
  let output = String::from_utf8_lossy(data);
  let mut lines = output.lines();

  let sha = lines.next().ok_or_else(|| CutError::message("Missing commit SHA"))?.to_string();
  let author = lines.next().ok_or_else(|| CutError::message("Missing author name"))?.to_string();
  let author_email = lines.next().ok_or_else(|| CutError::message("Missing author email"))?.to_string();
  let timestamp = lines
    .next()
    .and_then(|s| s.parse::<i64>().ok())
    .ok_or_else(|| CutError::message("Missing/invalid author timestamp"))?;
  let committer = lines.next().ok_or_else(|| CutError::message("Missing committer name"))?.to_string();
  let committer_email = lines.next().ok_or_else(|| CutError::message("Missing committer email"))?.to_string();
  let _committer_timestamp = lines.next();
  let parents_line = lines.next().unwrap_or("");
  let parent_shas = if parents_line.is_empty() {
    vec![]
  } else {
    parents_line.split_whitespace().map(|s| s.to_string()).collect()
  };

  // Rest is commit message
  let message: Vec<String> = lines.map(|s| s.to_string()).collect();
  let message = message.join("\n").trim().to_string();

  Ok(CommitInfo {
    sha,
    author,
    author_email,
    committer,
    committer_email,
    message,
    timestamp,
    parent_shas,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_commit_output() {
    let raw = b"abc123\nAda\nada@example.com\n1700000000\nBob\nbob@example.com\n1700000001\np1 p2\nfeat: thing\n\nbody line\n";
    let commit = parse_commit_output(raw).unwrap();
    assert_eq!(commit.sha, "abc123");
    assert_eq!(commit.author, "Ada");
    assert_eq!(commit.timestamp, 1_700_000_000);
    assert_eq!(commit.parent_shas, vec!["p1".to_string(), "p2".to_string()]);
    assert_eq!(commit.message, "feat: thing\n\nbody line");
  }

  #[test]
  fn test_parse_commit_output_truncated() {
    assert!(parse_commit_output(b"abc123\nAda\n").is_err());
  }
}
