//! System git backend
//!
//! Every operation is one `git` subprocess. Signing, author identity and
//! credential helpers come from the user's own git configuration.

use super::{CommitInfo, RemoteInfo, Vcs};
use crate::core::error::{ConfigError, CutError, CutResult, GitError, ResultExt};
use crate::utils;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using the system `git` binary
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,

  /// Remote that pushes and pulls go to
  pub(crate) remote: String,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path, remote: impl Into<String>) -> CutResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(CutError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(CutError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
      remote: remote.into(),
    })
  }

  /// Run a git command and return trimmed stdout, mapping failure to `GitError`
  pub(crate) fn run(&self, args: &[&str]) -> CutResult<String> {
    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(CutError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: stderr.trim().to_string(),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Create a git command bound to this repository
  ///
  /// - Sets working directory to repo path
  /// - Inherits the environment (gpg-agent, ssh-agent, credential helpers)
  /// - Disables interactive prompts
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII

    cmd
  }
}

impl Vcs for SystemGit {
  fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  fn remote(&self, name: &str) -> CutResult<RemoteInfo> {
    let url = self
      .get_remote_url(name)?
      .ok_or_else(|| CutError::Git(GitError::RemoteNotFound { name: name.to_string() }))?;

    utils::parse_remote_url(&url).ok_or(CutError::Config(ConfigError::UnsupportedRemote { url }))
  }

  fn current_branch(&self) -> CutResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok("HEAD".to_string()); // Detached HEAD or unborn branch
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  fn status(&self) -> CutResult<String> {
    self.run(&["status", "--porcelain"])
  }

  fn pull(&self) -> CutResult<()> {
    let branch = self.current_branch()?;
    self.fetch_from_remote(&self.remote)?;
    self.run(&["merge", "--ff-only", &format!("{}/{}", self.remote, branch)])?;
    Ok(())
  }

  fn add(&self, paths: &[PathBuf]) -> CutResult<()> {
    let mut cmd = self.git_cmd();
    cmd.arg("add").arg("--");
    for path in paths {
      cmd.arg(utils::path_to_git_format(path));
    }

    let output = cmd.output().context("Failed to run git add")?;
    if !output.status.success() {
      return Err(CutError::Git(GitError::CommandFailed {
        command: "git add".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }
    Ok(())
  }

  fn commit(&self, message: &str) -> CutResult<()> {
    self.run(&["commit", "-m", message])?;
    Ok(())
  }

  fn tag(&self, name: &str, target: Option<&str>, message: &str) -> CutResult<()> {
    let mut args = vec!["tag", "-a", name, "-m", message];
    if let Some(sha) = target {
      args.push(sha);
    }
    self.run(&args)?;
    Ok(())
  }

  fn push(&self) -> CutResult<()> {
    self.push_refspec("HEAD", false)
  }

  fn push_tag(&self, name: &str) -> CutResult<()> {
    self.push_refspec(&format!("refs/tags/{}", name), false)
  }

  fn push_branch(&self, name: &str, force: bool) -> CutResult<()> {
    self.push_refspec(&format!("refs/heads/{}", name), force)
  }

  fn delete_branch(&self, name: &str) -> CutResult<()> {
    self.run(&["branch", "-D", name])?;
    Ok(())
  }

  fn checkout(&self, name: &str, create: bool) -> CutResult<()> {
    if create {
      self.create_and_checkout_branch(name)
    } else {
      self.checkout_branch(name)
    }
  }

  fn head_commit(&self) -> CutResult<String> {
    self.run(&["rev-parse", "HEAD"])
  }

  fn tag_commit(&self, name: &str) -> CutResult<Option<String>> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet"])
      .arg(format!("refs/tags/{}^{{commit}}", name))
      .output()
      .context("Failed to resolve tag")?;

    // --quiet exits non-zero without output when the ref is missing
    if !output.status.success() {
      return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
  }

  fn latest_version_tag(&self) -> CutResult<Option<String>> {
    // An unborn HEAD has no tags
    if self.run(&["rev-parse", "--verify", "--quiet", "HEAD"]).is_err() {
      return Ok(None);
    }

    let stdout = self.run(&["tag", "--merged", "HEAD", "--list", "v*"])?;
    let latest = stdout
      .lines()
      .map(str::trim)
      .filter_map(|tag| {
        let version = semver::Version::parse(tag.strip_prefix('v')?).ok()?;
        Some((version, tag))
      })
      .max_by(|a, b| a.0.cmp(&b.0))
      .map(|(_, tag)| tag.to_string());

    Ok(latest)
  }

  fn commits_since(&self, since: Option<&str>) -> CutResult<Vec<CommitInfo>> {
    let shas = self.get_commits_since(since)?;
    self.get_commits(&shas)
  }
}
