//! Error types for cargo-cut with contextual messages and exit codes
//!
//! Every failure class of the release workflow maps to its own exit code so
//! scripts can tell a dirty working copy from a GitHub outage. Errors carry an
//! optional help hint that is printed under the error line.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Exit codes for cargo-cut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Unclassified failure (also used for deadline expiry)
  Generic = 1,
  /// Invalid configuration or missing credentials
  Config = 2,
  /// Invalid release specification (unknown release mode)
  Spec = 3,
  /// Repository is not in a releasable state
  Preflight = 4,
  /// Local git invocation failed
  Vcs = 5,
  /// GitHub API call failed
  Hosting = 6,
  /// Changelog generation failed
  Changelog = 7,
  /// Build subsystem or filesystem failure
  Os = 8,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for cargo-cut
#[derive(Debug)]
pub enum CutError {
  /// Configuration errors
  Config(ConfigError),

  /// Local repository is not releasable
  State(StateError),

  /// Git operation errors
  Git(GitError),

  /// GitHub API errors
  Hosting(HostingError),

  /// Changelog generation errors
  Changelog(String),

  /// Build subsystem errors
  Build(BuildError),

  /// I/O errors
  Io(io::Error),

  /// The invocation deadline expired before `step` could start
  Timeout { step: String, limit: Duration },

  /// Branch protection could not be restored after it was relaxed
  Compensation {
    branch: String,
    restore: Box<CutError>,
    original: Option<Box<CutError>>,
  },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl CutError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    CutError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      CutError::Message { message, context, help } => CutError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      CutError::Config(ConfigError::InvalidMode { .. }) => ExitCode::Spec,
      CutError::Config(_) => ExitCode::Config,
      CutError::State(_) => ExitCode::Preflight,
      CutError::Git(_) => ExitCode::Vcs,
      CutError::Hosting(_) => ExitCode::Hosting,
      CutError::Changelog(_) => ExitCode::Changelog,
      CutError::Build(_) | CutError::Io(_) => ExitCode::Os,
      CutError::Timeout { .. } | CutError::Message { .. } => ExitCode::Generic,
      CutError::Compensation { restore, original, .. } => original.as_deref().unwrap_or(restore.as_ref()).exit_code(),
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      CutError::Config(e) => e.help_message(),
      CutError::State(e) => e.help_message(),
      CutError::Git(e) => e.help_message(),
      CutError::Hosting(e) => e.help_message(),
      CutError::Timeout { .. } => Some("Re-run the command; completed steps are picked up where they left off.".to_string()),
      CutError::Compensation { branch, .. } => Some(format!(
        "Admin enforcement on '{}' is still DISABLED. Re-enable it in the repository settings (Branches → {}).",
        branch, branch
      )),
      CutError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for CutError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CutError::Config(e) => write!(f, "{}", e),
      CutError::State(e) => write!(f, "{}", e),
      CutError::Git(e) => write!(f, "{}", e),
      CutError::Hosting(e) => write!(f, "{}", e),
      CutError::Changelog(msg) => write!(f, "Changelog generation failed: {}", msg),
      CutError::Build(e) => write!(f, "{}", e),
      CutError::Io(e) => write!(f, "I/O error: {}", e),
      CutError::Timeout { step, limit } => {
        write!(f, "Release timed out after {}s (before step: {})", limit.as_secs(), step)
      }
      CutError::Compensation {
        branch,
        restore,
        original,
      } => {
        write!(f, "Failed to re-enable branch protection on '{}': {}", branch, restore)?;
        if let Some(original) = original {
          write!(f, "\nThe release itself failed first: {}", original)?;
        }
        Ok(())
      }
      CutError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for CutError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      CutError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for CutError {
  fn from(err: io::Error) -> Self {
    CutError::Io(err)
  }
}

impl From<String> for CutError {
  fn from(msg: String) -> Self {
    CutError::message(msg)
  }
}

impl From<&str> for CutError {
  fn from(msg: &str) -> Self {
    CutError::message(msg)
  }
}

impl From<ConfigError> for CutError {
  fn from(err: ConfigError) -> Self {
    CutError::Config(err)
  }
}

impl From<StateError> for CutError {
  fn from(err: StateError) -> Self {
    CutError::State(err)
  }
}

impl From<GitError> for CutError {
  fn from(err: GitError) -> Self {
    CutError::Git(err)
  }
}

impl From<HostingError> for CutError {
  fn from(err: HostingError) -> Self {
    CutError::Hosting(err)
  }
}

impl From<BuildError> for CutError {
  fn from(err: BuildError) -> Self {
    CutError::Build(err)
  }
}

impl From<toml_edit::de::Error> for CutError {
  fn from(err: toml_edit::de::Error) -> Self {
    CutError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for CutError {
  fn from(err: serde_json::Error) -> Self {
    CutError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for CutError {
  fn from(err: semver::Error) -> Self {
    CutError::message(format!("Version parse error: {}", err))
  }
}

impl From<cargo_metadata::Error> for CutError {
  fn from(err: cargo_metadata::Error) -> Self {
    CutError::Build(BuildError::Metadata {
      reason: err.to_string(),
    })
  }
}

impl From<std::string::FromUtf8Error> for CutError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    CutError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// No GitHub token in the environment
  MissingToken,

  /// Unknown release mode
  InvalidMode { value: String },

  /// Config file present but unusable
  Invalid { path: PathBuf, reason: String },

  /// Remote URL does not point at a GitHub-shaped host
  UnsupportedRemote { url: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::MissingToken => Some(
        "Export a token with `repo` scope: export GITHUB_TOKEN=<token> (GH_TOKEN is also accepted).".to_string(),
      ),
      ConfigError::InvalidMode { .. } => Some("Use --mode direct or --mode indirect.".to_string()),
      ConfigError::UnsupportedRemote { .. } => {
        Some("Point the release remote at a GitHub repository (git remote set-url origin ...).".to_string())
      }
      ConfigError::Invalid { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::MissingToken => write!(f, "No GitHub token found (GITHUB_TOKEN / GH_TOKEN not set)"),
      ConfigError::InvalidMode { value } => {
        write!(f, "Invalid release mode '{}'. Must be 'direct' or 'indirect'", value)
      }
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
      ConfigError::UnsupportedRemote { url } => write!(f, "Unsupported remote URL: {}", url),
    }
  }
}

/// Local repository state errors (preflight)
#[derive(Debug)]
pub enum StateError {
  /// HEAD is not on the repository's default branch
  NotOnDefaultBranch { current: String, default: String },

  /// Working copy has uncommitted changes
  DirtyWorkingCopy { status: String },

  /// Authenticated user lacks admin permission
  InsufficientPermission { user: String, permission: String },

  /// An existing release tag points somewhere other than expected
  TagMismatch { tag: String, expected: String, found: String },
}

impl StateError {
  fn help_message(&self) -> Option<String> {
    match self {
      StateError::NotOnDefaultBranch { default, .. } => Some(format!("Switch branches first: git checkout {}", default)),
      StateError::DirtyWorkingCopy { .. } => Some("Commit or stash your changes before releasing.".to_string()),
      StateError::InsufficientPermission { .. } => Some(
        "Direct releases temporarily lift branch protection, which requires admin access. Use --mode indirect instead."
          .to_string(),
      ),
      StateError::TagMismatch { tag, .. } => Some(format!(
        "Inspect the tag with `git show {}`; delete it with `git tag -d {}` if it is stale.",
        tag, tag
      )),
    }
  }
}

impl fmt::Display for StateError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StateError::NotOnDefaultBranch { current, default } => {
        write!(f, "Not on default branch: on '{}', expected '{}'", current, default)
      }
      StateError::DirtyWorkingCopy { status } => write!(f, "Dirty working copy:\n{}", status),
      StateError::InsufficientPermission { user, permission } => {
        write!(f, "User '{}' has '{}' permission; 'admin' is required", user, permission)
      }
      StateError::TagMismatch { tag, expected, found } => {
        write!(f, "Tag '{}' points at {}, expected {}", tag, found, expected)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Remote not configured
  RemoteNotFound { name: String },

  /// Push failed
  PushFailed {
    remote: String,
    refspec: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") {
          Some("The remote has commits you don't have. Pull and re-run the release.".to_string())
        } else if reason.contains("protected branch") {
          Some("The default branch rejected the push. Check the branch protection rules.".to_string())
        } else if reason.contains("permission denied") || reason.contains("403") {
          Some("Check your git credentials for the release remote.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!("Run cargo cut from inside a git repository: {}", path.display())),
      GitError::RemoteNotFound { name } => Some(format!("Add the remote first: git remote add {} <url>", name)),
      GitError::CommandFailed { .. } => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::RemoteNotFound { name } => write!(f, "Git remote '{}' not found", name),
      GitError::PushFailed { remote, refspec, reason } => {
        write!(f, "Push of {} to {} failed: {}", refspec, remote, reason)
      }
    }
  }
}

/// GitHub API errors
#[derive(Debug)]
pub enum HostingError {
  /// Request never produced a response (network, TLS, timeout)
  Request { method: String, url: String, reason: String },

  /// Non-success status code
  Status {
    method: String,
    url: String,
    status: u16,
    message: String,
  },

  /// Response body had an unexpected shape
  Decode { url: String, reason: String },

  /// No draft release exists for a tag that should have one
  DraftReleaseNotFound { tag: String },

  /// A pull request reported as merged has no merge commit
  MissingMergeCommit { number: u64 },
}

impl HostingError {
  fn help_message(&self) -> Option<String> {
    match self {
      HostingError::Status { status: 401, .. } => Some("The GitHub token was rejected. Check GITHUB_TOKEN.".to_string()),
      HostingError::Status { status: 403, .. } | HostingError::Status { status: 404, .. } => {
        Some("Check that the token has `repo` scope and access to this repository.".to_string())
      }
      HostingError::DraftReleaseNotFound { tag } => Some(format!(
        "The draft release for {} was removed out-of-band. Recreate it or close the release pull request and re-run.",
        tag
      )),
      _ => None,
    }
  }
}

impl fmt::Display for HostingError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HostingError::Request { method, url, reason } => write!(f, "GitHub request {} {} failed: {}", method, url, reason),
      HostingError::Status {
        method,
        url,
        status,
        message,
      } => write!(f, "GitHub request {} {} returned {}: {}", method, url, status, message),
      HostingError::Decode { url, reason } => write!(f, "Unexpected GitHub response from {}: {}", url, reason),
      HostingError::DraftReleaseNotFound { tag } => write!(f, "No draft release found for tag {}", tag),
      HostingError::MissingMergeCommit { number } => {
        write!(f, "Pull request #{} is merged but has no merge commit", number)
      }
    }
  }
}

/// Build subsystem errors
#[derive(Debug)]
pub enum BuildError {
  /// cargo build failed for a target
  CommandFailed { target: String, stderr: String },

  /// cargo metadata could not be read
  Metadata { reason: String },

  /// Build succeeded but the expected binary is missing
  ArtifactMissing { path: PathBuf },
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::CommandFailed { target, stderr } => write!(f, "Build for {} failed:\n{}", target, stderr),
      BuildError::Metadata { reason } => write!(f, "Cargo metadata error: {}", reason),
      BuildError::ArtifactMissing { path } => write!(f, "Build artifact missing: {}", path.display()),
    }
  }
}

/// Result type alias for cargo-cut
pub type CutResult<T> = Result<T, CutError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> CutResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> CutResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<CutError>,
{
  fn context(self, ctx: impl Into<String>) -> CutResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> CutResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &CutError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
