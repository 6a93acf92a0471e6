//! `cargo cut release`
//!
//! Wires the production collaborators (system git, the GitHub REST client,
//! the conventional-commit changelog and the cargo builder) into a
//! [`ReleaseOrchestrator`] and reports how the invocation ended.

use crate::build::CargoBuilder;
use crate::changelog::ConventionalChangelog;
use crate::core::config::{CutConfig, ReleaseMode, github_token};
use crate::core::error::CutResult;
use crate::core::vcs::{SystemGit, Vcs};
use crate::hosting::GitHubClient;
use crate::release::version::{BumpFlags, BumpKind, GitTagVersionSource};
use crate::release::{Collaborators, ReleaseOrchestrator, ReleaseOutcome, ReleaseRequest};
use crate::ui::output;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Per-request HTTP timeout; the invocation deadline bounds the total
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Release command arguments as parsed by clap
#[derive(Debug, Clone, Default)]
pub struct ReleaseArgs {
  pub flags: BumpFlags,
  pub comment: Option<String>,
  pub mode: Option<String>,
  pub dry_run: bool,
}

/// Run the release command
pub fn run_release(args: ReleaseArgs) -> CutResult<()> {
  let workspace_root = env::current_dir()?;
  let config = CutConfig::load(&workspace_root)?;

  // Mode and credentials are validated before anything touches git or GitHub
  let mode = config.release_mode(args.mode.as_deref())?;
  let token = github_token()?;

  let git = Arc::new(SystemGit::open(&workspace_root, config.release.remote.clone())?);
  let remote = git.remote(&config.release.remote)?;
  let (owner, repo) = remote.owner_repo()?;
  tracing::debug!(domain = %remote.domain, owner = %owner, repo = %repo, "resolved release remote");

  let vcs: Arc<dyn Vcs> = git.clone();
  let collaborators = Collaborators {
    vcs: vcs.clone(),
    hosting: Arc::new(GitHubClient::for_remote(&remote, token, REQUEST_TIMEOUT)?),
    changelog: Arc::new(ConventionalChangelog::new(vcs.clone())),
    builder: Arc::new(CargoBuilder::new(git.work_tree(), config.build.clone())),
    versions: Arc::new(GitTagVersionSource::new(vcs)),
  };

  let request = ReleaseRequest {
    flags: args.flags,
    mode,
    comment: args.comment,
    dry_run: args.dry_run,
  };

  let outcome = ReleaseOrchestrator::new(collaborators, config, owner, repo).run(&request)?;
  report(&outcome, &rerun_command(request.flags, mode));
  Ok(())
}

/// The invocation that picks this release up again
///
/// The bump must match: a different flag resolves another version and with
/// it another pull request title.
fn rerun_command(flags: BumpFlags, mode: ReleaseMode) -> String {
  let bump = match flags.kind() {
    BumpKind::Major => "--major",
    BumpKind::Minor => "--minor",
    BumpKind::Patch => "--patch",
  };
  format!("cargo cut release {} --mode {}", bump, mode)
}

fn report(outcome: &ReleaseOutcome, rerun: &str) {
  println!();
  output::success(outcome.to_string());
  match outcome {
    ReleaseOutcome::PullRequestOpened { .. } | ReleaseOutcome::PullRequestUpdated { .. } => {
      output::detail(format!("Merge the pull request, then run `{}` to publish.", rerun));
    }
    ReleaseOutcome::DryRun => {
      output::detail(format!("Run `{}` to release.", rerun));
    }
    ReleaseOutcome::Published { .. } => {}
  }
}
