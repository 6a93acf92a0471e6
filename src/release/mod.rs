//! Release orchestration
//!
//! # Flow
//!
//! ```text
//! cargo cut release
//!   -> ReleaseOrchestrator::run()
//!        preflight (RepoStateValidator)
//!        version   (VersionResolver)
//!        strategy.execute(&ReleaseContext)
//!          direct:   permission, draft, changelog, commit+tag, artifacts,
//!                    [protection relaxed: push, publish]
//!          indirect: merged PR?  -> tag merge commit, artifacts, publish
//!                    otherwise   -> release branch, PR + draft (create or update)
//! ```
//!
//! A release is re-run to recover from a failure; nothing is persisted
//! between invocations except what lives in git and on GitHub.

pub mod direct;
pub mod indirect;
pub mod locator;
pub mod orchestrator;
pub mod preflight;
pub mod protection;
pub mod publisher;
pub mod version;

pub use orchestrator::{ReleaseOrchestrator, ReleaseRequest};

use crate::build::Builder;
use crate::changelog::ChangelogGenerator;
use crate::core::context::ReleaseContext;
use crate::core::error::CutResult;
use crate::core::vcs::Vcs;
use crate::hosting::Hosting;
use std::fmt;
use std::sync::Arc;
use version::VersionSource;

/// Every external system the release workflow talks to
#[derive(Clone)]
pub struct Collaborators {
  pub vcs: Arc<dyn Vcs>,
  pub hosting: Arc<dyn Hosting>,
  pub changelog: Arc<dyn ChangelogGenerator>,
  pub builder: Arc<dyn Builder>,
  pub versions: Arc<dyn VersionSource>,
}

/// How an invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
  /// The release is public
  Published { tag: String },
  /// A review pull request was opened; merge it and re-run
  PullRequestOpened { number: u64, url: String },
  /// An open review pull request was refreshed; merge it and re-run
  PullRequestUpdated { number: u64, url: String },
  /// Nothing was changed
  DryRun,
}

impl fmt::Display for ReleaseOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseOutcome::Published { tag } => write!(f, "Released {}", tag),
      ReleaseOutcome::PullRequestOpened { number, url } => {
        write!(f, "Opened release pull request #{} {}", number, url)
      }
      ReleaseOutcome::PullRequestUpdated { number, url } => {
        write!(f, "Updated release pull request #{} {}", number, url)
      }
      ReleaseOutcome::DryRun => write!(f, "Dry run complete, nothing changed"),
    }
  }
}

/// One of the two release workflows
pub trait ReleaseStrategy {
  fn execute(&self, ctx: &ReleaseContext) -> CutResult<ReleaseOutcome>;
}

/// Build artifacts and attach them to `release_id`, if the project has any
pub(crate) fn build_and_upload(
  collaborators: &Collaborators,
  publisher: &publisher::ArtifactPublisher,
  ctx: &ReleaseContext,
  release_id: u64,
) -> CutResult<()> {
  if !collaborators.builder.probe() {
    tracing::debug!("no buildable binaries, skipping artifacts");
    return Ok(());
  }

  ctx.check_deadline("build artifacts")?;
  crate::ui::output::step("Building release artifacts");
  collaborators.builder.run(ctx)?;

  ctx.check_deadline("upload artifacts")?;
  let artifacts = ctx.artifacts();
  crate::ui::output::step(format!("Uploading {} artifact(s)", artifacts.len()));
  publisher.upload(release_id, &artifacts)
}
