//! Entry point of one release invocation

use super::direct::DirectReleaseStrategy;
use super::indirect::IndirectReleaseStrategy;
use super::locator::DraftReleaseLocator;
use super::preflight::RepoStateValidator;
use super::version::{BumpFlags, ResolvedVersion, VersionResolver};
use super::{Collaborators, ReleaseOutcome, ReleaseStrategy};
use crate::changelog::ChangelogSpec;
use crate::core::config::{CutConfig, ReleaseMode};
use crate::core::context::{Deadline, ReleaseContext};
use crate::core::error::CutResult;
use crate::ui::output;

/// What the user asked for on the command line
#[derive(Debug, Clone, Default)]
pub struct ReleaseRequest {
  pub flags: BumpFlags,
  pub mode: ReleaseMode,
  /// Prefixed to the published release notes
  pub comment: Option<String>,
  /// Stop after printing the plan
  pub dry_run: bool,
}

/// Runs preflight and version resolution, then hands over to a strategy
pub struct ReleaseOrchestrator {
  collaborators: Collaborators,
  config: CutConfig,
  owner: String,
  repo: String,
}

impl ReleaseOrchestrator {
  pub fn new(collaborators: Collaborators, config: CutConfig, owner: impl Into<String>, repo: impl Into<String>) -> Self {
    Self {
      collaborators,
      config,
      owner: owner.into(),
      repo: repo.into(),
    }
  }

  /// Run one release invocation under the configured deadline
  pub fn run(&self, request: &ReleaseRequest) -> CutResult<ReleaseOutcome> {
    self.run_until(request, Deadline::new(self.config.release.timeout()))
  }

  pub(crate) fn run_until(&self, request: &ReleaseRequest, deadline: Deadline) -> CutResult<ReleaseOutcome> {
    tracing::info!(
      repository = %format!("{}/{}", self.owner, self.repo),
      mode = %request.mode,
      timeout_secs = deadline.limit().as_secs(),
      "starting release"
    );

    deadline.check("preflight")?;
    output::step("Checking repository state");
    let default_branch =
      RepoStateValidator::new(self.collaborators.vcs.clone(), self.collaborators.hosting.clone()).validate()?;

    deadline.check("resolve version")?;
    let resolved = self.resolve_version(request.flags)?;

    let ctx = self.context(&resolved, default_branch, request.comment.clone(), deadline);

    if request.dry_run {
      self.print_plan(request.mode, &resolved, &ctx);
      return Ok(ReleaseOutcome::DryRun);
    }

    let strategy: Box<dyn ReleaseStrategy> = match request.mode {
      ReleaseMode::Direct => Box::new(DirectReleaseStrategy::new(self.collaborators.clone())),
      ReleaseMode::Indirect => Box::new(IndirectReleaseStrategy::new(
        self.collaborators.clone(),
        &self.owner,
        &self.repo,
      )),
    };

    let outcome = strategy.execute(&ctx)?;
    tracing::info!(
      outcome = %outcome,
      remaining_secs = ctx.deadline.remaining().as_secs(),
      "release invocation finished"
    );
    Ok(outcome)
  }

  /// Next version, or the latest tagged one when its release is still a draft
  ///
  /// A tag only counts as released once its draft is published. A pending
  /// draft for the latest tag is a release an earlier run left unfinished,
  /// and it is resumed whatever bump was asked for.
  fn resolve_version(&self, flags: BumpFlags) -> CutResult<ResolvedVersion> {
    let resolved = VersionResolver::new(self.collaborators.versions.clone()).resolve(flags)?;
    if resolved.current.is_initial() {
      output::step(format!("Releasing {} (first release)", resolved.next));
      return Ok(resolved);
    }

    let tag = resolved.current.tag_name();
    match DraftReleaseLocator::new(self.collaborators.hosting.clone()).find_optional(&tag)? {
      Some(draft) => {
        tracing::info!(%tag, draft_id = draft.id, requested = %resolved.next, "resuming unpublished release");
        output::step(format!("Resuming unpublished release {} (draft id {})", tag, draft.id));
        Ok(resolved.resume())
      }
      None => {
        output::step(format!("Releasing {} (current {})", resolved.next, resolved.current));
        Ok(resolved)
      }
    }
  }

  fn context(
    &self,
    resolved: &ResolvedVersion,
    default_branch: String,
    comment: Option<String>,
    deadline: Deadline,
  ) -> ReleaseContext {
    let previous_tag = (!resolved.current.is_initial()).then(|| resolved.current.tag_name());
    let changelog = ChangelogSpec::new(
      self.config.release.changelog.clone(),
      resolved.next.tag_name(),
      previous_tag,
    );

    ReleaseContext::new(
      resolved.next.clone(),
      &self.owner,
      &self.repo,
      default_branch,
      changelog,
      comment,
      deadline,
    )
  }

  fn print_plan(&self, mode: ReleaseMode, resolved: &ResolvedVersion, ctx: &ReleaseContext) {
    output::step("Release plan (dry run)");
    output::detail(format!("repository:     {}/{}", ctx.owner, ctx.repo));
    output::detail(format!("mode:           {}", mode));
    output::detail(format!("current:        {}", resolved.current));
    output::detail(format!("next:           {}", resolved.next));
    if resolved.resumed {
      output::detail("resuming:       unpublished draft found for the latest tag");
    }
    output::detail(format!("tag:            {}", ctx.tag()));
    output::detail(format!("default branch: {}", ctx.default_branch));
    if mode == ReleaseMode::Indirect {
      output::detail(format!("release branch: {}", ctx.release_branch));
      output::detail(format!("pull request:   {}", ctx.pr_title()));
    }
    output::detail(format!("changelog:      {}", ctx.changelog.path.display()));
    output::detail(format!(
      "artifacts:      {}",
      if self.collaborators.builder.probe() { "yes" } else { "none" }
    ));
  }
}
