//! Direct release: tag and push straight to the default branch
//!
//! `CheckPermission → CreateDraftRelease → GenerateChangelog → CreateCommitAndTag
//! → BuildAndUploadArtifacts? → [protection relaxed: PushCommitAndTag → PublishRelease]`
//!
//! A failure before publishing leaves a draft release and a local tag behind.
//! Re-running resumes that release: the draft is reused, and when the tag
//! already sits on HEAD the committed changelog section is published as is.

use super::locator::DraftReleaseLocator;
use super::protection::with_protection_relaxed;
use super::publisher::ArtifactPublisher;
use super::{Collaborators, ReleaseOutcome, ReleaseStrategy, build_and_upload};
use crate::core::context::ReleaseContext;
use crate::core::error::{CutError, CutResult, StateError};
use crate::hosting::{HostedRelease, ReleaseParams};
use crate::ui::output;

pub struct DirectReleaseStrategy {
  collaborators: Collaborators,
  locator: DraftReleaseLocator,
  publisher: ArtifactPublisher,
}

impl DirectReleaseStrategy {
  pub fn new(collaborators: Collaborators) -> Self {
    let locator = DraftReleaseLocator::new(collaborators.hosting.clone());
    let publisher = ArtifactPublisher::new(collaborators.hosting.clone());
    Self {
      collaborators,
      locator,
      publisher,
    }
  }

  /// Admin permission is needed to lift branch protection
  fn check_permission(&self) -> CutResult<()> {
    let hosting = &self.collaborators.hosting;
    let user = hosting.get_current_user()?;
    let permission = hosting.get_permission(&user.login)?;
    if !permission.is_admin() {
      return Err(CutError::State(StateError::InsufficientPermission {
        user: user.login,
        permission: permission.permission,
      }));
    }
    Ok(())
  }

  /// Reuse a draft left by an earlier attempt, or create one
  fn prepare_draft(&self, ctx: &ReleaseContext) -> CutResult<HostedRelease> {
    let tag = ctx.tag();
    let params = ReleaseParams::draft(&tag, &ctx.default_branch, "");

    match self.locator.find_optional(&tag)? {
      Some(existing) => {
        output::detail(format!("Reusing draft release {} (id {})", tag, existing.id));
        self.collaborators.hosting.update_release(existing.id, &params)
      }
      None => self.collaborators.hosting.create_release(&params),
    }
  }

  /// Commit the changelog and tag HEAD, or pick up the commit and tag an earlier run made
  fn commit_and_tag(&self, ctx: &ReleaseContext) -> CutResult<String> {
    let vcs = &self.collaborators.vcs;
    let tag = ctx.tag();

    if let Some(tagged) = vcs.tag_commit(&tag)? {
      let head = vcs.head_commit()?;
      if tagged != head {
        return Err(CutError::State(StateError::TagMismatch {
          tag,
          expected: head,
          found: tagged,
        }));
      }

      output::step(format!("Resuming {}: tag already on HEAD", tag));
      return self.collaborators.changelog.committed(&ctx.changelog)?.ok_or_else(|| {
        CutError::Changelog(format!(
          "no section for {} in {}",
          tag,
          ctx.changelog.path.display()
        ))
      });
    }

    ctx.check_deadline("generate changelog")?;
    output::step("Generating changelog");
    let notes = self.collaborators.changelog.generate(&ctx.changelog)?;

    ctx.check_deadline("commit and tag")?;
    output::step(format!("Committing and tagging {}", tag));
    vcs.add(std::slice::from_ref(&ctx.changelog.path))?;
    vcs.commit(&ctx.commit_message())?;
    vcs.tag(&tag, None, &ctx.commit_message())?;
    Ok(notes)
  }
}

impl ReleaseStrategy for DirectReleaseStrategy {
  fn execute(&self, ctx: &ReleaseContext) -> CutResult<ReleaseOutcome> {
    let vcs = &self.collaborators.vcs;
    let hosting = &self.collaborators.hosting;
    let tag = ctx.tag();

    ctx.check_deadline("check permission")?;
    output::step("Checking repository permission");
    self.check_permission()?;

    ctx.check_deadline("create draft release")?;
    output::step(format!("Creating draft release {}", tag));
    let draft = self.prepare_draft(ctx)?;

    let notes = self.commit_and_tag(ctx)?;

    build_and_upload(&self.collaborators, &self.publisher, ctx, draft.id)?;

    ctx.check_deadline("push release")?;
    with_protection_relaxed(hosting, &ctx.default_branch, || {
      output::step(format!("Pushing {} and {}", ctx.default_branch, tag));
      vcs.push()?;
      vcs.push_tag(&tag)?;

      ctx.check_deadline("publish release")?;
      output::step(format!("Publishing release {}", tag));
      hosting.update_release(draft.id, &ReleaseParams::publish(&ctx.release_notes(&notes)))?;
      Ok(())
    })?;

    Ok(ReleaseOutcome::Published { tag })
  }
}
