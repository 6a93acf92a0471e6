//! Indirect release: route the release commit through a pull request
//!
//! Every invocation starts from scratch and works out where the release
//! stands from GitHub alone. The pull request title `RELEASE {version}` is the
//! key tying invocations together:
//!
//! ```text
//! merged PR  -> tag merge commit, push tag, artifacts, publish draft
//! open PR    -> refresh release branch, update PR and draft
//! neither    -> push release branch, open PR, create draft
//! ```

use super::locator::{DraftReleaseLocator, PullRequestLocator};
use super::publisher::ArtifactPublisher;
use super::{Collaborators, ReleaseOutcome, ReleaseStrategy, build_and_upload};
use crate::core::context::ReleaseContext;
use crate::core::error::{CutError, CutResult, HostingError, StateError};
use crate::hosting::{IssueHit, PrState, PullRequestParams, ReleaseParams};
use crate::ui::output;

pub struct IndirectReleaseStrategy {
  collaborators: Collaborators,
  drafts: DraftReleaseLocator,
  pull_requests: PullRequestLocator,
  publisher: ArtifactPublisher,
}

impl IndirectReleaseStrategy {
  pub fn new(collaborators: Collaborators, owner: &str, repo: &str) -> Self {
    let hosting = collaborators.hosting.clone();
    Self {
      drafts: DraftReleaseLocator::new(hosting.clone()),
      pull_requests: PullRequestLocator::new(hosting.clone(), owner, repo),
      publisher: ArtifactPublisher::new(hosting),
      collaborators,
    }
  }

  /// The review pull request was merged: tag its merge commit and publish
  fn finish(&self, ctx: &ReleaseContext, merged: IssueHit) -> CutResult<ReleaseOutcome> {
    let vcs = &self.collaborators.vcs;
    let hosting = &self.collaborators.hosting;
    let tag = ctx.tag();

    ctx.check_deadline("fetch merged pull request")?;
    output::step(format!("Finishing release from merged pull request #{}", merged.number));
    let pr = hosting.get_pull_request(merged.number)?;
    let sha = pr
      .merge_commit_sha
      .filter(|sha| !sha.is_empty())
      .ok_or(CutError::Hosting(HostingError::MissingMergeCommit { number: pr.number }))?;

    ctx.check_deadline("locate draft release")?;
    let draft = self.drafts.find(&tag)?;

    ctx.check_deadline("tag merge commit")?;
    match vcs.tag_commit(&tag)? {
      None => {
        output::step(format!("Tagging {} at {}", tag, short_sha(&sha)));
        vcs.tag(&tag, Some(&sha), &ctx.commit_message())?;
      }
      Some(tagged) if tagged == sha => output::detail(format!("{} already tags {}", tag, short_sha(&sha))),
      Some(tagged) => {
        return Err(CutError::State(StateError::TagMismatch {
          tag,
          expected: sha,
          found: tagged,
        }));
      }
    }

    ctx.check_deadline("push tag")?;
    vcs.push_tag(&tag)?;

    self.build_at(ctx, &sha, draft.id)?;

    ctx.check_deadline("publish release")?;
    output::step(format!("Publishing release {}", tag));
    let notes = ctx.release_notes(draft.body.as_deref().unwrap_or_default());
    let params = ReleaseParams {
      target_commitish: Some(sha),
      ..ReleaseParams::publish(&notes)
    };
    hosting.update_release(draft.id, &params)?;

    Ok(ReleaseOutcome::Published { tag })
  }

  /// Build and upload artifacts from the merge commit
  ///
  /// The default branch may have moved on since the merge; the work tree is
  /// then switched to the merge commit for the build and back afterwards.
  fn build_at(&self, ctx: &ReleaseContext, sha: &str, release_id: u64) -> CutResult<()> {
    let vcs = &self.collaborators.vcs;
    if !self.collaborators.builder.probe() || vcs.head_commit()? == sha {
      return build_and_upload(&self.collaborators, &self.publisher, ctx, release_id);
    }

    output::step(format!("Checking out merge commit {} to build", short_sha(sha)));
    vcs.checkout(sha, false)?;
    let built = build_and_upload(&self.collaborators, &self.publisher, ctx, release_id);
    let back = vcs.checkout(&ctx.default_branch, false);

    match (built, back) {
      (Err(e), Err(back)) => {
        output::warning(format!("Could not switch back to {}: {}", ctx.default_branch, back));
        Err(e)
      }
      (built, back) => built.and(back),
    }
  }

  /// Commit the changelog on a fresh release branch and force-push it
  ///
  /// The local branch is removed again and HEAD ends back on the default
  /// branch, also when a step in between fails.
  fn push_release_branch(&self, ctx: &ReleaseContext) -> CutResult<String> {
    let vcs = &self.collaborators.vcs;

    ctx.check_deadline("generate changelog")?;
    output::step("Generating changelog");
    let notes = self.collaborators.changelog.generate(&ctx.changelog)?;

    ctx.check_deadline("push release branch")?;
    output::step(format!("Pushing branch {}", ctx.release_branch));
    vcs.checkout(&ctx.release_branch, true)?;

    let pushed = vcs
      .add(std::slice::from_ref(&ctx.changelog.path))
      .and_then(|()| vcs.commit(&ctx.commit_message()))
      .and_then(|()| vcs.push_branch(&ctx.release_branch, true));

    if let Err(e) = pushed {
      if let Err(back) = vcs.checkout(&ctx.default_branch, false) {
        output::warning(format!("Could not switch back to {}: {}", ctx.default_branch, back));
      }
      return Err(e);
    }

    vcs.checkout(&ctx.default_branch, false)?;
    vcs.delete_branch(&ctx.release_branch)?;
    Ok(notes)
  }

  fn open_pull_request(&self, ctx: &ReleaseContext, notes: &str) -> CutResult<ReleaseOutcome> {
    let hosting = &self.collaborators.hosting;

    ctx.check_deadline("create pull request")?;
    output::step(format!("Opening pull request '{}'", ctx.pr_title()));
    let pr = hosting.create_pull_request(&PullRequestParams {
      title: Some(ctx.pr_title()),
      body: Some(ctx.release_notes(notes)),
      head: Some(ctx.release_branch.clone()),
      base: Some(ctx.default_branch.clone()),
    })?;

    ctx.check_deadline("create draft release")?;
    output::step(format!("Creating draft release {}", ctx.tag()));
    hosting.create_release(&ReleaseParams::draft(&ctx.tag(), &ctx.default_branch, notes))?;

    Ok(ReleaseOutcome::PullRequestOpened {
      number: pr.number,
      url: pr.html_url,
    })
  }

  fn update_pull_request(&self, ctx: &ReleaseContext, open: IssueHit, notes: &str) -> CutResult<ReleaseOutcome> {
    let hosting = &self.collaborators.hosting;

    ctx.check_deadline("update pull request")?;
    output::step(format!("Updating pull request #{}", open.number));
    let pr = hosting.update_pull_request(
      open.number,
      &PullRequestParams {
        title: Some(ctx.pr_title()),
        body: Some(ctx.release_notes(notes)),
        ..Default::default()
      },
    )?;

    ctx.check_deadline("update draft release")?;
    let draft = self.drafts.find(&ctx.tag())?;
    output::step(format!("Updating draft release {}", ctx.tag()));
    hosting.update_release(
      draft.id,
      &ReleaseParams {
        body: Some(notes.to_string()),
        ..Default::default()
      },
    )?;

    Ok(ReleaseOutcome::PullRequestUpdated {
      number: pr.number,
      url: pr.html_url,
    })
  }
}

impl ReleaseStrategy for IndirectReleaseStrategy {
  fn execute(&self, ctx: &ReleaseContext) -> CutResult<ReleaseOutcome> {
    let title = ctx.pr_title();

    ctx.check_deadline("search merged pull request")?;
    output::step(format!("Looking for pull request '{}'", title));
    if let Some(merged) = self.pull_requests.find(PrState::Merged, &title)? {
      return self.finish(ctx, merged);
    }

    ctx.check_deadline("search open pull request")?;
    let open = self.pull_requests.find(PrState::Open, &title)?;

    let notes = self.push_release_branch(ctx)?;
    match open {
      Some(open) => self.update_pull_request(ctx, open, &notes),
      None => self.open_pull_request(ctx, &notes),
    }
  }
}

fn short_sha(sha: &str) -> &str {
  sha.get(..7).unwrap_or(sha)
}
