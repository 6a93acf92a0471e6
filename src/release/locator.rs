//! Paginated searches for draft releases and release pull requests
//!
//! Page 1 is fetched on the calling thread. When GitHub advertises more pages
//! the rest are fetched concurrently in a [`TaskGroup`]; the first page that
//! yields a match cancels the outstanding fetches.

use crate::core::error::{CutError, CutResult, HostingError};
use crate::core::tasks::TaskGroup;
use crate::hosting::{HostedRelease, Hosting, IssueHit, MAX_PAGE_SIZE, Page, PrState, SearchQuery};
use std::sync::Arc;

/// Search `fetch`ed pages for the first item matching `matches`
pub fn find_in_pages<T, F, M>(label: &str, fetch: F, matches: M) -> CutResult<Option<T>>
where
  T: Send + 'static,
  F: Fn(u32) -> CutResult<Page<T>> + Send + Sync + 'static,
  M: Fn(&T) -> bool + Send + Sync + 'static,
{
  let first = fetch(1)?;
  let page_count = first.page_count();
  if let Some(hit) = first.items.into_iter().find(|item| matches(item)) {
    return Ok(Some(hit));
  }
  if page_count <= 1 {
    return Ok(None);
  }

  tracing::debug!(label, pages = page_count, "fanning out page fetches");
  let fetch = Arc::new(fetch);
  let matches = Arc::new(matches);
  let mut group = TaskGroup::new(label);

  for page in 2..=page_count {
    let fetch = Arc::clone(&fetch);
    let matches = Arc::clone(&matches);
    group.spawn(format!("page-{}", page), move |token| {
      let items = fetch(page)?.items;
      if token.is_cancelled() {
        return Ok(None);
      }
      Ok(items.into_iter().find(|item| matches(item)))
    })?;
  }

  group.find_first()
}

/// Finds the draft release paired with a tag
pub struct DraftReleaseLocator {
  hosting: Arc<dyn Hosting>,
  page_size: u32,
}

impl DraftReleaseLocator {
  pub fn new(hosting: Arc<dyn Hosting>) -> Self {
    Self {
      hosting,
      page_size: MAX_PAGE_SIZE,
    }
  }

  #[cfg(test)]
  pub fn with_page_size(mut self, page_size: u32) -> Self {
    self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    self
  }

  /// The draft release for `tag`, or `DraftReleaseNotFound`
  pub fn find(&self, tag: &str) -> CutResult<HostedRelease> {
    self.find_optional(tag)?.ok_or_else(|| {
      CutError::Hosting(HostingError::DraftReleaseNotFound { tag: tag.to_string() })
    })
  }

  /// The draft release for `tag`, if there is one
  pub fn find_optional(&self, tag: &str) -> CutResult<Option<HostedRelease>> {
    let hosting = Arc::clone(&self.hosting);
    let page_size = self.page_size;
    let wanted = tag.to_string();

    find_in_pages(
      "releases",
      move |page| hosting.list_releases(page_size, page),
      move |release: &HostedRelease| release.draft && release.tag_name == wanted,
    )
  }
}

/// Finds the pull request titled `RELEASE {version}`
///
/// The title is the key that ties a later invocation back to the pull
/// request an earlier one opened. Search results are fuzzy, so only exact
/// title matches count.
pub struct PullRequestLocator {
  hosting: Arc<dyn Hosting>,
  owner: String,
  repo: String,
  page_size: u32,
}

impl PullRequestLocator {
  pub fn new(hosting: Arc<dyn Hosting>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
    Self {
      hosting,
      owner: owner.into(),
      repo: repo.into(),
      page_size: MAX_PAGE_SIZE,
    }
  }

  #[cfg(test)]
  pub fn with_page_size(mut self, page_size: u32) -> Self {
    self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    self
  }

  pub fn find(&self, state: PrState, title: &str) -> CutResult<Option<IssueHit>> {
    let hosting = Arc::clone(&self.hosting);
    let page_size = self.page_size;
    let query = SearchQuery::release_pr(&self.owner, &self.repo, state, title);
    let wanted = title.to_string();

    tracing::debug!(query = %query, "searching pull requests");
    find_in_pages(
      "pull-requests",
      move |page| hosting.search_issues(page_size, page, "created", "desc", &query),
      move |hit: &IssueHit| hit.title == wanted,
    )
  }
}
