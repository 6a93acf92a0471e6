//! Remote hosting API (GitHub REST)
//!
//! The release workflow only ever talks to GitHub through [`Hosting`], so the
//! strategies can be driven against an in-memory fake in tests.

pub mod github;
pub mod search;

pub use github::GitHubClient;
pub use search::{PrState, SearchQuery};

use crate::core::error::CutResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest page GitHub serves for list and search endpoints
pub const MAX_PAGE_SIZE: u32 = 100;

/// Repository metadata
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
  pub full_name: String,
  pub default_branch: String,
  #[serde(default)]
  pub html_url: String,
}

/// Authenticated user
#[derive(Debug, Clone, Deserialize)]
pub struct User {
  pub login: String,
}

/// A collaborator's permission level on the repository
#[derive(Debug, Clone, Deserialize)]
pub struct Permission {
  /// `admin`, `maintain`, `write`, `triage`, `read` or `none`
  pub permission: String,
}

impl Permission {
  pub fn is_admin(&self) -> bool {
    self.permission == "admin"
  }
}

/// Release object as GitHub stores it
#[derive(Debug, Clone, Deserialize)]
pub struct HostedRelease {
  pub id: u64,
  #[serde(default)]
  pub name: Option<String>,
  pub tag_name: String,
  #[serde(default)]
  pub target_commitish: String,
  pub draft: bool,
  #[serde(default)]
  pub prerelease: bool,
  #[serde(default)]
  pub body: Option<String>,
  #[serde(default)]
  pub upload_url: String,
  #[serde(default)]
  pub assets: Vec<ReleaseAsset>,
}

/// Asset attached to a release
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
  pub id: u64,
  pub name: String,
}

/// Fields sent when creating or updating a release; `None` leaves a field alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleaseParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tag_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_commitish: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub body: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub draft: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub prerelease: Option<bool>,
}

impl ReleaseParams {
  /// A new draft release for `tag`
  pub fn draft(tag: &str, target: &str, body: &str) -> Self {
    Self {
      tag_name: Some(tag.to_string()),
      target_commitish: Some(target.to_string()),
      name: Some(tag.to_string()),
      body: Some(body.to_string()),
      draft: Some(true),
      prerelease: None,
    }
  }

  /// Flip a draft to published with its final notes
  pub fn publish(body: &str) -> Self {
    Self {
      body: Some(body.to_string()),
      draft: Some(false),
      ..Default::default()
    }
  }
}

/// Pull request as GitHub stores it
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
  pub number: u64,
  pub state: String,
  #[serde(default)]
  pub merged: bool,
  #[serde(default)]
  pub merge_commit_sha: Option<String>,
  #[serde(default)]
  pub html_url: String,
  pub title: String,
}

/// Fields sent when creating or updating a pull request
#[derive(Debug, Clone, Default, Serialize)]
pub struct PullRequestParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub body: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub head: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub base: Option<String>,
}

/// One issue-search result
#[derive(Debug, Clone, Deserialize)]
pub struct IssueHit {
  pub number: u64,
  pub title: String,
  pub state: String,
  #[serde(default)]
  pub html_url: String,
}

/// One page of a paginated listing
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Last page number advertised by the `Link: rel="last"` header
  pub last_page: Option<u32>,
}

impl<T> Page<T> {
  /// Page count; a response without `rel="last"` is the only page
  pub fn page_count(&self) -> u32 {
    self.last_page.unwrap_or(1).max(1)
  }
}

/// GitHub REST operations used by the release workflow
///
/// Every method is scoped to the one repository the client was built for.
pub trait Hosting: Send + Sync {
  fn get_repository(&self) -> CutResult<Repository>;

  fn get_current_user(&self) -> CutResult<User>;

  fn get_permission(&self, user: &str) -> CutResult<Permission>;

  /// Turn admin enforcement of `branch`'s protection rules on or off
  fn set_branch_protection(&self, branch: &str, enabled: bool) -> CutResult<()>;

  fn list_releases(&self, page_size: u32, page: u32) -> CutResult<Page<HostedRelease>>;

  fn create_release(&self, params: &ReleaseParams) -> CutResult<HostedRelease>;

  fn update_release(&self, id: u64, params: &ReleaseParams) -> CutResult<HostedRelease>;

  /// Upload a file as a release asset, replacing an existing asset of the same name
  fn upload_release_asset(&self, release_id: u64, path: &Path, label: &str) -> CutResult<()>;

  fn create_pull_request(&self, params: &PullRequestParams) -> CutResult<PullRequest>;

  fn update_pull_request(&self, number: u64, params: &PullRequestParams) -> CutResult<PullRequest>;

  fn get_pull_request(&self, number: u64) -> CutResult<PullRequest>;

  fn search_issues(
    &self,
    page_size: u32,
    page: u32,
    sort: &str,
    order: &str,
    query: &SearchQuery,
  ) -> CutResult<Page<IssueHit>>;
}
