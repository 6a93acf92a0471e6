//! GitHub REST client
//!
//! Blocking `reqwest` client authenticated with a personal access token. Each
//! request carries its own timeout on top of the invocation deadline the
//! orchestrator enforces between steps.

use super::{
  Hosting, HostedRelease, IssueHit, Page, Permission, PullRequest, PullRequestParams, ReleaseAsset, ReleaseParams,
  Repository, SearchQuery, User,
};
use crate::core::error::{CutError, CutResult, HostingError, ResultExt};
use crate::core::vcs::RemoteInfo;
use reqwest::Method;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LINK};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::time::Duration;

const API_BASE: &str = "https://api.github.com";
const UPLOAD_BASE: &str = "https://uploads.github.com";
const API_VERSION: &str = "2022-11-28";

/// Uploads get longer than ordinary API calls
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Client bound to one `owner/repo`
pub struct GitHubClient {
  http: Client,
  token: String,
  owner: String,
  repo: String,
  api_base: String,
  upload_base: String,
}

#[derive(serde::Deserialize)]
struct ApiErrorBody {
  message: String,
}

#[derive(serde::Deserialize)]
struct SearchResponse {
  items: Vec<IssueHit>,
}

impl GitHubClient {
  /// Create a client for `owner/repo` on github.com
  pub fn new(
    token: impl Into<String>,
    owner: impl Into<String>,
    repo: impl Into<String>,
    request_timeout: Duration,
  ) -> CutResult<Self> {
    let http = Client::builder()
      .timeout(request_timeout)
      .user_agent(concat!("cargo-cut/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| CutError::message(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      http,
      token: token.into(),
      owner: owner.into(),
      repo: repo.into(),
      api_base: API_BASE.to_string(),
      upload_base: UPLOAD_BASE.to_string(),
    })
  }

  /// Create a client for the repository a git remote points at
  ///
  /// Hosts other than github.com are treated as GitHub Enterprise Server.
  pub fn for_remote(remote: &RemoteInfo, token: impl Into<String>, request_timeout: Duration) -> CutResult<Self> {
    let (owner, repo) = remote.owner_repo()?;
    let client = Self::new(token, owner, repo, request_timeout)?;

    if remote.domain == "github.com" {
      return Ok(client);
    }
    Ok(client.with_base_urls(
      format!("https://{}/api/v3", remote.domain),
      format!("https://{}/api/uploads", remote.domain),
    ))
  }

  /// Override the API and upload endpoints
  pub fn with_base_urls(mut self, api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
    self.api_base = api_base.into().trim_end_matches('/').to_string();
    self.upload_base = upload_base.into().trim_end_matches('/').to_string();
    self
  }

  fn repo_url(&self, path: &str) -> String {
    format!("{}/repos/{}/{}{}", self.api_base, self.owner, self.repo, path)
  }

  fn parse_url(url: &str, params: &[(&str, String)]) -> CutResult<Url> {
    Url::parse_with_params(url, params).map_err(|e| {
      CutError::Hosting(HostingError::Request {
        method: "GET".to_string(),
        url: url.to_string(),
        reason: e.to_string(),
      })
    })
  }

  fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
    self
      .http
      .request(method, url)
      .bearer_auth(&self.token)
      .header(ACCEPT, "application/vnd.github+json")
      .header("X-GitHub-Api-Version", API_VERSION)
  }

  /// Send a request and turn transport failures and non-2xx statuses into `HostingError`
  fn execute(&self, builder: RequestBuilder, method: &Method, url: &str) -> CutResult<Response> {
    tracing::debug!(%method, url, "github request");

    let response = builder.send().map_err(|e| {
      CutError::Hosting(HostingError::Request {
        method: method.to_string(),
        url: url.to_string(),
        reason: e.to_string(),
      })
    })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().unwrap_or_default();
      let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
      tracing::warn!(%method, url, status = status.as_u16(), error = %message, "github request failed");
      return Err(CutError::Hosting(HostingError::Status {
        method: method.to_string(),
        url: url.to_string(),
        status: status.as_u16(),
        message,
      }));
    }

    Ok(response)
  }

  fn decode<T: DeserializeOwned>(response: Response, url: &str) -> CutResult<T> {
    response.json::<T>().map_err(|e| {
      CutError::Hosting(HostingError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
      })
    })
  }

  fn get_json<T: DeserializeOwned>(&self, url: &str) -> CutResult<T> {
    let response = self.execute(self.request(Method::GET, url), &Method::GET, url)?;
    Self::decode(response, url)
  }

  fn send_json<B: Serialize, T: DeserializeOwned>(&self, method: Method, url: &str, body: &B) -> CutResult<T> {
    let response = self.execute(self.request(method.clone(), url).json(body), &method, url)?;
    Self::decode(response, url)
  }

  fn send_empty(&self, method: Method, url: &str) -> CutResult<()> {
    self.execute(self.request(method.clone(), url), &method, url)?;
    Ok(())
  }

  /// GET one page, returning the body and the advertised last page
  fn get_page<T: DeserializeOwned>(&self, url: Url) -> CutResult<(T, Option<u32>)> {
    let url_str = url.to_string();
    let response = self.execute(self.request(Method::GET, url), &Method::GET, &url_str)?;
    let last_page = response
      .headers()
      .get(LINK)
      .and_then(|value| value.to_str().ok())
      .and_then(parse_last_page);
    let body = Self::decode(response, &url_str)?;
    Ok((body, last_page))
  }

  fn list_assets(&self, release_id: u64) -> CutResult<Vec<ReleaseAsset>> {
    let url = Self::parse_url(
      &self.repo_url(&format!("/releases/{}/assets", release_id)),
      &[("per_page", super::MAX_PAGE_SIZE.to_string())],
    )?;
    let (assets, _) = self.get_page(url)?;
    Ok(assets)
  }
}

impl Hosting for GitHubClient {
  fn get_repository(&self) -> CutResult<Repository> {
    self.get_json(&self.repo_url(""))
  }

  fn get_current_user(&self) -> CutResult<User> {
    self.get_json(&format!("{}/user", self.api_base))
  }

  fn get_permission(&self, user: &str) -> CutResult<Permission> {
    self.get_json(&self.repo_url(&format!("/collaborators/{}/permission", user)))
  }

  fn set_branch_protection(&self, branch: &str, enabled: bool) -> CutResult<()> {
    let url = self.repo_url(&format!("/branches/{}/protection/enforce_admins", branch));
    let method = if enabled { Method::POST } else { Method::DELETE };
    self.send_empty(method, &url)
  }

  fn list_releases(&self, page_size: u32, page: u32) -> CutResult<Page<HostedRelease>> {
    let url = Self::parse_url(
      &self.repo_url("/releases"),
      &[("per_page", page_size.to_string()), ("page", page.to_string())],
    )?;
    let (items, last_page) = self.get_page(url)?;
    Ok(Page { items, last_page })
  }

  fn create_release(&self, params: &ReleaseParams) -> CutResult<HostedRelease> {
    self.send_json(Method::POST, &self.repo_url("/releases"), params)
  }

  fn update_release(&self, id: u64, params: &ReleaseParams) -> CutResult<HostedRelease> {
    self.send_json(Method::PATCH, &self.repo_url(&format!("/releases/{}", id)), params)
  }

  fn upload_release_asset(&self, release_id: u64, path: &Path, label: &str) -> CutResult<()> {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .ok_or_else(|| CutError::message(format!("Artifact path has no file name: {}", path.display())))?;

    if let Some(existing) = self.list_assets(release_id)?.into_iter().find(|a| a.name == name) {
      tracing::debug!(asset = %name, id = existing.id, "replacing existing release asset");
      self.send_empty(Method::DELETE, &self.repo_url(&format!("/releases/assets/{}", existing.id)))?;
    }

    let bytes = fs::read(path).with_context(|| format!("Failed to read artifact {}", path.display()))?;
    let url = Self::parse_url(
      &format!(
        "{}/repos/{}/{}/releases/{}/assets",
        self.upload_base, self.owner, self.repo, release_id
      ),
      &[("name", name), ("label", label.to_string())],
    )?;
    let url_str = url.to_string();

    let builder = self
      .request(Method::POST, url)
      .header(CONTENT_TYPE, "application/octet-stream")
      .timeout(UPLOAD_TIMEOUT)
      .body(bytes);
    self.execute(builder, &Method::POST, &url_str)?;
    Ok(())
  }

  fn create_pull_request(&self, params: &PullRequestParams) -> CutResult<PullRequest> {
    self.send_json(Method::POST, &self.repo_url("/pulls"), params)
  }

  fn update_pull_request(&self, number: u64, params: &PullRequestParams) -> CutResult<PullRequest> {
    self.send_json(Method::PATCH, &self.repo_url(&format!("/pulls/{}", number)), params)
  }

  fn get_pull_request(&self, number: u64) -> CutResult<PullRequest> {
    self.get_json(&self.repo_url(&format!("/pulls/{}", number)))
  }

  fn search_issues(
    &self,
    page_size: u32,
    page: u32,
    sort: &str,
    order: &str,
    query: &SearchQuery,
  ) -> CutResult<Page<IssueHit>> {
    let url = Self::parse_url(
      &format!("{}/search/issues", self.api_base),
      &[
        ("q", query.render()),
        ("sort", sort.to_string()),
        ("order", order.to_string()),
        ("per_page", page_size.to_string()),
        ("page", page.to_string()),
      ],
    )?;
    let (body, last_page): (SearchResponse, _) = self.get_page(url)?;
    Ok(Page {
      items: body.items,
      last_page,
    })
  }
}

/// Extract the page number of the `rel="last"` entry of a `Link` header
pub fn parse_last_page(link: &str) -> Option<u32> {
  link.split(',').find_map(|entry| {
    let (target, params) = entry.split_once(';')?;
    if !params.split(';').any(|p| p.trim() == "rel=\"last\"") {
      return None;
    }
    let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
    let url = Url::parse(target).ok()?;
    url
      .query_pairs()
      .find(|(key, _)| key == "page")
      .and_then(|(_, value)| value.parse().ok())
  })
}
