//! In-memory fakes for the release collaborators
//!
//! Every fake records its calls as short strings (`"push_tag v1.3.0"`), so
//! tests assert on what was asked of git and GitHub and in which order.
//! Failures are injected per method name or per exact call string.

use crate::build::{Artifact, Builder};
use crate::changelog::{ChangelogGenerator, ChangelogSpec};
use crate::core::context::{Deadline, ReleaseContext};
use crate::core::error::{CutError, CutResult, GitError, HostingError};
use crate::core::vcs::{CommitInfo, RemoteInfo, Vcs};
use crate::hosting::{
  HostedRelease, Hosting, IssueHit, Page, Permission, PrState, PullRequest, PullRequestParams, ReleaseParams,
  Repository, SearchQuery, User,
};
use crate::release::Collaborators;
use crate::release::version::{SemVer, VersionSource};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Injected {
  Nothing,
  Fail,
  Panic,
}

/// Call log with failure injection shared by the fakes
#[derive(Default)]
struct CallLog {
  calls: Vec<String>,
  fail_on: HashSet<String>,
  panic_on: HashSet<String>,
}

impl CallLog {
  /// Record `call` and report what was injected for it (or its method)
  fn record(&mut self, call: String) -> Injected {
    let method = call.split_whitespace().next().unwrap_or_default().to_string();
    let hit = |set: &HashSet<String>| set.contains(&call) || set.contains(&method);
    let injected = if hit(&self.panic_on) {
      Injected::Panic
    } else if hit(&self.fail_on) {
      Injected::Fail
    } else {
      Injected::Nothing
    };
    self.calls.push(call);
    injected
  }

  fn named(&self, name: &str) -> Vec<String> {
    self
      .calls
      .iter()
      .filter(|c| c.split_whitespace().next() == Some(name))
      .cloned()
      .collect()
  }

  fn count(&self, call: &str) -> usize {
    self.calls.iter().filter(|c| *c == call).count()
  }
}

// ============================================================================
// Vcs
// ============================================================================

struct VcsState {
  log: CallLog,
  branch: String,
  status: String,
  latest_tag: Option<String>,
  commits: Vec<String>,
  head: String,
  tags: HashMap<String, String>,
}

/// Scripted git repository
pub struct FakeVcs {
  root: PathBuf,
  state: Mutex<VcsState>,
}

impl FakeVcs {
  /// Clean `main` with no tags and no commits; HEAD is the all-zero SHA
  pub fn new(root: &Path) -> Self {
    Self {
      root: root.to_path_buf(),
      state: Mutex::new(VcsState {
        log: CallLog::default(),
        branch: "main".to_string(),
        status: String::new(),
        latest_tag: None,
        commits: Vec::new(),
        head: format!("{:040x}", 0),
        tags: HashMap::new(),
      }),
    }
  }

  pub fn add_commit(&self, message: &str) {
    lock(&self.state).commits.push(message.to_string());
  }

  pub fn set_latest_tag(&self, tag: &str) {
    lock(&self.state).latest_tag = Some(tag.to_string());
  }

  pub fn set_head(&self, sha: &str) {
    lock(&self.state).head = sha.to_string();
  }

  pub fn head(&self) -> String {
    lock(&self.state).head.clone()
  }

  /// A local tag left behind by an earlier run
  pub fn seed_tag(&self, name: &str, sha: &str) {
    lock(&self.state).tags.insert(name.to_string(), sha.to_string());
  }

  pub fn set_branch(&self, branch: &str) {
    lock(&self.state).branch = branch.to_string();
  }

  pub fn set_status(&self, status: &str) {
    lock(&self.state).status = status.to_string();
  }

  pub fn fail_on(&self, op: &str) {
    lock(&self.state).log.fail_on.insert(op.to_string());
  }

  pub fn panic_on(&self, op: &str) {
    lock(&self.state).log.panic_on.insert(op.to_string());
  }

  pub fn branch(&self) -> String {
    lock(&self.state).branch.clone()
  }

  pub fn calls(&self) -> Vec<String> {
    lock(&self.state).log.calls.clone()
  }

  /// Calls whose method name is `name`
  pub fn calls_named(&self, name: &str) -> Vec<String> {
    lock(&self.state).log.named(name)
  }

  /// How often exactly `call` was made
  pub fn count(&self, call: &str) -> usize {
    lock(&self.state).log.count(call)
  }

  fn call(&self, call: String) -> CutResult<()> {
    // The lock is released before panicking so later assertions can read the log
    let injected = lock(&self.state).log.record(call.clone());
    match injected {
      Injected::Nothing => Ok(()),
      Injected::Panic => panic!("injected panic in {}", call),
      Injected::Fail => Err(CutError::Git(GitError::CommandFailed {
        command: format!("git {}", call),
        stderr: "injected failure".to_string(),
      })),
    }
  }
}

impl Vcs for FakeVcs {
  fn work_tree(&self) -> &Path {
    &self.root
  }

  fn remote(&self, name: &str) -> CutResult<RemoteInfo> {
    self.call(format!("remote {}", name))?;
    Ok(RemoteInfo {
      domain: "github.com".to_string(),
      path: "acme/rocket".to_string(),
    })
  }

  fn current_branch(&self) -> CutResult<String> {
    self.call("current_branch".to_string())?;
    Ok(self.branch())
  }

  fn status(&self) -> CutResult<String> {
    self.call("status".to_string())?;
    Ok(lock(&self.state).status.clone())
  }

  fn pull(&self) -> CutResult<()> {
    self.call("pull".to_string())
  }

  fn add(&self, paths: &[PathBuf]) -> CutResult<()> {
    let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    self.call(format!("add {}", names.join(" ")))
  }

  fn commit(&self, message: &str) -> CutResult<()> {
    self.call(format!("commit {}", message))?;
    let mut state = lock(&self.state);
    state.commits.push(message.to_string());
    state.head = format!("{:040x}", state.commits.len());
    Ok(())
  }

  fn tag(&self, name: &str, target: Option<&str>, _message: &str) -> CutResult<()> {
    match target {
      Some(sha) => self.call(format!("tag {} {}", name, sha))?,
      None => self.call(format!("tag {}", name))?,
    }

    let mut state = lock(&self.state);
    if state.tags.contains_key(name) {
      return Err(CutError::Git(GitError::CommandFailed {
        command: format!("git tag {}", name),
        stderr: format!("fatal: tag '{}' already exists", name),
      }));
    }
    let sha = target.map_or_else(|| state.head.clone(), str::to_string);
    state.tags.insert(name.to_string(), sha);
    Ok(())
  }

  fn push(&self) -> CutResult<()> {
    self.call("push".to_string())
  }

  fn push_tag(&self, name: &str) -> CutResult<()> {
    self.call(format!("push_tag {}", name))
  }

  fn push_branch(&self, name: &str, force: bool) -> CutResult<()> {
    if force {
      self.call(format!("push_branch {} force", name))
    } else {
      self.call(format!("push_branch {}", name))
    }
  }

  fn delete_branch(&self, name: &str) -> CutResult<()> {
    self.call(format!("delete_branch {}", name))
  }

  fn checkout(&self, name: &str, create: bool) -> CutResult<()> {
    if create {
      self.call(format!("checkout -b {}", name))?;
    } else {
      self.call(format!("checkout {}", name))?;
    }
    self.set_branch(name);
    Ok(())
  }

  fn head_commit(&self) -> CutResult<String> {
    self.call("head_commit".to_string())?;
    Ok(self.head())
  }

  fn tag_commit(&self, name: &str) -> CutResult<Option<String>> {
    self.call(format!("tag_commit {}", name))?;
    Ok(lock(&self.state).tags.get(name).cloned())
  }

  fn latest_version_tag(&self) -> CutResult<Option<String>> {
    self.call("latest_version_tag".to_string())?;
    Ok(lock(&self.state).latest_tag.clone())
  }

  fn commits_since(&self, since: Option<&str>) -> CutResult<Vec<CommitInfo>> {
    self.call(format!("commits_since {}", since.unwrap_or("<root>")))?;
    let state = lock(&self.state);
    Ok(
      state
        .commits
        .iter()
        .enumerate()
        .map(|(i, message)| CommitInfo {
          sha: format!("{:040x}", i + 1),
          author: "Test User".to_string(),
          author_email: "test@example.com".to_string(),
          committer: "Test User".to_string(),
          committer_email: "test@example.com".to_string(),
          message: message.clone(),
          timestamp: 1_700_000_000 + i as i64,
          parent_shas: Vec::new(),
        })
        .collect(),
    )
  }
}

// ============================================================================
// Hosting
// ============================================================================

type UploadHook = Arc<dyn Fn(&str) -> CutResult<()> + Send + Sync>;

struct HostingState {
  log: CallLog,
  default_branch: String,
  permission: String,
  releases: Vec<HostedRelease>,
  next_release_id: u64,
  search_hits: Vec<(PrState, IssueHit)>,
  pull_requests: HashMap<u64, PullRequest>,
  upload_hook: Option<UploadHook>,
}

/// Scripted GitHub repository `acme/rocket`
pub struct FakeHosting {
  state: Mutex<HostingState>,
}

impl Default for FakeHosting {
  fn default() -> Self {
    Self::new()
  }
}

impl FakeHosting {
  /// Default branch `main`, authenticated as admin `octocat`, no releases
  pub fn new() -> Self {
    Self {
      state: Mutex::new(HostingState {
        log: CallLog::default(),
        default_branch: "main".to_string(),
        permission: "admin".to_string(),
        releases: Vec::new(),
        next_release_id: 100,
        search_hits: Vec::new(),
        pull_requests: HashMap::new(),
        upload_hook: None,
      }),
    }
  }

  pub fn set_permission(&self, permission: &str) {
    lock(&self.state).permission = permission.to_string();
  }

  pub fn seed_release(&self, tag: &str, draft: bool) {
    let mut state = lock(&self.state);
    let id = state.next_release_id;
    state.next_release_id += 1;
    let target_commitish = state.default_branch.clone();
    state.releases.push(HostedRelease {
      id,
      name: Some(tag.to_string()),
      tag_name: tag.to_string(),
      target_commitish,
      draft,
      prerelease: false,
      body: Some(format!("## [{}]\n\n- seeded", tag)),
      upload_url: String::new(),
      assets: Vec::new(),
    });
  }

  pub fn seed_search_hit(&self, state: PrState, number: u64, title: &str) {
    let hit = IssueHit {
      number,
      title: title.to_string(),
      state: match state {
        PrState::Open => "open".to_string(),
        PrState::Merged => "closed".to_string(),
      },
      html_url: format!("https://github.com/acme/rocket/pull/{}", number),
    };
    lock(&self.state).search_hits.push((state, hit));
  }

  /// A pull request; merged when it has a merge commit
  pub fn seed_pull_request(&self, number: u64, title: &str, merge_commit_sha: Option<&str>) {
    let pr = PullRequest {
      number,
      state: if merge_commit_sha.is_some() { "closed" } else { "open" }.to_string(),
      merged: merge_commit_sha.is_some(),
      merge_commit_sha: merge_commit_sha.map(str::to_string),
      html_url: format!("https://github.com/acme/rocket/pull/{}", number),
      title: title.to_string(),
    };
    lock(&self.state).pull_requests.insert(number, pr);
  }

  /// Run `hook` with the asset label on every upload
  pub fn on_upload(&self, hook: impl Fn(&str) -> CutResult<()> + Send + Sync + 'static) {
    lock(&self.state).upload_hook = Some(Arc::new(hook));
  }

  pub fn fail_on(&self, op: &str) {
    lock(&self.state).log.fail_on.insert(op.to_string());
  }

  /// Stop injecting failures, as if GitHub recovered
  pub fn clear_failures(&self) {
    lock(&self.state).log.fail_on.clear();
  }

  pub fn calls(&self) -> Vec<String> {
    lock(&self.state).log.calls.clone()
  }

  pub fn calls_named(&self, name: &str) -> Vec<String> {
    lock(&self.state).log.named(name)
  }

  pub fn count(&self, call: &str) -> usize {
    lock(&self.state).log.count(call)
  }

  /// First release carrying `tag`
  pub fn release(&self, tag: &str) -> Option<HostedRelease> {
    lock(&self.state).releases.iter().find(|r| r.tag_name == tag).cloned()
  }

  pub fn releases_tagged(&self, tag: &str) -> usize {
    lock(&self.state).releases.iter().filter(|r| r.tag_name == tag).count()
  }

  fn call(&self, state: &mut HostingState, call: String) -> CutResult<()> {
    match state.log.record(call.clone()) {
      Injected::Nothing => Ok(()),
      Injected::Fail | Injected::Panic => Err(injected(&call, 500)),
    }
  }
}

fn injected(call: &str, status: u16) -> CutError {
  CutError::Hosting(HostingError::Status {
    method: "FAKE".to_string(),
    url: call.to_string(),
    status,
    message: "injected failure".to_string(),
  })
}

fn paginate<T: Clone>(items: &[T], page_size: u32, page: u32) -> Page<T> {
  let size = page_size.max(1) as usize;
  let pages = items.len().div_ceil(size).max(1) as u32;
  let start = (page.saturating_sub(1) as usize).saturating_mul(size);
  Page {
    items: items.iter().skip(start).take(size).cloned().collect(),
    last_page: (pages > 1).then_some(pages),
  }
}

impl Hosting for FakeHosting {
  fn get_repository(&self) -> CutResult<Repository> {
    let mut state = lock(&self.state);
    self.call(&mut state, "get_repository".to_string())?;
    Ok(Repository {
      full_name: "acme/rocket".to_string(),
      default_branch: state.default_branch.clone(),
      html_url: "https://github.com/acme/rocket".to_string(),
    })
  }

  fn get_current_user(&self) -> CutResult<User> {
    let mut state = lock(&self.state);
    self.call(&mut state, "get_current_user".to_string())?;
    Ok(User {
      login: "octocat".to_string(),
    })
  }

  fn get_permission(&self, user: &str) -> CutResult<Permission> {
    let mut state = lock(&self.state);
    self.call(&mut state, format!("get_permission {}", user))?;
    Ok(Permission {
      permission: state.permission.clone(),
    })
  }

  fn set_branch_protection(&self, branch: &str, enabled: bool) -> CutResult<()> {
    let mut state = lock(&self.state);
    self.call(&mut state, format!("set_branch_protection {} {}", branch, enabled))
  }

  fn list_releases(&self, page_size: u32, page: u32) -> CutResult<Page<HostedRelease>> {
    let mut state = lock(&self.state);
    self.call(&mut state, format!("list_releases {}", page))?;
    Ok(paginate(&state.releases, page_size, page))
  }

  fn create_release(&self, params: &ReleaseParams) -> CutResult<HostedRelease> {
    let mut state = lock(&self.state);
    let tag = params.tag_name.clone().unwrap_or_default();
    let draft = params.draft.unwrap_or(false);
    self.call(&mut state, format!("create_release {} draft={}", tag, draft))?;

    let id = state.next_release_id;
    state.next_release_id += 1;
    let release = HostedRelease {
      id,
      name: params.name.clone(),
      tag_name: tag,
      target_commitish: params.target_commitish.clone().unwrap_or_default(),
      draft,
      prerelease: params.prerelease.unwrap_or(false),
      body: params.body.clone(),
      upload_url: String::new(),
      assets: Vec::new(),
    };
    state.releases.push(release.clone());
    Ok(release)
  }

  fn update_release(&self, id: u64, params: &ReleaseParams) -> CutResult<HostedRelease> {
    let mut state = lock(&self.state);
    let call = match params.draft {
      Some(draft) => format!("update_release {} draft={}", id, draft),
      None => format!("update_release {}", id),
    };
    self.call(&mut state, call.clone())?;

    let release = state
      .releases
      .iter_mut()
      .find(|r| r.id == id)
      .ok_or_else(|| injected(&call, 404))?;
    if let Some(tag) = &params.tag_name {
      release.tag_name = tag.clone();
    }
    if let Some(target) = &params.target_commitish {
      release.target_commitish = target.clone();
    }
    if let Some(name) = &params.name {
      release.name = Some(name.clone());
    }
    if let Some(body) = &params.body {
      release.body = Some(body.clone());
    }
    if let Some(draft) = params.draft {
      release.draft = draft;
    }
    Ok(release.clone())
  }

  fn upload_release_asset(&self, release_id: u64, _path: &Path, label: &str) -> CutResult<()> {
    let hook = {
      let mut state = lock(&self.state);
      self.call(&mut state, format!("upload {} {}", release_id, label))?;
      state.upload_hook.clone()
    };
    // The hook may block; it runs without the lock held
    match hook {
      Some(hook) => hook(label),
      None => Ok(()),
    }
  }

  fn create_pull_request(&self, params: &PullRequestParams) -> CutResult<PullRequest> {
    let mut state = lock(&self.state);
    let title = params.title.clone().unwrap_or_default();
    self.call(
      &mut state,
      format!(
        "create_pull_request {} head={} base={}",
        title,
        params.head.as_deref().unwrap_or_default(),
        params.base.as_deref().unwrap_or_default()
      ),
    )?;

    let number = state.pull_requests.keys().max().copied().unwrap_or(0) + 1;
    let pr = PullRequest {
      number,
      state: "open".to_string(),
      merged: false,
      merge_commit_sha: None,
      html_url: format!("https://github.com/acme/rocket/pull/{}", number),
      title,
    };
    state.pull_requests.insert(number, pr.clone());
    Ok(pr)
  }

  fn update_pull_request(&self, number: u64, params: &PullRequestParams) -> CutResult<PullRequest> {
    let mut state = lock(&self.state);
    let call = format!("update_pull_request {}", number);
    self.call(&mut state, call.clone())?;

    let pr = state.pull_requests.get_mut(&number).ok_or_else(|| injected(&call, 404))?;
    if let Some(title) = &params.title {
      pr.title = title.clone();
    }
    Ok(pr.clone())
  }

  fn get_pull_request(&self, number: u64) -> CutResult<PullRequest> {
    let mut state = lock(&self.state);
    let call = format!("get_pull_request {}", number);
    self.call(&mut state, call.clone())?;
    state.pull_requests.get(&number).cloned().ok_or_else(|| injected(&call, 404))
  }

  fn search_issues(
    &self,
    page_size: u32,
    page: u32,
    _sort: &str,
    _order: &str,
    query: &SearchQuery,
  ) -> CutResult<Page<IssueHit>> {
    let mut state = lock(&self.state);
    let rendered = query.render();
    self.call(&mut state, format!("search_issues {}", rendered))?;

    // Title search is fuzzy on GitHub: any title containing the term comes back
    let term = rendered.split('"').nth(1).unwrap_or_default().to_string();
    let hits: Vec<IssueHit> = state
      .search_hits
      .iter()
      .filter(|(hit_state, hit)| {
        let qualifier = match hit_state {
          PrState::Open => "is:open",
          PrState::Merged => "is:merged",
        };
        rendered.split_whitespace().any(|part| part == qualifier) && hit.title.contains(&term)
      })
      .map(|(_, hit)| hit.clone())
      .collect();
    Ok(paginate(&hits, page_size, page))
  }
}

// ============================================================================
// Changelog, builder, versions
// ============================================================================

/// Returns a fixed section per tag and remembers what it was asked for
///
/// `committed` finds a section for every tag, as if an earlier run had
/// committed it.
#[derive(Default)]
pub struct FakeChangelog {
  specs: Mutex<Vec<ChangelogSpec>>,
}

impl FakeChangelog {
  /// Specs passed to `generate`
  pub fn specs(&self) -> Vec<ChangelogSpec> {
    lock(&self.specs).clone()
  }

  fn section(tag: &str) -> String {
    format!("## [{}] - 2026-01-15\n\n### Features\n\n- launch", tag)
  }
}

impl ChangelogGenerator for FakeChangelog {
  fn generate(&self, spec: &ChangelogSpec) -> CutResult<String> {
    lock(&self.specs).push(spec.clone());
    Ok(Self::section(&spec.tag))
  }

  fn committed(&self, spec: &ChangelogSpec) -> CutResult<Option<String>> {
    Ok(Some(Self::section(&spec.tag)))
  }
}

/// Nothing to build until artifacts are set
#[derive(Default)]
pub struct FakeBuilder {
  artifacts: Mutex<Vec<Artifact>>,
}

impl FakeBuilder {
  pub fn set_artifacts(&self, artifacts: Vec<Artifact>) {
    *lock(&self.artifacts) = artifacts;
  }
}

impl Builder for FakeBuilder {
  fn probe(&self) -> bool {
    !lock(&self.artifacts).is_empty()
  }

  fn run(&self, ctx: &ReleaseContext) -> CutResult<()> {
    for artifact in lock(&self.artifacts).iter() {
      ctx.push_artifact(artifact.clone());
    }
    Ok(())
  }
}

/// Fixed current version
pub struct FakeVersionSource(pub SemVer);

impl VersionSource for FakeVersionSource {
  fn current_version(&self) -> CutResult<SemVer> {
    Ok(self.0.clone())
  }
}

// ============================================================================
// Harness
// ============================================================================

/// All fakes wired together around a temporary work tree
pub struct Harness {
  _dir: tempfile::TempDir,
  pub vcs: Arc<FakeVcs>,
  pub hosting: Arc<FakeHosting>,
  pub changelog: Arc<FakeChangelog>,
  pub builder: Arc<FakeBuilder>,
  versions: Arc<FakeVersionSource>,
}

impl Harness {
  /// Current version `1.2.0`
  pub fn new() -> Self {
    Self::with_version(SemVer::new(1, 2, 0))
  }

  pub fn with_version(current: SemVer) -> Self {
    let dir = tempfile::tempdir().unwrap();
    let vcs = Arc::new(FakeVcs::new(dir.path()));
    Self {
      _dir: dir,
      vcs,
      hosting: Arc::new(FakeHosting::new()),
      changelog: Arc::new(FakeChangelog::default()),
      builder: Arc::new(FakeBuilder::default()),
      versions: Arc::new(FakeVersionSource(current)),
    }
  }

  pub fn collaborators(&self) -> Collaborators {
    Collaborators {
      vcs: self.vcs.clone(),
      hosting: self.hosting.clone(),
      changelog: self.changelog.clone(),
      builder: self.builder.clone(),
      versions: self.versions.clone(),
    }
  }

  /// Context for releasing `version` from `main` after `v1.2.0`
  pub fn context(&self, version: &str, comment: Option<&str>) -> ReleaseContext {
    self.context_with(version, comment, Deadline::new(Duration::from_secs(600)))
  }

  pub fn expired_context(&self, version: &str) -> ReleaseContext {
    self.context_with(version, None, Deadline::new(Duration::ZERO))
  }

  fn context_with(&self, version: &str, comment: Option<&str>, deadline: Deadline) -> ReleaseContext {
    let version = SemVer::parse(version).unwrap();
    let changelog = ChangelogSpec::new("CHANGELOG.md", version.tag_name(), Some("v1.2.0".to_string()));
    ReleaseContext::new(
      version,
      "acme",
      "rocket",
      "main",
      changelog,
      comment.map(str::to_string),
      deadline,
    )
  }
}
