//! Semantic versions and next-version resolution
//!
//! The current version comes from the highest `vX.Y.Z` tag reachable from
//! HEAD (`0.0.0` when there is none). The next version drops any pre-release
//! and build metadata.

use crate::core::error::CutResult;
use crate::core::vcs::Vcs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Semantic version value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SemVer {
  pub major: u64,
  pub minor: u64,
  pub patch: u64,
  pub prerelease: Vec<String>,
  pub build: Vec<String>,
}

impl SemVer {
  pub fn new(major: u64, minor: u64, patch: u64) -> Self {
    Self {
      major,
      minor,
      patch,
      prerelease: Vec::new(),
      build: Vec::new(),
    }
  }

  /// Parse `X.Y.Z[-pre][+build]`, with or without a leading `v`
  pub fn parse(s: &str) -> CutResult<Self> {
    let trimmed = s.trim();
    let version = semver::Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))?;
    Ok(Self::from(&version))
  }

  /// Next version; pre-release and build metadata are dropped
  pub fn bump(&self, kind: BumpKind) -> Self {
    match kind {
      BumpKind::Major => Self::new(self.major + 1, 0, 0),
      BumpKind::Minor => Self::new(self.major, self.minor + 1, 0),
      BumpKind::Patch => Self::new(self.major, self.minor, self.patch + 1),
    }
  }

  /// Git tag name (`v1.2.3`)
  pub fn tag_name(&self) -> String {
    format!("v{}", self)
  }

  pub fn is_initial(&self) -> bool {
    *self == Self::default()
  }
}

impl From<&semver::Version> for SemVer {
  fn from(version: &semver::Version) -> Self {
    let split = |s: &str| -> Vec<String> {
      if s.is_empty() {
        Vec::new()
      } else {
        s.split('.').map(str::to_string).collect()
      }
    };
    Self {
      major: version.major,
      minor: version.minor,
      patch: version.patch,
      prerelease: split(version.pre.as_str()),
      build: split(version.build.as_str()),
    }
  }
}

impl fmt::Display for SemVer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
    if !self.prerelease.is_empty() {
      write!(f, "-{}", self.prerelease.join("."))?;
    }
    if !self.build.is_empty() {
      write!(f, "+{}", self.build.join("."))?;
    }
    Ok(())
  }
}

/// Version component to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
  /// Major version bump (breaking changes)
  Major,
  /// Minor version bump (new features)
  Minor,
  /// Patch version bump (bug fixes)
  #[default]
  Patch,
}

/// Bump flags as given on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BumpFlags {
  pub major: bool,
  pub minor: bool,
  pub patch: bool,
}

impl BumpFlags {
  /// major > minor > patch; no flag means patch
  pub fn kind(&self) -> BumpKind {
    if self.major {
      BumpKind::Major
    } else if self.minor {
      BumpKind::Minor
    } else {
      BumpKind::Patch
    }
  }
}

/// Next version for `current` under `flags`
pub fn resolve(current: &SemVer, flags: BumpFlags) -> SemVer {
  current.bump(flags.kind())
}

/// Where the current version comes from
pub trait VersionSource: Send + Sync {
  fn current_version(&self) -> CutResult<SemVer>;
}

/// Current version from the latest `vX.Y.Z` tag reachable from HEAD
pub struct GitTagVersionSource {
  vcs: Arc<dyn Vcs>,
}

impl GitTagVersionSource {
  pub fn new(vcs: Arc<dyn Vcs>) -> Self {
    Self { vcs }
  }
}

impl VersionSource for GitTagVersionSource {
  fn current_version(&self) -> CutResult<SemVer> {
    match self.vcs.latest_version_tag()? {
      Some(tag) => SemVer::parse(&tag),
      None => Ok(SemVer::default()),
    }
  }
}

/// Current and next version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
  pub current: SemVer,
  pub next: SemVer,
  /// `next` is the current version, whose release an earlier run left unfinished
  pub resumed: bool,
}

impl ResolvedVersion {
  /// Release the current version again instead of bumping it
  pub fn resume(self) -> Self {
    Self {
      next: self.current.clone(),
      current: self.current,
      resumed: true,
    }
  }
}

/// Resolves the next version from a version source
pub struct VersionResolver {
  source: Arc<dyn VersionSource>,
}

impl VersionResolver {
  pub fn new(source: Arc<dyn VersionSource>) -> Self {
    Self { source }
  }

  /// Look up the current version and apply `flags`; lookup errors pass through unchanged
  pub fn resolve(&self, flags: BumpFlags) -> CutResult<ResolvedVersion> {
    let current = self.source.current_version()?;
    let next = resolve(&current, flags);
    tracing::debug!(%current, %next, "resolved version");
    Ok(ResolvedVersion {
      current,
      next,
      resumed: false,
    })
  }
}
