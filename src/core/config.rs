use crate::core::error::{ConfigError, CutError, CutResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variables checked (in order) for a GitHub token
pub const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Configuration for cargo-cut
/// Searched in order: cut.toml, .cut.toml, .cargo/cut.toml, .config/cut.toml
///
/// Every field has a default, so a project without a config file releases
/// in direct mode from `origin` and skips nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutConfig {
  #[serde(default)]
  pub release: ReleaseSettings,
  #[serde(default)]
  pub build: BuildSettings,
}

/// `[release]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSettings {
  /// Release mode ("direct" or "indirect"); validated when the release starts
  #[serde(default)]
  pub mode: Option<String>,

  /// Git remote that points at the GitHub repository
  #[serde(default = "default_remote")]
  pub remote: String,

  /// Deadline for one whole release invocation
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,

  /// Changelog file, relative to the repository root
  #[serde(default = "default_changelog")]
  pub changelog: PathBuf,
}

fn default_remote() -> String {
  "origin".to_string()
}

fn default_timeout_secs() -> u64 {
  600
}

fn default_changelog() -> PathBuf {
  PathBuf::from("CHANGELOG.md")
}

impl Default for ReleaseSettings {
  fn default() -> Self {
    Self {
      mode: None,
      remote: default_remote(),
      timeout_secs: default_timeout_secs(),
      changelog: default_changelog(),
    }
  }
}

impl ReleaseSettings {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

/// `[build]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
  /// Target triples to cross-build; empty = host target only
  #[serde(default)]
  pub targets: Vec<String>,

  /// Binary targets to ship; empty = every binary in the package
  #[serde(default)]
  pub bins: Vec<String>,

  /// Where built artifacts are collected, relative to the repository root
  ///
  /// Unset means `cut/` under cargo's target directory, which keeps the work
  /// tree clean for the next release.
  #[serde(default)]
  pub out_dir: Option<PathBuf>,

  /// Write a `.sha256` file next to every binary and upload it too
  #[serde(default = "default_checksums")]
  pub checksums: bool,
}

fn default_checksums() -> bool {
  true
}

impl Default for BuildSettings {
  fn default() -> Self {
    Self {
      targets: Vec::new(),
      bins: Vec::new(),
      out_dir: None,
      checksums: default_checksums(),
    }
  }
}

/// Release workflow selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseMode {
  /// Tag and push straight to the default branch
  #[default]
  Direct,
  /// Route the release commit through a pull request
  Indirect,
}

impl FromStr for ReleaseMode {
  type Err = CutError;

  fn from_str(s: &str) -> CutResult<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "direct" => Ok(ReleaseMode::Direct),
      "indirect" => Ok(ReleaseMode::Indirect),
      _ => Err(CutError::Config(ConfigError::InvalidMode { value: s.to_string() })),
    }
  }
}

impl fmt::Display for ReleaseMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseMode::Direct => write!(f, "direct"),
      ReleaseMode::Indirect => write!(f, "indirect"),
    }
  }
}

impl CutConfig {
  /// Find config file in search order: cut.toml, .cut.toml, .cargo/cut.toml, .config/cut.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("cut.toml"),
      path.join(".cut.toml"),
      path.join(".cargo").join("cut.toml"),
      path.join(".config").join("cut.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from the first file found, or defaults when there is none
  pub fn load(path: &Path) -> CutResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      tracing::debug!(root = %path.display(), "no cut.toml found, using defaults");
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: CutConfig = toml_edit::de::from_str(&content).map_err(|e| {
      CutError::Config(ConfigError::Invalid {
        path: config_path.clone(),
        reason: e.to_string(),
      })
    })?;

    if config.release.timeout_secs == 0 {
      return Err(CutError::Config(ConfigError::Invalid {
        path: config_path,
        reason: "release.timeout_secs must be greater than zero".to_string(),
      }));
    }

    tracing::debug!(path = %config_path.display(), "loaded configuration");
    Ok(config)
  }

  /// Resolve the release mode: CLI flag first, then config file, then direct
  pub fn release_mode(&self, flag: Option<&str>) -> CutResult<ReleaseMode> {
    match flag.or(self.release.mode.as_deref()) {
      Some(value) => value.parse(),
      None => Ok(ReleaseMode::default()),
    }
  }
}

/// Read the GitHub token from the environment
pub fn github_token() -> CutResult<String> {
  TOKEN_VARS
    .iter()
    .filter_map(|var| std::env::var(var).ok())
    .map(|v| v.trim().to_string())
    .find(|v| !v.is_empty())
    .ok_or(CutError::Config(ConfigError::MissingToken))
}
