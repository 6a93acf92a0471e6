//! Release artifact builds

pub mod cargo;

pub use cargo::CargoBuilder;

use crate::core::context::ReleaseContext;
use crate::core::error::CutResult;
use std::path::PathBuf;

/// A file to attach to the release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  pub path: PathBuf,
  /// Display label shown on the release page
  pub label: String,
}

impl Artifact {
  pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      label: label.into(),
    }
  }
}

/// Produces release artifacts
pub trait Builder: Send + Sync {
  /// Whether there is anything to build; `false` skips the build step
  fn probe(&self) -> bool;

  /// Build everything, appending each artifact to `ctx`
  fn run(&self, ctx: &ReleaseContext) -> CutResult<()>;
}
