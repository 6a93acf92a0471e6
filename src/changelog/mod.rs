//! Changelog generation
//!
//! The release workflow asks a [`ChangelogGenerator`] for the notes of one
//! future tag. The production generator groups conventional commits and
//! prepends the rendered section to the changelog file.

pub mod conventional;

pub use conventional::ConventionalChangelog;

use crate::core::error::CutResult;
use std::path::PathBuf;

/// What to render: the changelog file and the tag range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogSpec {
  /// Changelog file, relative to the repository root
  pub path: PathBuf,
  /// Tag the release will get (it need not exist yet)
  pub tag: String,
  /// Previous release tag; `None` renders the whole history
  pub previous_tag: Option<String>,
}

impl ChangelogSpec {
  pub fn new(path: impl Into<PathBuf>, tag: impl Into<String>, previous_tag: Option<String>) -> Self {
    Self {
      path: path.into(),
      tag: tag.into(),
      previous_tag,
    }
  }
}

/// Renders release notes for a future tag
pub trait ChangelogGenerator: Send + Sync {
  /// Render the notes for `spec.tag`, update the changelog file, and return the new section
  fn generate(&self, spec: &ChangelogSpec) -> CutResult<String>;

  /// The section for `spec.tag` already in the changelog file, if any
  ///
  /// Used when resuming a release whose commit was made by an earlier run.
  fn committed(&self, spec: &ChangelogSpec) -> CutResult<Option<String>>;
}
