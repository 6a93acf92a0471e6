//! Concurrent release asset uploads

use crate::build::Artifact;
use crate::core::error::CutResult;
use crate::core::tasks::TaskGroup;
use crate::hosting::Hosting;
use std::sync::Arc;

/// Uploads artifacts to a release, one worker per artifact
pub struct ArtifactPublisher {
  hosting: Arc<dyn Hosting>,
}

impl ArtifactPublisher {
  pub fn new(hosting: Arc<dyn Hosting>) -> Self {
    Self { hosting }
  }

  /// Upload every artifact; the first failure is returned without waiting for the rest
  ///
  /// Nothing is cleaned up on failure. Re-uploading replaces assets by name.
  pub fn upload(&self, release_id: u64, artifacts: &[Artifact]) -> CutResult<()> {
    if artifacts.is_empty() {
      return Ok(());
    }

    let mut group = TaskGroup::new("upload");
    for artifact in artifacts {
      let hosting = Arc::clone(&self.hosting);
      let artifact = artifact.clone();
      group.spawn(artifact.label.clone(), move |token| {
        if token.is_cancelled() {
          return Ok(());
        }
        tracing::debug!(path = %artifact.path.display(), label = %artifact.label, "uploading asset");
        hosting.upload_release_asset(release_id, &artifact.path, &artifact.label)
      })?;
    }

    group.wait_all()?;
    Ok(())
  }
}
