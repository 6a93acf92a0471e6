//! `cargo cut semver`: current version and the next candidates

use crate::core::error::CutResult;
use crate::core::vcs::{SystemGit, Vcs};
use crate::release::version::{BumpKind, GitTagVersionSource, SemVer, VersionSource};
use serde::Serialize;
use std::env;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct VersionReport {
  current: String,
  tag: Option<String>,
  next: NextVersions,
}

#[derive(Debug, Serialize)]
struct NextVersions {
  patch: String,
  minor: String,
  major: String,
}

impl VersionReport {
  fn new(current: &SemVer) -> Self {
    Self {
      current: current.to_string(),
      tag: (!current.is_initial()).then(|| current.tag_name()),
      next: NextVersions {
        patch: current.bump(BumpKind::Patch).to_string(),
        minor: current.bump(BumpKind::Minor).to_string(),
        major: current.bump(BumpKind::Major).to_string(),
      },
    }
  }
}

/// Run the semver command
pub fn run_semver(json: bool) -> CutResult<()> {
  let workspace_root = env::current_dir()?;
  let vcs: Arc<dyn Vcs> = Arc::new(SystemGit::open(&workspace_root, "origin")?);
  let current = GitTagVersionSource::new(vcs).current_version()?;
  let report = VersionReport::new(&current);

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  match &report.tag {
    Some(tag) => println!("Current: {} ({})", report.current, tag),
    None => println!("Current: {} (no release tag yet)", report.current),
  }
  println!();
  println!("  --patch  {}", report.next.patch);
  println!("  --minor  {}", report.next.minor);
  println!("  --major  {}", report.next.major);
  Ok(())
}
