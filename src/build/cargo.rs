//! Cargo cross-builds
//!
//! Builds every configured target triple in parallel with
//! `cargo build --release --target`, copies each binary into the output
//! directory as `{bin}-{version}-{target}[.exe]`, and optionally writes a
//! `.sha256` file next to it. The output directory defaults to `cut/` inside
//! cargo's target directory.

use super::{Artifact, Builder};
use crate::core::config::BuildSettings;
use crate::core::context::ReleaseContext;
use crate::core::error::{BuildError, CutError, CutResult, ResultExt};
use crate::ui::progress::MultiProgress;
use cargo_metadata::{Metadata, MetadataCommand};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Builder for the Cargo project at the repository root
pub struct CargoBuilder {
  root: PathBuf,
  settings: BuildSettings,
}

impl CargoBuilder {
  pub fn new(root: impl Into<PathBuf>, settings: BuildSettings) -> Self {
    Self {
      root: root.into(),
      settings,
    }
  }

  fn metadata(&self) -> CutResult<Metadata> {
    let metadata = MetadataCommand::new()
      .manifest_path(self.root.join("Cargo.toml"))
      .no_deps()
      .exec()?;
    Ok(metadata)
  }

  /// Binary targets to ship, sorted and de-duplicated
  pub fn binaries(&self, metadata: &Metadata) -> Vec<String> {
    let mut bins: Vec<String> = metadata
      .workspace_packages()
      .into_iter()
      .flat_map(|pkg| pkg.targets.iter())
      .filter(|target| target.is_bin())
      .map(|target| target.name.clone())
      .filter(|name| self.settings.bins.is_empty() || self.settings.bins.contains(name))
      .collect();
    bins.sort();
    bins.dedup();
    bins
  }

  /// Configured output directory, else `{target_dir}/cut`
  pub fn out_dir(&self, target_dir: &Path) -> PathBuf {
    match &self.settings.out_dir {
      Some(dir) => self.root.join(dir),
      None => target_dir.join("cut"),
    }
  }

  /// Target triples to build; the host triple when none are configured
  fn targets(&self) -> CutResult<Vec<String>> {
    if !self.settings.targets.is_empty() {
      return Ok(self.settings.targets.clone());
    }
    Ok(vec![host_triple()?])
  }

  fn build_target(
    &self,
    ctx: &ReleaseContext,
    target: &str,
    bins: &[String],
    target_dir: &Path,
    progress: &MultiProgress,
  ) -> CutResult<()> {
    let bar = progress.add_bar(bins.len() + 1, format!("Building {}", target));

    let mut cmd = Command::new(cargo_bin());
    cmd
      .current_dir(&self.root)
      .args(["build", "--release", "--target", target]);
    for bin in bins {
      cmd.args(["--bin", bin]);
    }

    tracing::debug!(target, ?bins, "cargo build");
    let output = cmd.output().context("Failed to run cargo build")?;
    if !output.status.success() {
      return Err(CutError::Build(BuildError::CommandFailed {
        target: target.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }
    progress.inc(&bar);

    let out_dir = self.out_dir(target_dir);
    fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let suffix = exe_suffix(target);
    for bin in bins {
      let built = target_dir.join(target).join("release").join(format!("{}{}", bin, suffix));
      if !built.exists() {
        return Err(CutError::Build(BuildError::ArtifactMissing { path: built }));
      }

      let shipped = out_dir.join(format!("{}-{}-{}{}", bin, ctx.version, target, suffix));
      fs::copy(&built, &shipped).with_context(|| format!("Failed to copy {}", built.display()))?;
      ctx.push_artifact(Artifact::new(&shipped, format!("{} ({})", bin, target)));

      if self.settings.checksums {
        let checksum = write_checksum(&shipped)?;
        ctx.push_artifact(Artifact::new(checksum, format!("{} ({}) SHA-256", bin, target)));
      }
      progress.inc(&bar);
    }

    Ok(())
  }
}

impl Builder for CargoBuilder {
  fn probe(&self) -> bool {
    if !self.root.join("Cargo.toml").exists() {
      return false;
    }
    match self.metadata() {
      Ok(metadata) => !self.binaries(&metadata).is_empty(),
      Err(e) => {
        tracing::warn!(error = %e, "cargo metadata failed, skipping artifact build");
        false
      }
    }
  }

  fn run(&self, ctx: &ReleaseContext) -> CutResult<()> {
    let metadata = self.metadata()?;
    let bins = self.binaries(&metadata);
    let targets = self.targets()?;
    let target_dir = metadata.target_directory.as_std_path().to_path_buf();
    let progress = MultiProgress::new();

    targets
      .par_iter()
      .try_for_each(|target| self.build_target(ctx, target, &bins, &target_dir, &progress))
  }
}

fn cargo_bin() -> OsString {
  std::env::var_os("CARGO").unwrap_or_else(|| OsString::from("cargo"))
}

fn host_triple() -> CutResult<String> {
  let output = Command::new("rustc").arg("-vV").output().context("Failed to run rustc -vV")?;
  String::from_utf8_lossy(&output.stdout)
    .lines()
    .find_map(|line| line.strip_prefix("host: "))
    .map(|host| host.trim().to_string())
    .ok_or_else(|| {
      CutError::Build(BuildError::CommandFailed {
        target: "host".to_string(),
        stderr: "rustc -vV did not report a host triple".to_string(),
      })
    })
}

fn exe_suffix(target: &str) -> &'static str {
  if target.contains("windows") { ".exe" } else { "" }
}

/// Write `{file}.sha256` in `sha256sum` format and return its path
pub fn write_checksum(path: &Path) -> CutResult<PathBuf> {
  let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let digest = Sha256::digest(&bytes);
  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();

  let mut checksum_path = path.as_os_str().to_owned();
  checksum_path.push(".sha256");
  let checksum_path = PathBuf::from(checksum_path);

  fs::write(&checksum_path, format!("{:x}  {}\n", digest, file_name))
    .with_context(|| format!("Failed to write {}", checksum_path.display()))?;
  Ok(checksum_path)
}
