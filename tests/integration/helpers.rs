//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A Cargo project in a fresh git repository
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a binary package `rocket` with one commit on `main`
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;
    git(&path, &["config", "tag.gpgsign", "false"])?;

    std::fs::write(
      path.join("Cargo.toml"),
      r#"[package]
name = "rocket"
version = "0.1.0"
edition = "2021"
"#,
    )?;
    std::fs::create_dir_all(path.join("src"))?;
    std::fs::write(path.join("src/main.rs"), "fn main() {}\n")?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "feat: initial project"])?;

    Ok(Self { _root: root, path })
  }

  /// Commit current changes
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "--allow-empty", "-m", message])?;

    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  pub fn tag(&self, name: &str) -> Result<()> {
    git(&self.path, &["tag", "-a", name, "-m", name])?;
    Ok(())
  }

  pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
    git(&self.path, &["remote", "add", name, url])?;
    Ok(())
  }

  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let full = self.path.join(path);
    if let Some(parent) = full.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(full, content)?;
    Ok(())
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Tags in the repository
  pub fn tags(&self) -> Result<Vec<String>> {
    let output = git(&self.path, &["tag", "--list"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect(),
    )
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

fn cargo_cut_cmd(cwd: &Path, args: &[&str], token: Option<&str>) -> Command {
  let mut cmd = Command::new(env!("CARGO_BIN_EXE_cargo-cut"));
  cmd.current_dir(cwd).args(args);
  cmd.env_remove("GITHUB_TOKEN").env_remove("GH_TOKEN").env_remove("RUST_LOG");
  if let Some(token) = token {
    cmd.env("GITHUB_TOKEN", token);
  }
  cmd
}

/// Run cargo-cut and require success
pub fn run_cargo_cut(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = cargo_cut_cmd(cwd, args, None)
    .output()
    .context("Failed to run cargo-cut")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "cargo-cut command failed: cargo {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run cargo-cut expecting failure; returns the exit code and stderr
pub fn run_cargo_cut_failing(cwd: &Path, args: &[&str], token: Option<&str>) -> Result<(i32, String)> {
  let output = cargo_cut_cmd(cwd, args, token)
    .output()
    .context("Failed to run cargo-cut")?;

  if output.status.success() {
    anyhow::bail!("cargo-cut unexpectedly succeeded: cargo {}", args.join(" "));
  }

  let code = output.status.code().context("cargo-cut was killed by a signal")?;
  Ok((code, String::from_utf8_lossy(&output.stderr).to_string()))
}
