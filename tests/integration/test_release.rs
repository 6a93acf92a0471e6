//! Integration tests for `cargo cut release`
//!
//! These stop before the first GitHub call succeeds, so they run offline.

use crate::helpers::{TestWorkspace, run_cargo_cut_failing};
use anyhow::Result;

#[test]
fn test_unknown_mode_exits_3() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let (code, stderr) = run_cargo_cut_failing(&ws.path, &["cut", "release", "--mode", "sideways"], Some("t0ken"))?;
  assert_eq!(code, 3);
  assert!(stderr.contains("Invalid release mode 'sideways'"), "stderr: {}", stderr);
  Ok(())
}

#[test]
fn test_unknown_mode_in_config_exits_3() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file("cut.toml", "[release]\nmode = \"sideways\"\n")?;

  let (code, _) = run_cargo_cut_failing(&ws.path, &["cut", "release"], Some("t0ken"))?;
  assert_eq!(code, 3);
  Ok(())
}

#[test]
fn test_missing_token_exits_2() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_remote("origin", "git@github.com:acme/rocket.git")?;

  let (code, stderr) = run_cargo_cut_failing(&ws.path, &["cut", "release", "--minor"], None)?;
  assert_eq!(code, 2);
  assert!(stderr.contains("GITHUB_TOKEN"), "stderr: {}", stderr);
  Ok(())
}

#[test]
fn test_malformed_config_exits_2() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file(".config/cut.toml", "[release\nmode = ")?;

  let (code, stderr) = run_cargo_cut_failing(&ws.path, &["cut", "release"], Some("t0ken"))?;
  assert_eq!(code, 2);
  assert!(stderr.contains("cut.toml"), "stderr: {}", stderr);
  Ok(())
}

#[test]
fn test_local_path_remote_is_unsupported() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let bare = tempfile::TempDir::new()?;
  ws.add_remote("origin", &bare.path().display().to_string())?;

  let (code, stderr) = run_cargo_cut_failing(&ws.path, &["cut", "release"], Some("t0ken"))?;
  assert_eq!(code, 2);
  assert!(stderr.contains("Unsupported remote URL"), "stderr: {}", stderr);
  Ok(())
}

#[test]
fn test_missing_remote_exits_5() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let (code, stderr) = run_cargo_cut_failing(&ws.path, &["cut", "release"], Some("t0ken"))?;
  assert_eq!(code, 5);
  assert!(stderr.contains("Git remote 'origin' not found"), "stderr: {}", stderr);
  Ok(())
}

#[test]
fn test_outside_git_repository_exits_5() -> Result<()> {
  let dir = tempfile::TempDir::new()?;

  let (code, _) = run_cargo_cut_failing(dir.path(), &["cut", "release"], Some("t0ken"))?;
  assert_eq!(code, 5);
  Ok(())
}

#[test]
fn test_unreachable_github_exits_6_without_touching_repo() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.tag("v1.2.0")?;
  // Enterprise-style host on loopback: the API request is refused
  ws.add_remote("origin", "https://127.0.0.1/acme/rocket.git")?;

  let (code, stderr) = run_cargo_cut_failing(&ws.path, &["cut", "release", "--minor", "--dry-run"], Some("t0ken"))?;
  assert_eq!(code, 6, "stderr: {}", stderr);
  assert!(!ws.file_exists("CHANGELOG.md"));
  assert_eq!(ws.tags()?, vec!["v1.2.0".to_string()]);
  Ok(())
}
