//! Integration tests for `cargo cut semver`

use crate::helpers::{TestWorkspace, run_cargo_cut};
use anyhow::Result;

#[test]
fn test_semver_without_tags() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cargo_cut(&ws.path, &["cut", "semver"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("Current: 0.0.0 (no release tag yet)"), "stdout: {}", stdout);
  assert!(stdout.contains("--patch  0.0.1"));
  Ok(())
}

#[test]
fn test_semver_uses_highest_reachable_tag() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.tag("v1.0.0")?;
  ws.commit("fix: something")?;
  ws.tag("v1.2.0")?;
  ws.commit("feat: more")?;

  let output = run_cargo_cut(&ws.path, &["cut", "semver", "--json"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(report["current"], "1.2.0");
  assert_eq!(report["tag"], "v1.2.0");
  assert_eq!(report["next"]["patch"], "1.2.1");
  assert_eq!(report["next"]["minor"], "1.3.0");
  assert_eq!(report["next"]["major"], "2.0.0");
  Ok(())
}

#[test]
fn test_semver_ignores_non_version_tags() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.tag("v0.4.0")?;
  ws.tag("nightly")?;
  ws.tag("vNext")?;

  let output = run_cargo_cut(&ws.path, &["cut", "semver", "--json"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(report["current"], "0.4.0");
  Ok(())
}
