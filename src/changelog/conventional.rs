//! Changelog generation from conventional commits
//!
//! Deterministic, zero-panic parser built on winnow. Commits that don't follow
//! the convention are listed under "Other" by their subject line.

use super::{ChangelogGenerator, ChangelogSpec};
use crate::core::error::{CutError, CutResult};
use crate::core::vcs::Vcs;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::sync::Arc;

const CHANGELOG_HEADER: &str = "# Changelog";

/// A parsed conventional commit
///
/// Format: `<type>(<scope>): <description>`
///
/// Example: `feat(auth): add OAuth2 support`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
  /// Commit type (feat, fix, chore, docs, etc.)
  pub commit_type: CommitType,
  /// Optional scope (e.g., "auth", "api", "core")
  pub scope: Option<String>,
  /// Short description
  pub description: String,
  /// Breaking change footer (optional)
  pub breaking_change: Option<String>,
  /// Other footers (e.g., "Closes: #123")
  pub footers: Vec<(String, String)>,
}

/// Conventional commit types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommitType {
  /// New feature
  Feat,
  /// Bug fix
  Fix,
  /// Documentation changes
  Docs,
  /// Code style changes (formatting, etc.)
  Style,
  /// Refactoring (no functional changes)
  Refactor,
  /// Performance improvements
  Perf,
  /// Test additions or changes
  Test,
  /// Build system or external dependency changes
  Build,
  /// CI configuration changes
  Ci,
  /// Chores (maintenance tasks)
  Chore,
  /// Reverts a previous commit
  Revert,
  /// Other/unknown type
  Other,
}

impl CommitType {
  /// Map a commit type keyword
  pub fn from_keyword(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "feat" | "feature" => Self::Feat,
      "fix" => Self::Fix,
      "docs" | "doc" => Self::Docs,
      "style" => Self::Style,
      "refactor" => Self::Refactor,
      "perf" | "performance" => Self::Perf,
      "test" | "tests" => Self::Test,
      "build" => Self::Build,
      "ci" => Self::Ci,
      "chore" => Self::Chore,
      "revert" => Self::Revert,
      _ => Self::Other,
    }
  }

  /// Get the display name for this commit type
  pub fn display_name(&self) -> &'static str {
    match self {
      Self::Feat => "Features",
      Self::Fix => "Bug Fixes",
      Self::Docs => "Documentation",
      Self::Style => "Style",
      Self::Refactor => "Refactoring",
      Self::Perf => "Performance",
      Self::Test => "Tests",
      Self::Build => "Build",
      Self::Ci => "CI",
      Self::Chore => "Chores",
      Self::Revert => "Reverts",
      Self::Other => "Other",
    }
  }
}

impl fmt::Display for CommitType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.display_name())
  }
}

impl ConventionalCommit {
  /// Issue references from `Closes`/`Fixes`/`Resolves`/`Refs` footers
  pub fn references(&self) -> Vec<&str> {
    self
      .footers
      .iter()
      .filter(|(key, _)| {
        ["closes", "fixes", "resolves", "refs"]
          .iter()
          .any(|k| key.eq_ignore_ascii_case(k))
      })
      .flat_map(|(_, value)| value.split([',', ' ']))
      .map(str::trim)
      .filter(|r| !r.is_empty())
      .collect()
  }

  /// A non-conventional commit, listed by its subject line
  pub fn other(message: &str) -> Self {
    Self {
      commit_type: CommitType::Other,
      scope: None,
      description: message.lines().next().unwrap_or("").trim().to_string(),
      breaking_change: None,
      footers: Vec::new(),
    }
  }

  /// Parse a conventional commit from a git commit message
  ///
  /// Returns None if the message doesn't follow conventional commit format.
  pub fn parse(message: &str) -> Option<Self> {
    use winnow::ascii::{alphanumeric1, space0};
    use winnow::combinator::{opt, preceded, terminated};
    use winnow::prelude::*;
    use winnow::token::take_till;

    let (first_line, rest) = message.split_once('\n').unwrap_or((message, ""));

    // type(scope)!: description
    let mut parser = (
      alphanumeric1::<_, ()>.map(|s: &str| CommitType::from_keyword(s)),
      opt(preceded('(', terminated(take_till(1.., ')'), ')'))),
      opt('!'),
      ':',
      space0,
      take_till(0.., ['\n', '\r']),
    );

    let Ok((commit_type, scope, breaking_indicator, _, _, description)) = parser.parse(first_line) else {
      return None;
    };

    let mut breaking_change = None;
    let mut footers = Vec::new();

    let mut in_body = true;
    let mut seen_empty_line = false;

    for line in rest.lines() {
      let trimmed = line.trim();

      // Empty lines separate body from footers
      if trimmed.is_empty() {
        seen_empty_line = true;
        continue;
      }

      // Footers ("Key: value" or "BREAKING CHANGE: ...") only follow an empty line
      if seen_empty_line && let Some((key, value)) = trimmed.split_once(':') {
        let key_trimmed = key.trim();
        let value_trimmed = value.trim();

        if key_trimmed.eq_ignore_ascii_case("BREAKING CHANGE") || key_trimmed.eq_ignore_ascii_case("BREAKING-CHANGE") {
          breaking_change = Some(value_trimmed.to_string());
          in_body = false;
          continue;
        } else if key_trimmed.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
          footers.push((key_trimmed.to_string(), value_trimmed.to_string()));
          in_body = false;
          continue;
        }
      }

      // Body text is not rendered
      if in_body {
        seen_empty_line = false;
      }
    }

    if breaking_change.is_none() && breaking_indicator.is_some() {
      breaking_change = Some(String::new());
    }

    Some(Self {
      commit_type,
      scope: scope.map(|s: &str| s.to_string()),
      description: description.trim().to_string(),
      breaking_change,
      footers,
    })
  }
}

/// One rendered changelog section
#[derive(Debug, Clone)]
pub struct Changelog {
  /// Tag this section describes
  pub tag: String,
  /// Date of the release (ISO 8601)
  pub date: String,
  /// Grouped commits by type
  pub commits_by_type: BTreeMap<CommitType, Vec<ConventionalCommit>>,
}

impl Changelog {
  pub fn new(tag: impl Into<String>, date: impl Into<String>) -> Self {
    Self {
      tag: tag.into(),
      date: date.into(),
      commits_by_type: BTreeMap::new(),
    }
  }

  /// Add a commit message; release commits made by this tool are skipped
  pub fn add_message(&mut self, message: &str) {
    let subject = message.lines().next().unwrap_or("").trim();
    if subject.is_empty() || is_release_commit(subject) {
      return;
    }
    let commit = ConventionalCommit::parse(message).unwrap_or_else(|| ConventionalCommit::other(message));
    self.commits_by_type.entry(commit.commit_type).or_default().push(commit);
  }

  pub fn is_empty(&self) -> bool {
    self.commits_by_type.values().all(Vec::is_empty)
  }

  /// Section heading, also used to find an earlier render of the same tag
  pub fn heading(&self) -> String {
    format!("## [{}] - {}", self.tag, self.date)
  }

  /// Render as markdown
  pub fn to_markdown(&self) -> String {
    let mut output = String::new();

    output.push_str(&self.heading());
    output.push_str("\n\n");

    if self.is_empty() {
      output.push_str("No notable changes.\n\n");
      return output;
    }

    let ordered_types = [
      CommitType::Feat,
      CommitType::Fix,
      CommitType::Perf,
      CommitType::Docs,
      CommitType::Refactor,
      CommitType::Test,
      CommitType::Build,
      CommitType::Ci,
      CommitType::Chore,
      CommitType::Style,
      CommitType::Revert,
      CommitType::Other,
    ];

    for commit_type in &ordered_types {
      let Some(commits) = self.commits_by_type.get(commit_type) else {
        continue;
      };
      if commits.is_empty() {
        continue;
      }

      output.push_str(&format!("### {}\n\n", commit_type.display_name()));

      for commit in commits {
        let scope_str = commit
          .scope
          .as_ref()
          .map(|s| format!("**{}**: ", s))
          .unwrap_or_default();

        let references = commit.references();
        if references.is_empty() {
          output.push_str(&format!("- {}{}\n", scope_str, commit.description));
        } else {
          output.push_str(&format!("- {}{} ({})\n", scope_str, commit.description, references.join(", ")));
        }

        if let Some(ref breaking) = commit.breaking_change {
          if !breaking.is_empty() {
            output.push_str(&format!("  - **BREAKING**: {}\n", breaking));
          } else {
            output.push_str("  - **BREAKING CHANGE**\n");
          }
        }
      }

      output.push('\n');
    }

    output
  }
}

fn is_release_commit(subject: &str) -> bool {
  subject
    .strip_prefix("Release v")
    .is_some_and(|rest| semver::Version::parse(rest).is_ok())
}

/// Insert `section` at the top of an existing changelog document
///
/// A section previously rendered for the same tag is replaced, so a re-run
/// doesn't list the release twice.
pub fn prepend_section(existing: &str, tag: &str, section: &str) -> String {
  let marker = format!("## [{}]", tag);
  let mut kept = Vec::new();
  let mut skipping = false;
  for line in existing.lines() {
    if line.starts_with(&marker) {
      skipping = true;
      continue;
    }
    if skipping && line.starts_with("## ") {
      skipping = false;
    }
    if !skipping {
      kept.push(line);
    }
  }

  let body = kept.join("\n");
  let rest = body
    .strip_prefix(CHANGELOG_HEADER)
    .map(str::trim_start)
    .unwrap_or_else(|| body.trim_start());

  let mut output = format!("{}\n\n{}", CHANGELOG_HEADER, section.trim_end());
  if !rest.is_empty() {
    output.push_str("\n\n");
    output.push_str(rest.trim_end());
  }
  output.push('\n');
  output
}

/// The section rendered for `tag` in a changelog document, without trailing blank lines
pub fn find_section(document: &str, tag: &str) -> Option<String> {
  let marker = format!("## [{}]", tag);
  let mut lines = document.lines().skip_while(|line| !line.starts_with(&marker));
  let heading = lines.next()?;

  let mut section = vec![heading];
  section.extend(lines.take_while(|line| !line.starts_with("## ")));
  Some(section.join("\n").trim_end().to_string())
}

/// Production generator: commits since the previous tag, grouped by type
pub struct ConventionalChangelog {
  vcs: Arc<dyn Vcs>,
}

impl ConventionalChangelog {
  pub fn new(vcs: Arc<dyn Vcs>) -> Self {
    Self { vcs }
  }

  /// Render the section for `spec` without touching the file
  pub fn render(&self, spec: &ChangelogSpec) -> CutResult<Changelog> {
    let commits = self
      .vcs
      .commits_since(spec.previous_tag.as_deref())
      .map_err(|e| CutError::Changelog(format!("failed to read commits: {}", e)))?;

    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let mut changelog = Changelog::new(spec.tag.clone(), date);
    for commit in &commits {
      changelog.add_message(&commit.message);
    }

    tracing::debug!(
      tag = %spec.tag,
      since = spec.previous_tag.as_deref().unwrap_or("<root>"),
      commits = commits.len(),
      "rendered changelog"
    );
    Ok(changelog)
  }
}

impl ChangelogGenerator for ConventionalChangelog {
  fn generate(&self, spec: &ChangelogSpec) -> CutResult<String> {
    let changelog = self.render(spec)?;
    let section = changelog.to_markdown();

    let path = self.vcs.work_tree().join(&spec.path);
    let existing = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
      Err(e) => return Err(CutError::Changelog(format!("failed to read {}: {}", path.display(), e))),
    };

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)
        .map_err(|e| CutError::Changelog(format!("failed to create {}: {}", parent.display(), e)))?;
    }
    fs::write(&path, prepend_section(&existing, &spec.tag, &section))
      .map_err(|e| CutError::Changelog(format!("failed to write {}: {}", path.display(), e)))?;

    Ok(section.trim_end().to_string())
  }

  fn committed(&self, spec: &ChangelogSpec) -> CutResult<Option<String>> {
    let path = self.vcs.work_tree().join(&spec.path);
    match fs::read_to_string(&path) {
      Ok(content) => Ok(find_section(&content, &spec.tag)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(CutError::Changelog(format!("failed to read {}: {}", path.display(), e))),
    }
  }
}
