//! Issue-search query builder
//!
//! Renders GitHub search qualifiers space-separated, with the free-text term
//! quoted last: `is:pr is:merged in:title repo:acme/rocket "RELEASE 1.3.0"`.

use std::fmt;

/// Pull request state qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
  Open,
  Merged,
}

impl PrState {
  fn qualifier(self) -> &'static str {
    match self {
      PrState::Open => "is:open",
      PrState::Merged => "is:merged",
    }
  }
}

/// Builder for a search query string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
  qualifiers: Vec<String>,
  term: Option<String>,
}

impl SearchQuery {
  /// Query restricted to pull requests
  pub fn pull_requests() -> Self {
    Self {
      qualifiers: vec!["is:pr".to_string()],
      term: None,
    }
  }

  pub fn state(mut self, state: PrState) -> Self {
    self.qualifiers.push(state.qualifier().to_string());
    self
  }

  /// Match the term against titles only
  pub fn in_title(mut self) -> Self {
    self.qualifiers.push("in:title".to_string());
    self
  }

  pub fn repo(mut self, owner: &str, repo: &str) -> Self {
    self.qualifiers.push(format!("repo:{}/{}", owner, repo));
    self
  }

  pub fn term(mut self, text: impl Into<String>) -> Self {
    self.term = Some(text.into());
    self
  }

  /// Release pull request lookup: exact repository, title search for `title`
  pub fn release_pr(owner: &str, repo: &str, state: PrState, title: &str) -> Self {
    Self::pull_requests().state(state).in_title().repo(owner, repo).term(title)
  }

  pub fn render(&self) -> String {
    let mut parts = self.qualifiers.clone();
    if let Some(term) = &self.term {
      // Quotes inside the term would end the phrase early
      parts.push(format!("\"{}\"", term.replace('"', "")));
    }
    parts.join(" ")
  }
}

impl fmt::Display for SearchQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.render())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_release_pr_query() {
    let query = SearchQuery::release_pr("acme", "rocket", PrState::Merged, "RELEASE 1.3.0");
    assert_eq!(
      query.render(),
      "is:pr is:merged in:title repo:acme/rocket \"RELEASE 1.3.0\""
    );

    let open = SearchQuery::release_pr("acme", "rocket", PrState::Open, "RELEASE 1.3.0");
    assert!(open.to_string().starts_with("is:pr is:open "));
  }

  #[test]
  fn test_term_quotes_stripped() {
    let query = SearchQuery::pull_requests().term("say \"hi\"");
    assert_eq!(query.render(), "is:pr \"say hi\"");
  }
}
