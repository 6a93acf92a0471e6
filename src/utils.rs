//! Utility functions for remote URLs and cross-platform paths

use crate::core::vcs::RemoteInfo;
use std::path::Path;

/// Check if a path is a local filesystem path (not a remote URL)
///
/// Returns true for:
/// - Absolute paths on Unix: /path/to/repo
/// - Absolute paths on Windows: C:\path\to\repo or C:/path/to/repo
/// - Relative paths: ./path or ../path
/// - UNC paths on Windows: \\server\share
///
/// Returns false for:
/// - SSH URLs: git@github.com:user/repo.git
/// - HTTPS URLs: <https://github.com/user/repo.git>
pub fn is_local_path(path: &str) -> bool {
  let p = Path::new(path);

  if path.starts_with("./") || path.starts_with("../") {
    return true;
  }

  // Windows drive letter (C:\ or C:/); must come before the URL check
  if path.len() >= 3 {
    let bytes = path.as_bytes();
    if bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'\\' || bytes[2] == b'/') {
      return true;
    }
  }

  if path.starts_with("\\\\") {
    return true;
  }

  // Unix absolute paths; Path::is_absolute() is false for these on Windows
  if path.starts_with('/') && !path.contains("://") && !path.contains('@') {
    return true;
  }

  if p.is_absolute() {
    return true;
  }

  if path.starts_with("file://") {
    return true;
  }

  false
}

/// Parse a git remote URL into host and `owner/repo` path
///
/// Accepts the three shapes git remotes take in practice:
/// - scp-like SSH: `git@github.com:owner/repo.git`
/// - SSH URL: `ssh://git@github.com/owner/repo.git` (with optional port)
/// - HTTP(S): `https://github.com/owner/repo.git` (with optional credentials)
///
/// Local paths and anything without an `owner/repo` pair return `None`.
pub fn parse_remote_url(url: &str) -> Option<RemoteInfo> {
  let url = url.trim();
  if url.is_empty() || is_local_path(url) {
    return None;
  }

  let (host, path) = if let Some((scheme, rest)) = url.split_once("://") {
    if !matches!(scheme, "ssh" | "git" | "http" | "https" | "git+ssh") {
      return None;
    }
    let (authority, path) = rest.split_once('/')?;
    let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let host = host.split_once(':').map(|(h, _)| h).unwrap_or(host);
    (host, path)
  } else {
    // scp-like syntax: [user@]host:path
    let (authority, path) = url.split_once(':')?;
    let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    (host, path)
  };

  let path = path.trim_matches('/');
  let path = path.strip_suffix(".git").unwrap_or(path);

  let mut segments = path.split('/');
  let owner = segments.next().filter(|s| !s.is_empty())?;
  let repo = segments.next().filter(|s| !s.is_empty())?;
  if segments.next().is_some() || host.is_empty() {
    return None;
  }

  Some(RemoteInfo {
    domain: host.to_ascii_lowercase(),
    path: format!("{}/{}", owner, repo),
  })
}

/// Convert a path to Git format (always forward slashes)
///
/// Git expects paths with forward slashes, even on Windows.
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}
