//! Temporary relaxation of default-branch protection
//!
//! Direct releases push straight to the protected default branch, which needs
//! admin enforcement turned off for the duration of the push. The relaxation
//! is scoped: [`with_protection_relaxed`] re-enables enforcement exactly once
//! whichever way the body exits, and [`ProtectionGuard`]'s `Drop` covers a
//! panic unwinding through the scope.

use crate::core::error::{CutError, CutResult, print_error};
use crate::hosting::Hosting;
use crate::ui::output;
use std::sync::Arc;

/// Re-enables admin enforcement on a branch when restored or dropped
pub struct ProtectionGuard {
  hosting: Arc<dyn Hosting>,
  branch: String,
  armed: bool,
}

impl ProtectionGuard {
  /// Arm a guard for `branch`; nothing is changed on GitHub yet
  pub fn new(hosting: Arc<dyn Hosting>, branch: impl Into<String>) -> Self {
    Self {
      hosting,
      branch: branch.into(),
      armed: true,
    }
  }

  /// Re-enable protection now
  ///
  /// Runs regardless of the invocation deadline.
  pub fn restore(mut self) -> CutResult<()> {
    self.armed = false;
    self.enable()
  }

  fn enable(&self) -> CutResult<()> {
    output::step(format!("Re-enabling branch protection on {}", self.branch));
    self.hosting.set_branch_protection(&self.branch, true)
  }
}

impl Drop for ProtectionGuard {
  fn drop(&mut self) {
    if !self.armed {
      return;
    }
    self.armed = false;
    tracing::warn!(branch = %self.branch, "restoring branch protection during unwind");
    if let Err(e) = self.enable() {
      print_error(&CutError::Compensation {
        branch: self.branch.clone(),
        restore: Box::new(e),
        original: None,
      });
    }
  }
}

/// Run `body` with admin enforcement on `branch` disabled
///
/// Enforcement is re-enabled exactly once afterwards, on success, on error
/// and on panic. A failed re-enable is returned as `CutError::Compensation`
/// carrying the body's own error, if it had one.
pub fn with_protection_relaxed<T>(
  hosting: &Arc<dyn Hosting>,
  branch: &str,
  body: impl FnOnce() -> CutResult<T>,
) -> CutResult<T> {
  let guard = ProtectionGuard::new(Arc::clone(hosting), branch);

  output::step(format!("Disabling branch protection on {}", branch));
  // A failed disable may still have landed server-side, so the guard restores either way.
  let outcome = hosting.set_branch_protection(branch, false).and_then(|()| body());

  match (outcome, guard.restore()) {
    (Ok(value), Ok(())) => Ok(value),
    (Err(original), Ok(())) => Err(original),
    (outcome, Err(restore)) => {
      tracing::error!(branch, error = %restore, "failed to re-enable branch protection");
      Err(CutError::Compensation {
        branch: branch.to_string(),
        restore: Box::new(restore),
        original: outcome.err().map(Box::new),
      })
    }
  }
}
