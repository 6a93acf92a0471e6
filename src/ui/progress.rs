//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free, concurrency-optimized progress bars

use linya::{Bar, Progress};
use std::sync::{Arc, Mutex, PoisonError};

/// Multi-bar progress for parallel operations
/// Thread-safe wrapper for concurrent progress tracking
#[derive(Clone)]
pub struct MultiProgress {
  progress: Arc<Mutex<Progress>>,
}

impl MultiProgress {
  /// Create a new multi-progress container
  pub fn new() -> Self {
    Self {
      progress: Arc::new(Mutex::new(Progress::new())),
    }
  }

  /// Add a new bar with a label and total
  pub fn add_bar(&self, total: usize, label: impl Into<String>) -> Bar {
    let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
    progress.bar(total, label.into())
  }

  /// Increment a bar (thread-safe)
  pub fn inc(&self, bar: &Bar) {
    let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
    progress.inc_and_draw(bar, 1);
  }
}

impl Default for MultiProgress {
  fn default() -> Self {
    Self::new()
  }
}
