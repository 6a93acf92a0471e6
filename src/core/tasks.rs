//! Fan-out task group with first-error cancellation
//!
//! One OS thread per unit of work, a shared [`CancelToken`], and an mpsc
//! channel back to the caller. The caller stops listening as soon as it has
//! an answer (first error, or first match for searches), cancels the token,
//! and returns without joining the remaining workers. Workers check the token
//! before starting and may poll it while running; anything they send after
//! the caller returned is dropped with the channel.

use crate::core::error::{CutError, CutResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
  cancelled: Arc<AtomicBool>,
}

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::SeqCst)
  }
}

/// Message from a worker: `None` when it observed cancellation and skipped its work
type Report<T> = Option<CutResult<T>>;

/// A group of detached workers sharing one cancellation token
pub struct TaskGroup<T> {
  label: String,
  token: CancelToken,
  tx: Option<mpsc::Sender<Report<T>>>,
  rx: mpsc::Receiver<Report<T>>,
  spawned: usize,
}

impl<T: Send + 'static> TaskGroup<T> {
  pub fn new(label: impl Into<String>) -> Self {
    let (tx, rx) = mpsc::channel();
    Self {
      label: label.into(),
      token: CancelToken::new(),
      tx: Some(tx),
      rx,
      spawned: 0,
    }
  }

  /// Token shared with every worker of this group
  #[cfg(test)]
  pub fn token(&self) -> CancelToken {
    self.token.clone()
  }

  /// Spawn one worker
  pub fn spawn<F>(&mut self, name: impl Into<String>, task: F) -> CutResult<()>
  where
    F: FnOnce(&CancelToken) -> CutResult<T> + Send + 'static,
  {
    let tx = self
      .tx
      .clone()
      .ok_or_else(|| CutError::message(format!("task group '{}' is already collecting", self.label)))?;
    let token = self.token.clone();
    let name = name.into();

    thread::Builder::new().name(format!("{}:{}", self.label, name)).spawn(move || {
      if token.is_cancelled() {
        let _ = tx.send(None);
        return;
      }
      let result = task(&token);
      // The receiver may already be gone; late results are dropped on purpose.
      let _ = tx.send(Some(result));
    })?;

    self.spawned += 1;
    Ok(())
  }

  /// Wait until every worker succeeded, or return the first error right away
  pub fn wait_all(mut self) -> CutResult<Vec<T>> {
    self.close();
    let mut results = Vec::with_capacity(self.spawned);
    for report in self.reports() {
      match report? {
        Some(Ok(value)) => results.push(value),
        Some(Err(err)) => {
          self.token.cancel();
          tracing::debug!(group = %self.label, error = %err, "task failed, cancelling siblings");
          return Err(err);
        }
        None => {}
      }
    }
    Ok(results)
  }

  /// Stop accepting workers
  ///
  /// Only workers hold senders from here on, so a worker that panicked
  /// surfaces as a disconnected channel instead of a hang.
  fn close(&mut self) {
    self.tx = None;
  }

  fn reports(&self) -> Reports<'_, T> {
    Reports {
      group: self,
      remaining: self.spawned,
    }
  }
}

impl<U: Send + 'static> TaskGroup<Option<U>> {
  /// Return the first `Some` any worker produced, cancelling the rest
  ///
  /// An error from any worker that reports before a match ends the search.
  pub fn find_first(mut self) -> CutResult<Option<U>> {
    self.close();
    for report in self.reports() {
      match report? {
        Some(Ok(Some(found))) => {
          self.token.cancel();
          return Ok(Some(found));
        }
        Some(Err(err)) => {
          self.token.cancel();
          return Err(err);
        }
        Some(Ok(None)) | None => {}
      }
    }
    Ok(None)
  }
}

impl<T> Drop for TaskGroup<T> {
  fn drop(&mut self) {
    self.token.cancel();
  }
}

/// Iterator over worker reports; yields an error if a worker died without reporting
struct Reports<'a, T> {
  group: &'a TaskGroup<T>,
  remaining: usize,
}

impl<T> Iterator for Reports<'_, T> {
  type Item = CutResult<Report<T>>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    match self.group.rx.recv() {
      Ok(report) => Some(Ok(report)),
      Err(_) => Some(Err(CutError::message(format!(
        "worker in task group '{}' exited without reporting",
        self.group.label
      )))),
    }
  }
}
