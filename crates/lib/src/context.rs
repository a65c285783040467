//! Cancellation contexts.
//!
//! A [`BuildContext`] is handed to every toolchain invocation. It ends when
//! its [`CancelHandle`] fires (for example on an interrupt) or when its
//! deadline passes. Child contexts share the parent's cancellation and can
//! only tighten its deadline, so a per-phase timeout never outlives the
//! overall build timeout.

use std::fmt;
use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

use crate::error::BuildError;

/// Why a context ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancellation {
  /// Cancelled through a [`CancelHandle`].
  Cancelled,
  /// The context's deadline passed.
  DeadlineExceeded,
}

impl fmt::Display for Cancellation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Cancelled => f.write_str("context canceled"),
      Self::DeadlineExceeded => f.write_str("context deadline exceeded"),
    }
  }
}

/// Cancellation scope for one build.
#[derive(Debug, Clone)]
pub struct BuildContext {
  cancelled: watch::Receiver<bool>,
  deadline: Option<Instant>,
}

/// Cancels every context derived from the root it was created with.
#[derive(Debug, Clone)]
pub struct CancelHandle {
  tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
  /// Cancel the context. Returns `true` only for the call that actually
  /// performed the cancellation.
  pub fn cancel(&self) -> bool {
    self.tx.send_if_modified(|cancelled| {
      if *cancelled {
        false
      } else {
        *cancelled = true;
        true
      }
    })
  }

  pub fn is_cancelled(&self) -> bool {
    *self.tx.borrow()
  }
}

impl BuildContext {
  /// Create a root context together with the handle that cancels it.
  pub fn new() -> (Self, CancelHandle) {
    let (tx, rx) = watch::channel(false);
    let ctx = Self {
      cancelled: rx,
      deadline: None,
    };
    (ctx, CancelHandle { tx: Arc::new(tx) })
  }

  /// A context that is never cancelled and has no deadline.
  pub fn background() -> Self {
    let (ctx, _handle) = Self::new();
    ctx
  }

  /// Derive a child context that also ends after `timeout`.
  pub fn with_timeout(&self, timeout: Duration) -> Self {
    self.with_deadline(Instant::now() + timeout)
  }

  /// Derive a child context that also ends at `deadline`. An earlier
  /// parent deadline is kept.
  pub fn with_deadline(&self, deadline: Instant) -> Self {
    let deadline = match self.deadline {
      Some(parent) if parent <= deadline => parent,
      _ => deadline,
    };
    Self {
      cancelled: self.cancelled.clone(),
      deadline: Some(deadline),
    }
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  /// Time left until the deadline, if there is one.
  pub fn remaining(&self) -> Option<Duration> {
    self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
  }

  /// Non-blocking check: why the context has ended, or `None` if it is
  /// still live.
  pub fn err(&self) -> Option<Cancellation> {
    if *self.cancelled.borrow() {
      return Some(Cancellation::Cancelled);
    }
    match self.deadline {
      Some(deadline) if Instant::now() >= deadline => Some(Cancellation::DeadlineExceeded),
      _ => None,
    }
  }

  /// Return early with [`BuildError::Cancelled`] if the context has ended.
  pub fn check(&self) -> Result<(), BuildError> {
    match self.err() {
      Some(cause) => Err(BuildError::Cancelled(cause)),
      None => Ok(()),
    }
  }

  /// Resolves once the context ends.
  pub async fn done(&self) -> Cancellation {
    let cancelled = wait_cancelled(self.cancelled.clone());
    match self.deadline {
      Some(deadline) => {
        tokio::select! {
          _ = cancelled => Cancellation::Cancelled,
          _ = sleep_until(deadline) => Cancellation::DeadlineExceeded,
        }
      }
      None => {
        cancelled.await;
        Cancellation::Cancelled
      }
    }
  }
}

async fn wait_cancelled(mut rx: watch::Receiver<bool>) {
  loop {
    if *rx.borrow_and_update() {
      return;
    }
    if rx.changed().await.is_err() {
      // The handle is gone without cancelling; nothing can cancel us now.
      future::pending::<()>().await;
    }
  }
}
