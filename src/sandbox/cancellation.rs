//! Execution budget and cooperative cancellation.
//!
//! Every run gets a [`Budget`]: a deadline plus a [`CancelHandle`]. The
//! engine's progress hook and every blocking host call check the budget, so
//! a script stops at its next operation once the deadline passes or the
//! handle is cancelled.

use super::error::{CANCEL_TOKEN, TIMEOUT_TOKEN};
use rhai::{Dynamic, EvalAltResult, Position};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// A cloneable handle that requests cancellation of a running script.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    /// Creates a handle that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Checks if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Why a run was stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Timeout,
    Cancelled,
}

impl Interrupt {
    /// Token carried through the engine's termination error.
    pub fn token(&self) -> &'static str {
        match self {
            Interrupt::Timeout => TIMEOUT_TOKEN,
            Interrupt::Cancelled => CANCEL_TOKEN,
        }
    }

    /// Engine error that terminates the script.
    pub fn into_eval_error(self, pos: Position) -> Box<EvalAltResult> {
        EvalAltResult::ErrorTerminated(Dynamic::from(self.token().to_string()), pos).into()
    }
}

/// Time and cancellation budget of one run.
#[derive(Debug, Clone)]
pub struct Budget {
    started: Instant,
    timeout: Duration,
    cancel: CancelHandle,
}

impl Budget {
    /// Starts a budget of `timeout` from now.
    pub fn new(timeout: Duration, cancel: CancelHandle) -> Self {
        Self {
            started: Instant::now(),
            timeout,
            cancel,
        }
    }

    /// Configured budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.started.elapsed())
    }

    /// Returns the interrupt to raise, if any. Cancellation wins over timeout.
    pub fn check(&self) -> Option<Interrupt> {
        if self.cancel.is_cancelled() {
            Some(Interrupt::Cancelled)
        } else if self.started.elapsed() >= self.timeout {
            Some(Interrupt::Timeout)
        } else {
            None
        }
    }

    /// The run's cancel handle.
    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }
}
