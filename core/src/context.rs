//! Cancellation and deadline propagation for a single `execute` call.
//!
//! # Design
//! The engine never enforces timeouts itself. It binds the caller's
//! `Context` into the outgoing `Request`, and the transport decides what a
//! deadline or a cancellation means for its blocking send.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Reason a context is no longer usable.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation signal plus optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline`. An earlier deadline on
    /// `self` wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            token: self.token.clone(),
        }
    }

    /// Derive a cancellable context. Cancelling the returned token cancels the
    /// new context only; cancelling `self` cancels both.
    pub fn with_cancel(&self) -> (Self, CancellationToken) {
        let child = self.token.child_token();
        let ctx = Self {
            deadline: self.deadline,
            token: child.clone(),
        };
        (ctx, child)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `Some(ZERO)` once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `None` while the context is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }
}
