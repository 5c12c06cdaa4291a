//! Cancellation and deadline propagation.
//!
//! An `AcquireContext` is threaded through every call boundary: escalation,
//! strategy, HTTP client and remote service calls. Cancelling it (or letting
//! its deadline pass) aborts in-flight requests, not just future ones.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{AcquireError, Result};

/// Cancellation token plus an optional absolute deadline.
#[derive(Debug, Clone)]
pub struct AcquireContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for AcquireContext {
    fn default() -> Self {
        Self::background()
    }
}

impl AcquireContext {
    /// A context with no deadline that is only cancelled explicitly.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A fresh context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().child_with_timeout(timeout)
    }

    /// Child context sharing cancellation with `self`. The child's deadline
    /// is the earlier of the parent's and `deadline`.
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.child_with_deadline(Instant::now() + timeout)
    }

    /// Child context that can be cancelled without affecting `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when no deadline is set,
    /// `Some(ZERO)` once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// `Some(ContextCancelled)` if the context is cancelled or expired.
    pub fn err(&self) -> Option<AcquireError> {
        if self.token.is_cancelled() {
            return Some(AcquireError::ContextCancelled("context cancelled".into()));
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(AcquireError::ContextCancelled(
                "context deadline exceeded".into(),
            )),
            _ => None,
        }
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> Result<()> {
        match self.err() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Race `fut` against cancellation. The future is dropped (aborting any
    /// in-flight request it owns) if the context finishes first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.done() => Err(self.err().unwrap_or_else(|| {
                AcquireError::ContextCancelled("context cancelled".into())
            })),
            res = fut => res,
        }
    }

    /// Sleep for `duration` unless the context finishes first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}
