//! Caller-side cancellation for fan-out runs.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::types::FanOutError;

/// Why a [`RunContext`] fired. The first cause recorded sticks.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CancelCause {
    Caller(String),
    Deadline,
}

/// External cancellation signal handed to a run.
///
/// Clones share the same token, deadline and cause, so cancelling any clone
/// cancels them all. [`RunContext::new`] never fires on its own.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    cause: Arc<OnceLock<CancelCause>>,
}

impl RunContext {
    /// A context that only fires when cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that also fires once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that also fires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    /// Cancel with a generic caller reason.
    pub fn cancel(&self) {
        self.cancel_with_reason("cancelled by caller");
    }

    /// Cancel, recording `reason` unless another cause fired first.
    pub fn cancel_with_reason(&self, reason: impl Into<String>) {
        self.fire(CancelCause::Caller(reason.into()));
    }

    /// The underlying token. Runs derive child tokens from it.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the context has fired, counting an elapsed deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// The error describing why the context fired, or `None` while live.
    ///
    /// An elapsed deadline is latched here even if nobody was waiting on it.
    pub fn err(&self) -> Option<FanOutError> {
        if self.cause.get().is_none() {
            match self.deadline {
                Some(deadline) if Instant::now() >= deadline => self.fire(CancelCause::Deadline),
                _ if self.token.is_cancelled() => {
                    // Token cancelled directly, bypassing `cancel_with_reason`.
                    self.fire(CancelCause::Caller("cancelled by caller".to_string()))
                }
                _ => return None,
            }
        }
        self.cause.get().map(|cause| match cause {
            CancelCause::Caller(reason) => FanOutError::cancelled(reason.clone()),
            CancelCause::Deadline => FanOutError::DeadlineExceeded,
        })
    }

    /// Wait until the context fires and return the reason.
    pub async fn done(&self) -> FanOutError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => self.fire(CancelCause::Deadline),
                }
            }
            None => self.token.cancelled().await,
        }
        self.err()
            .unwrap_or_else(|| FanOutError::cancelled("cancelled by caller"))
    }

    fn fire(&self, cause: CancelCause) {
        let _ = self.cause.set(cause);
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_live() {
        let ctx = RunContext::new();
        assert!(!ctx.is_done());
        assert!(ctx.err().is_none());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_reports_reason() {
        let ctx = RunContext::new();
        ctx.cancel_with_reason("shutting down");
        assert!(ctx.token().is_cancelled());
        assert_eq!(ctx.err(), Some(FanOutError::cancelled("shutting down")));
    }

    #[test]
    fn test_first_cause_wins() {
        let ctx = RunContext::new();
        ctx.cancel_with_reason("first");
        ctx.cancel_with_reason("second");
        assert_eq!(ctx.err(), Some(FanOutError::cancelled("first")));
    }

    #[test]
    fn test_clones_share_state() {
        let ctx = RunContext::new();
        let clone = ctx.clone();
        clone.cancel();
        assert_eq!(ctx.err(), Some(FanOutError::cancelled("cancelled by caller")));
    }

    #[test]
    fn test_direct_token_cancel_is_reported() {
        let ctx = RunContext::new();
        ctx.token().cancel();
        assert_eq!(ctx.err(), Some(FanOutError::cancelled("cancelled by caller")));
    }

    #[tokio::test]
    async fn test_expired_deadline_is_latched() {
        let ctx = RunContext::with_deadline(Instant::now() - Duration::from_secs(1));
        assert_eq!(ctx.err(), Some(FanOutError::DeadlineExceeded));
        assert!(ctx.token().is_cancelled());

        // A later cancel cannot rewrite the cause.
        ctx.cancel_with_reason("too late");
        assert_eq!(ctx.err(), Some(FanOutError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_waits_for_deadline() {
        let ctx = RunContext::with_timeout(Duration::from_secs(5));
        let err = ctx.done().await;
        assert_eq!(err, FanOutError::DeadlineExceeded);
        assert!(ctx.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_done_wakes_on_cancel() {
        let ctx = RunContext::new();
        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel_with_reason("stop");
        });
        assert_eq!(ctx.done().await, FanOutError::cancelled("stop"));
    }
}
