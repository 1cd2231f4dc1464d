//! Types for the fan-out orchestrator.

use thiserror::Error;

use crate::fetcher::FetchError;

/// Errors a fan-out run can end with. Exactly one is reported per failed run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FanOutError {
    /// The fetcher reported a failure for one identifier.
    #[error("fetch failed for {identifier}: {cause}")]
    FetchFailed {
        identifier: String,
        #[source]
        cause: FetchError,
    },

    /// The caller cancelled the run.
    #[error("run cancelled: {reason}")]
    Cancelled { reason: String },

    /// The run deadline passed before every fetch completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The requested configuration cannot be honoured.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A fetch task panicked or was torn down unexpectedly.
    #[error("fetch task panicked: {0}")]
    TaskPanicked(String),
}

impl FanOutError {
    /// Build a [`FanOutError::Cancelled`] with the given reason.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        FanOutError::Cancelled {
            reason: reason.into(),
        }
    }

    /// Identifier of the failing item, for `FetchFailed` errors.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            FanOutError::FetchFailed { identifier, .. } => Some(identifier),
            _ => None,
        }
    }

    /// Short label used for the `outcome` metric dimension.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            FanOutError::FetchFailed { .. } => "fetch_failed",
            FanOutError::Cancelled { .. } => "cancelled",
            FanOutError::DeadlineExceeded => "deadline_exceeded",
            FanOutError::InvalidConfiguration(_) => "invalid_configuration",
            FanOutError::TaskPanicked(_) => "task_panicked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FanOutError::FetchFailed {
            identifier: "bad:oops".to_string(),
            cause: FetchError::Remote("remote error".to_string()),
        };
        assert_eq!(err.to_string(), "fetch failed for bad:oops: remote error");
        assert_eq!(err.identifier(), Some("bad:oops"));

        let err = FanOutError::cancelled("interrupted");
        assert_eq!(err.to_string(), "run cancelled: interrupted");
        assert_eq!(err.identifier(), None);

        assert_eq!(
            FanOutError::DeadlineExceeded.to_string(),
            "deadline exceeded"
        );
    }

    #[test]
    fn test_fetch_failed_exposes_source() {
        use std::error::Error;

        let err = FanOutError::FetchFailed {
            identifier: "p1".to_string(),
            cause: FetchError::Cancelled,
        };
        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "fetch cancelled");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(FanOutError::DeadlineExceeded.outcome_label(), "deadline_exceeded");
        assert_eq!(
            FanOutError::InvalidConfiguration("x".into()).outcome_label(),
            "invalid_configuration"
        );
        assert_eq!(FanOutError::TaskPanicked("x".into()).outcome_label(), "task_panicked");
    }
}
