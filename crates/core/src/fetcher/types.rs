//! Types for the fetch collaborator.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors a fetcher can report for a single identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The remote side answered with a failure.
    #[error("{0}")]
    Remote(String),

    /// The fetch observed cancellation and gave up.
    #[error("fetch cancelled")]
    Cancelled,

    /// Anything else.
    #[error("internal error: {0}")]
    Other(String),
}

/// Trait for fetch backends.
///
/// Implementations must be safe to call concurrently from independent tasks
/// and must return promptly once `cancel` fires.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Resolve `id` to its value.
    async fn fetch(&self, id: &str, cancel: &CancellationToken) -> Result<i64, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Remote("remote error".to_string());
        assert_eq!(err.to_string(), "remote error");

        assert_eq!(FetchError::Cancelled.to_string(), "fetch cancelled");

        let err = FetchError::Other("boom".to_string());
        assert_eq!(err.to_string(), "internal error: boom");
    }
}
