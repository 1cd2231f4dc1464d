//! Deterministic price fetcher used by the CLI and the scenario tests.
//!
//! Identifier conventions:
//! - `bad:*` fails with a remote error
//! - `slow:*` never answers on its own; it waits for cancellation
//! - anything else is priced from a checksum of its characters

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{FetchError, Fetcher};

const FAILING_PREFIX: &str = "bad:";
const HANGING_PREFIX: &str = "slow:";

/// Price of `id`: its byte length plus the sum of its chars modulo 17.
pub fn checksum_price(id: &str) -> i64 {
    let sum: u64 = id.chars().map(|c| u64::from(c as u32)).sum();
    id.len() as i64 + (sum % 17) as i64
}

/// Fetcher that prices identifiers from a checksum.
#[derive(Debug, Clone, Default)]
pub struct ChecksumFetcher {
    latency: Duration,
}

impl ChecksumFetcher {
    /// Create a fetcher that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a round trip of `latency` before every answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Fetcher for ChecksumFetcher {
    fn name(&self) -> &str {
        "checksum"
    }

    async fn fetch(&self, id: &str, cancel: &CancellationToken) -> Result<i64, FetchError> {
        if !self.latency.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(self.latency) => {}
            }
        }

        if id.starts_with(FAILING_PREFIX) {
            return Err(FetchError::Remote("remote error".to_string()));
        }

        if id.starts_with(HANGING_PREFIX) {
            debug!("Fetch for {} parked until cancellation", id);
            cancel.cancelled().await;
            return Err(FetchError::Cancelled);
        }

        Ok(checksum_price(id))
    }
}
