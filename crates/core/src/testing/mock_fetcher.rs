//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::fetcher::{checksum_price, FetchError, Fetcher};

/// What the mock does when asked for a given identifier.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer with this value.
    Succeed(i64),
    /// Answer with the checksum price after the delay.
    Delay(Duration),
    /// Fail immediately.
    Fail(FetchError),
    /// Fail after the delay.
    FailAfter(Duration, FetchError),
    /// Block until cancelled, then report `FetchError::Cancelled`.
    Hang,
    /// Panic inside the fetch.
    Panic,
}

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Per-identifier success values, delays, failures, hangs and panics
/// - Call recording for assertions
/// - Peak concurrency tracking
///
/// Identifiers without a configured behavior succeed with
/// [`checksum_price`] after the default delay.
///
/// # Example
///
/// ```rust,ignore
/// use fanout_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::new().with_default_delay(Duration::from_millis(10));
/// fetcher.fail("b").await;
///
/// // Run the orchestrator...
///
/// assert!(fetcher.peak_in_flight() <= 2);
/// ```
pub struct MockFetcher {
    /// Per-identifier behavior.
    behaviors: Arc<RwLock<HashMap<String, MockBehavior>>>,
    /// Delay applied to identifiers without a behavior.
    default_delay: Duration,
    /// Identifiers in the order fetch was called.
    calls: Arc<RwLock<Vec<String>>>,
    /// Total fetch calls.
    call_count: AtomicUsize,
    /// Fetches currently executing.
    in_flight: Arc<AtomicUsize>,
    /// Highest value `in_flight` reached.
    peak_in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetcher")
            .field("behaviors", &"<behaviors>")
            .field("default_delay", &self.default_delay)
            .field("call_count", &self.call_count())
            .field("peak_in_flight", &self.peak_in_flight())
            .finish()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a mock that answers every identifier immediately.
    pub fn new() -> Self {
        Self {
            behaviors: Arc::new(RwLock::new(HashMap::new())),
            default_delay: Duration::ZERO,
            calls: Arc::new(RwLock::new(Vec::new())),
            call_count: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay every identifier that has no explicit behavior.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Set the behavior for `id`.
    pub async fn set_behavior(&self, id: &str, behavior: MockBehavior) {
        self.behaviors
            .write()
            .await
            .insert(id.to_string(), behavior);
    }

    /// Make `id` succeed with `value`.
    pub async fn succeed(&self, id: &str, value: i64) {
        self.set_behavior(id, MockBehavior::Succeed(value)).await;
    }

    /// Make `id` answer after `delay`.
    pub async fn delay(&self, id: &str, delay: Duration) {
        self.set_behavior(id, MockBehavior::Delay(delay)).await;
    }

    /// Make `id` fail with a remote error.
    pub async fn fail(&self, id: &str) {
        self.set_behavior(
            id,
            MockBehavior::Fail(FetchError::Remote(format!("mock failure for {id}"))),
        )
        .await;
    }

    /// Make `id` fail with a remote error after `delay`.
    pub async fn fail_after(&self, id: &str, delay: Duration) {
        self.set_behavior(
            id,
            MockBehavior::FailAfter(delay, FetchError::Remote(format!("mock failure for {id}"))),
        )
        .await;
    }

    /// Make `id` block until cancellation.
    pub async fn hang(&self, id: &str) {
        self.set_behavior(id, MockBehavior::Hang).await;
    }

    /// Make `id` panic.
    pub async fn panic_on(&self, id: &str) {
        self.set_behavior(id, MockBehavior::Panic).await;
    }

    /// Get recorded fetch calls in call order.
    pub async fn recorded_calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Get the number of fetch calls made.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get the number of fetches executing right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Get the highest number of fetches that ever executed at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), FetchError> {
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

/// Tracks one in-flight fetch; decrements on drop so aborted tasks are counted.
struct InFlight {
    in_flight: Arc<AtomicUsize>,
}

impl InFlight {
    fn enter(in_flight: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self {
            in_flight: Arc::clone(in_flight),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, id: &str, cancel: &CancellationToken) -> Result<i64, FetchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.write().await.push(id.to_string());
        let _guard = InFlight::enter(&self.in_flight, &self.peak_in_flight);

        let behavior = self.behaviors.read().await.get(id).cloned();
        match behavior {
            None => {
                Self::sleep_or_cancel(self.default_delay, cancel).await?;
                Ok(checksum_price(id))
            }
            Some(MockBehavior::Succeed(value)) => Ok(value),
            Some(MockBehavior::Delay(delay)) => {
                Self::sleep_or_cancel(delay, cancel).await?;
                Ok(checksum_price(id))
            }
            Some(MockBehavior::Fail(err)) => Err(err),
            Some(MockBehavior::FailAfter(delay, err)) => {
                Self::sleep_or_cancel(delay, cancel).await?;
                Err(err)
            }
            Some(MockBehavior::Hang) => {
                cancel.cancelled().await;
                Err(FetchError::Cancelled)
            }
            Some(MockBehavior::Panic) => panic!("mock fetcher panicked on {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_behavior_uses_checksum() {
        let fetcher = MockFetcher::new();
        let cancel = CancellationToken::new();

        let value = fetcher.fetch("alpha", &cancel).await.unwrap();
        assert_eq!(value, checksum_price("alpha"));
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(fetcher.recorded_calls().await, vec!["alpha".to_string()]);
    }

    #[tokio::test]
    async fn test_configured_behaviors() {
        let fetcher = MockFetcher::new();
        let cancel = CancellationToken::new();
        fetcher.succeed("fixed", 42).await;
        fetcher.fail("broken").await;

        assert_eq!(fetcher.fetch("fixed", &cancel).await, Ok(42));
        assert_eq!(
            fetcher.fetch("broken", &cancel).await,
            Err(FetchError::Remote("mock failure for broken".to_string()))
        );
    }

    #[tokio::test]
    async fn test_hang_returns_on_cancel() {
        let fetcher = MockFetcher::new();
        fetcher.hang("stuck").await;
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        assert_eq!(
            fetcher.fetch("stuck", &cancel).await,
            Err(FetchError::Cancelled)
        );
        assert_eq!(fetcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_peak_in_flight_tracks_concurrency() {
        let fetcher = Arc::new(MockFetcher::new().with_default_delay(Duration::from_millis(20)));
        let cancel = CancellationToken::new();

        let mut handles = Vec::new();
        for i in 0..3 {
            let fetcher = Arc::clone(&fetcher);
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                fetcher.fetch(&format!("id-{i}"), &cancel).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fetcher.peak_in_flight(), 3);
        assert_eq!(fetcher.in_flight(), 0);
    }
}
