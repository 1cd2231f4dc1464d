//! Shared state of a single fan-out run.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinError;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, warn};

use crate::fetcher::Fetcher;
use crate::metrics::{FETCHES_IN_FLIGHT, FETCHES_TOTAL};

use super::types::FanOutError;

/// State shared by every task of one run.
///
/// Holds the derived cancellation token, the result map and the single-slot
/// error box. Neither lock is held across a fetch or a permit wait.
pub struct RunState {
    fetcher: Arc<dyn Fetcher>,
    token: CancellationToken,
    results: Mutex<HashMap<String, i64>>,
    error: Mutex<Option<FanOutError>>,
}

impl RunState {
    /// Create run state around `fetcher`, cancelled through `token`.
    pub fn new(fetcher: Arc<dyn Fetcher>, token: CancellationToken) -> Self {
        Self {
            fetcher,
            token,
            results: Mutex::new(HashMap::new()),
            error: Mutex::new(None),
        }
    }

    /// Whether the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the run is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Fetch `id` and record the outcome.
    ///
    /// Returns `true` if the value was stored. Nothing is fetched once the run
    /// is cancelled; a value arriving after cancellation is discarded, and so
    /// is an error, since it cannot be the cause of the cancellation.
    pub async fn fetch_and_record(&self, id: &str) -> bool {
        if self.is_cancelled() {
            return false;
        }

        let result = {
            let _in_flight = InFlightGuard::enter();
            self.fetcher.fetch(id, &self.token).await
        };

        match result {
            Ok(value) => {
                let mut results = self.results.lock().await;
                if self.is_cancelled() {
                    debug!("Discarding value for {} fetched after cancellation", id);
                    FETCHES_TOTAL.with_label_values(&["discarded"]).inc();
                    return false;
                }
                results.insert(id.to_string(), value);
                FETCHES_TOTAL.with_label_values(&["success"]).inc();
                true
            }
            Err(cause) => {
                if self.is_cancelled() {
                    debug!("Ignoring failure for {} after cancellation: {}", id, cause);
                    FETCHES_TOTAL.with_label_values(&["discarded"]).inc();
                    return false;
                }
                FETCHES_TOTAL.with_label_values(&["failed"]).inc();
                warn!("Fetch failed for {}: {}", id, cause);
                self.record_failure(FanOutError::FetchFailed {
                    identifier: id.to_string(),
                    cause,
                })
                .await;
                false
            }
        }
    }

    /// Record `err` if the error box is empty, then cancel the run.
    pub async fn record_failure(&self, err: FanOutError) {
        {
            let mut slot = self.error.lock().await;
            if slot.is_none() {
                *slot = Some(err);
            } else {
                debug!("Dropping secondary error: {}", err);
            }
        }
        self.token.cancel();
    }

    /// Turn a failed join into a run failure. Aborted tasks are ignored.
    pub async fn record_join_error(&self, err: JoinError) {
        if err.is_panic() {
            let message = panic_message(err.into_panic());
            self.record_failure(FanOutError::TaskPanicked(message)).await;
        }
    }

    /// Take the recorded error, if any.
    pub async fn take_error(&self) -> Option<FanOutError> {
        self.error.lock().await.take()
    }

    /// Take the result map, leaving an empty one behind.
    pub async fn take_results(&self) -> HashMap<String, i64> {
        std::mem::take(&mut *self.results.lock().await)
    }
}

/// Keeps the in-flight gauge balanced even when a task is aborted mid-fetch.
struct InFlightGuard;

impl InFlightGuard {
    fn enter() -> Self {
        FETCHES_IN_FLIGHT.inc();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        FETCHES_IN_FLIGHT.dec();
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
