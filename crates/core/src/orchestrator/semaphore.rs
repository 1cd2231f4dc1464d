//! Semaphore-gated fan-out: one task per item, a shared permit per fetch.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use super::state::RunState;
use super::strategy::AdmissionStrategy;

/// Spawns every item up front; each task waits for one of `bound` permits
/// before fetching. Permit order is unspecified.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemaphoreStrategy;

#[async_trait]
impl AdmissionStrategy for SemaphoreStrategy {
    fn name(&self) -> &'static str {
        "semaphore"
    }

    async fn dispatch(&self, items: Vec<String>, bound: usize, state: Arc<RunState>) {
        let semaphore = Arc::new(Semaphore::new(bound));
        let mut tasks = JoinSet::new();

        for id in items {
            let semaphore = Arc::clone(&semaphore);
            let state = Arc::clone(&state);

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = state.cancelled() => {
                        debug!("Abandoning permit wait for {}", id);
                        return;
                    }
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };

                state.fetch_and_record(&id).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                state.record_join_error(e).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_spawns_one_task_per_item_and_respects_bound() {
        let fetcher = Arc::new(MockFetcher::new().with_default_delay(Duration::from_millis(20)));
        let state = Arc::new(RunState::new(fetcher.clone(), CancellationToken::new()));

        let items: Vec<String> = (0..10).map(|i| format!("item-{i}")).collect();
        SemaphoreStrategy.dispatch(items, 3, Arc::clone(&state)).await;

        assert_eq!(fetcher.call_count(), 10);
        assert!(fetcher.peak_in_flight() <= 3);
        assert_eq!(state.take_results().await.len(), 10);
    }

    #[tokio::test]
    async fn test_waiting_tasks_skip_fetch_after_cancel() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.fail("boom").await;

        let state = Arc::new(RunState::new(fetcher.clone(), CancellationToken::new()));
        let items = vec!["boom".to_string(), "a".to_string(), "b".to_string()];
        SemaphoreStrategy.dispatch(items, 1, Arc::clone(&state)).await;

        // With a single permit, `boom` may run first and cancel the rest, or
        // run after some successes; either way nothing runs after it.
        let calls = fetcher.recorded_calls().await;
        let boom_at = calls.iter().position(|c| c == "boom").unwrap();
        assert_eq!(boom_at, calls.len() - 1);
        assert!(state.take_error().await.is_some());
    }
}
