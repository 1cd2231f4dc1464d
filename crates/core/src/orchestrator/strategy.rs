//! Admission strategies: how a run bounds its parallelism.

use std::sync::Arc;

use async_trait::async_trait;

use super::config::StrategyKind;
use super::semaphore::SemaphoreStrategy;
use super::state::RunState;
use super::worker_pool::WorkerPoolStrategy;

/// Drives every item of a run through [`RunState::fetch_and_record`] with at
/// most `bound` fetches executing at once.
///
/// `dispatch` returns once every task it started has finished. Dropping the
/// returned future aborts the tasks that are still running.
#[async_trait]
pub trait AdmissionStrategy: Send + Sync {
    /// Strategy name for logging and metrics.
    fn name(&self) -> &'static str;

    /// Run `items` to completion or cancellation.
    async fn dispatch(&self, items: Vec<String>, bound: usize, state: Arc<RunState>);
}

/// Build the strategy selected by `kind`.
pub fn create_strategy(kind: StrategyKind) -> Arc<dyn AdmissionStrategy> {
    match kind {
        StrategyKind::Semaphore => Arc::new(SemaphoreStrategy),
        StrategyKind::WorkerPool => Arc::new(WorkerPoolStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_strategy_names() {
        assert_eq!(create_strategy(StrategyKind::Semaphore).name(), "semaphore");
        assert_eq!(create_strategy(StrategyKind::WorkerPool).name(), "worker_pool");
    }
}
