//! Fan-out orchestrator implementation.
//!
//! Runs a batch of fetches with bounded parallelism and fails fast:
//! - the first recorded error cancels every in-flight and pending fetch
//! - a cancelled or expired [`RunContext`] stops the run the same way
//! - callers get either every value or exactly one error, never a partial map

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::fetcher::Fetcher;
use crate::metrics::{RUNS_TOTAL, RUN_DURATION};

use super::config::OrchestratorConfig;
use super::context::RunContext;
use super::state::RunState;
use super::strategy::{create_strategy, AdmissionStrategy};
use super::types::FanOutError;

/// The fan-out orchestrator.
pub struct FanOutOrchestrator {
    config: OrchestratorConfig,
    fetcher: Arc<dyn Fetcher>,
    strategy: Arc<dyn AdmissionStrategy>,
}

impl FanOutOrchestrator {
    /// Create an orchestrator using the strategy named in `config`.
    pub fn new(config: OrchestratorConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let strategy = create_strategy(config.strategy);
        Self {
            config,
            fetcher,
            strategy,
        }
    }

    /// Override the admission strategy.
    pub fn with_strategy(mut self, strategy: Arc<dyn AdmissionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Configuration this orchestrator was built with.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Name of the active admission strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Run `items` with the configured concurrency bound.
    pub async fn run(
        &self,
        items: Vec<String>,
        ctx: &RunContext,
    ) -> Result<HashMap<String, i64>, FanOutError> {
        self.run_all(items, self.config.max_concurrency, ctx).await
    }

    /// Fetch every item with at most `max_concurrency` fetches at once.
    ///
    /// Returns the complete id -> value map, or the first error recorded.
    /// Duplicate ids are fetched independently; the last value stored wins.
    pub async fn run_all(
        &self,
        items: Vec<String>,
        max_concurrency: i64,
        ctx: &RunContext,
    ) -> Result<HashMap<String, i64>, FanOutError> {
        let strategy = self.strategy.name();
        let started = Instant::now();

        let result = self.execute(items, max_concurrency, ctx).await;

        let outcome = match &result {
            Ok(_) => "completed",
            Err(e) => e.outcome_label(),
        };
        RUNS_TOTAL.with_label_values(&[strategy, outcome]).inc();
        RUN_DURATION
            .with_label_values(&[strategy])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    async fn execute(
        &self,
        items: Vec<String>,
        max_concurrency: i64,
        ctx: &RunContext,
    ) -> Result<HashMap<String, i64>, FanOutError> {
        let bound = self.admission_bound(max_concurrency)?;

        if let Some(err) = ctx.err() {
            debug!("Context already done, not starting run: {}", err);
            return Err(err);
        }

        if items.is_empty() {
            return Ok(HashMap::new());
        }

        let run_id = Uuid::new_v4();
        info!(
            "Run {} started: {} items, bound {}, strategy {}, fetcher {}",
            run_id,
            items.len(),
            bound,
            self.strategy.name(),
            self.fetcher.name()
        );

        let state = Arc::new(RunState::new(
            Arc::clone(&self.fetcher),
            ctx.token().child_token(),
        ));
        let deadline = self.config.timeout().map(|t| tokio::time::Instant::now() + t);

        // Dropping `dispatch` on the fast-fail branches aborts leftover tasks.
        let dispatch = self.strategy.dispatch(items, bound, Arc::clone(&state));

        tokio::select! {
            _ = dispatch => {
                debug!("Run {}: all tasks finished", run_id);
            }
            _ = state.cancelled() => {
                debug!("Run {}: cancelled, abandoning outstanding work", run_id);
            }
            err = ctx.done() => {
                state.record_failure(err).await;
            }
            _ = sleep_until(deadline) => {
                warn!("Run {} exceeded its {:?} budget", run_id, self.config.timeout());
                state.record_failure(FanOutError::DeadlineExceeded).await;
            }
        }

        let outcome = match state.take_error().await {
            Some(err) => Err(err),
            None if state.is_cancelled() => Err(ctx
                .err()
                .unwrap_or_else(|| FanOutError::cancelled("run cancelled"))),
            None => Ok(state.take_results().await),
        };

        match &outcome {
            Ok(results) => info!("Run {} completed with {} values", run_id, results.len()),
            Err(e) => warn!("Run {} failed: {}", run_id, e),
        }

        outcome
    }

    /// Turn the requested bound into a usable permit count.
    fn admission_bound(&self, requested: i64) -> Result<usize, FanOutError> {
        if requested < 1 {
            if self.config.strict_bounds {
                return Err(FanOutError::InvalidConfiguration(format!(
                    "max_concurrency must be at least 1, got {requested}"
                )));
            }
            debug!("Raising max_concurrency {} to 1", requested);
            return Ok(1);
        }

        let bound = usize::try_from(requested).unwrap_or(usize::MAX);
        Ok(bound.min(Semaphore::MAX_PERMITS))
    }
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
