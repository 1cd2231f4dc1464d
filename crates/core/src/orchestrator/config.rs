//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which admission strategy bounds the parallelism of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// One task per item, each gated by a shared semaphore permit.
    #[default]
    Semaphore,
    /// A fixed set of workers pulling items from a shared queue.
    WorkerPool,
}

impl StrategyKind {
    /// Stable name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Semaphore => "semaphore",
            StrategyKind::WorkerPool => "worker_pool",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the fan-out orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of fetches executing at once.
    /// Values below 1 are raised to 1 unless `strict_bounds` is set.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: i64,

    /// Admission strategy.
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Optional wall-clock budget for a whole run (milliseconds).
    /// When it elapses the run fails with `DeadlineExceeded`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Reject a bound below 1 instead of raising it.
    #[serde(default)]
    pub strict_bounds: bool,
}

fn default_max_concurrency() -> i64 {
    4
}

impl OrchestratorConfig {
    /// Run timeout as a [`Duration`], if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            strategy: StrategyKind::default(),
            timeout_ms: None,
            strict_bounds: false,
        }
    }
}
