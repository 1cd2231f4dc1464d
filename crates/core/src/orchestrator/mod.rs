//! Bounded-concurrency fan-out orchestrator.
//!
//! The orchestrator fetches a batch of identifiers and fails fast:
//! - **Admission**: a semaphore per run or a fixed worker pool bounds parallelism
//! - **Aggregation**: successes land in one mutex-guarded map
//! - **Termination**: the first error, a caller cancel or a deadline stops every task

mod config;
mod context;
mod runner;
mod semaphore;
mod state;
mod strategy;
mod types;
mod worker_pool;

pub use config::{OrchestratorConfig, StrategyKind};
pub use context::RunContext;
pub use runner::FanOutOrchestrator;
pub use semaphore::SemaphoreStrategy;
pub use state::RunState;
pub use strategy::{create_strategy, AdmissionStrategy};
pub use types::FanOutError;
pub use worker_pool::WorkerPoolStrategy;
