pub mod config;
pub mod fetcher;
pub mod metrics;
pub mod orchestrator;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config, ConfigError,
    FetcherConfig, LoggingConfig,
};
pub use fetcher::{checksum_price, ChecksumFetcher, FetchError, Fetcher};
pub use orchestrator::{
    create_strategy, AdmissionStrategy, FanOutError, FanOutOrchestrator, OrchestratorConfig,
    RunContext, RunState, SemaphoreStrategy, StrategyKind, WorkerPoolStrategy,
};
