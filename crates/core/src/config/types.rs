use serde::{Deserialize, Serialize};

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in checksum fetcher
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FetcherConfig {
    /// Simulated latency per fetch in milliseconds (default: 0)
    #[serde(default)]
    pub latency_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::StrategyKind;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.orchestrator.max_concurrency, 4);
        assert_eq!(config.orchestrator.strategy, StrategyKind::Semaphore);
        assert_eq!(config.fetcher.latency_ms, 0);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[orchestrator]
max_concurrency = 8
strategy = "worker_pool"
timeout_ms = 2000

[fetcher]
latency_ms = 25

[logging]
level = "debug"
json = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.orchestrator.max_concurrency, 8);
        assert_eq!(config.orchestrator.strategy, StrategyKind::WorkerPool);
        assert_eq!(config.orchestrator.timeout_ms, Some(2000));
        assert_eq!(config.fetcher.latency_ms, 25);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_serialize_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.orchestrator.max_concurrency, 4);
        assert_eq!(parsed.logging.level, "info");
    }
}
