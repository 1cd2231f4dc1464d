//! Command-line arguments for the fanout driver

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use fanout_core::{Config, StrategyKind};

/// Admission strategy selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// One task per item, gated by a counting semaphore
    Semaphore,
    /// A fixed set of workers pulling from a shared queue
    WorkerPool,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Semaphore => StrategyKind::Semaphore,
            StrategyArg::WorkerPool => StrategyKind::WorkerPool,
        }
    }
}

/// CLI arguments for fanout
#[derive(Parser, Debug)]
#[command(name = "fanout")]
#[command(version, about = "Fetch many identifiers with bounded concurrency, failing fast")]
#[command(long_about = r#"
Fetches a value for every identifier with at most N fetches in flight.
The first failure cancels everything else and no partial results are printed.

Identifiers starting with "bad:" fail, identifiers starting with "slow:" hang
until the run is cancelled. Anything else resolves to a checksum.

Example:
  fanout p1 p2 p3
  fanout --max-concurrency 2 --strategy worker-pool alpha beta gamma
  fanout --timeout-ms 500 p1 slow:forever
"#)]
pub struct Args {
    /// Identifiers to fetch
    #[arg(required = true, value_name = "IDS")]
    pub ids: Vec<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", env = "FANOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum fetches in flight (values below 1 are raised to 1)
    #[arg(short = 'n', long, value_name = "N", allow_negative_numbers = true)]
    pub max_concurrency: Option<i64>,

    /// Admission strategy
    #[arg(short, long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Fail the run with "deadline exceeded" after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Simulated latency per fetch in milliseconds
    #[arg(long, value_name = "MS")]
    pub latency_ms: Option<u64>,

    /// Print Prometheus metrics to stderr after the run
    #[arg(long)]
    pub metrics: bool,
}

impl Args {
    /// Apply command-line overrides on top of loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(max) = self.max_concurrency {
            config.orchestrator.max_concurrency = max;
        }
        if let Some(strategy) = self.strategy {
            config.orchestrator.strategy = strategy.into();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.orchestrator.timeout_ms = Some(timeout_ms);
        }
        if let Some(latency_ms) = self.latency_ms {
            config.fetcher.latency_ms = latency_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["fanout", "p1", "p2"]).unwrap();
        assert_eq!(args.ids, vec!["p1", "p2"]);
        assert_eq!(args.max_concurrency, None);
        assert_eq!(args.strategy, None);
        assert!(!args.metrics);
    }

    #[test]
    fn test_parse_requires_ids() {
        assert!(Args::try_parse_from(["fanout"]).is_err());
    }

    #[test]
    fn test_parse_negative_bound() {
        let args = Args::try_parse_from(["fanout", "--max-concurrency", "-3", "a"]).unwrap();
        assert_eq!(args.max_concurrency, Some(-3));
        assert_eq!(args.ids, vec!["a"]);
    }

    #[test]
    fn test_parse_strategy() {
        let args = Args::try_parse_from(["fanout", "--strategy", "worker-pool", "a"]).unwrap();
        assert_eq!(args.strategy, Some(StrategyArg::WorkerPool));
        assert!(Args::try_parse_from(["fanout", "--strategy", "threads", "a"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::try_parse_from([
            "fanout",
            "-n",
            "0",
            "-s",
            "worker-pool",
            "--timeout-ms",
            "250",
            "--latency-ms",
            "5",
            "a",
        ])
        .unwrap();

        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config.orchestrator.max_concurrency, 0);
        assert_eq!(config.orchestrator.strategy, StrategyKind::WorkerPool);
        assert_eq!(config.orchestrator.timeout_ms, Some(250));
        assert_eq!(config.fetcher.latency_ms, 5);
    }

    #[test]
    fn test_apply_keeps_config_when_flags_absent() {
        let args = Args::try_parse_from(["fanout", "a"]).unwrap();
        let mut config = Config::default();
        config.orchestrator.max_concurrency = 9;
        args.apply_to(&mut config);
        assert_eq!(config.orchestrator.max_concurrency, 9);
        assert_eq!(config.orchestrator.timeout_ms, None);
    }
}
