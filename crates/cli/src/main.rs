mod args;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use fanout_core::{
    load_config, load_config_from_env, metrics::encode_metrics, validate_config, ChecksumFetcher,
    Config, FanOutOrchestrator, LoggingConfig, RunContext,
};

use args::Args;

/// Cancellation reason reported when the process is interrupted
const INTERRUPTED: &str = "interrupted";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Fall back to default logging when the configuration is unusable.
    let config = match load_validated_config(&args) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            return Err(e);
        }
    };

    init_logging(&config.logging);
    info!(
        "Configuration loaded: max_concurrency={}, strategy={}, timeout_ms={:?}",
        config.orchestrator.max_concurrency,
        config.orchestrator.strategy,
        config.orchestrator.timeout_ms
    );

    let fetcher =
        ChecksumFetcher::new().with_latency(Duration::from_millis(config.fetcher.latency_ms));
    let orchestrator = FanOutOrchestrator::new(config.orchestrator.clone(), Arc::new(fetcher));

    // Cancel the run on Ctrl+C or SIGTERM
    let ctx = RunContext::new();
    let signal_ctx = ctx.clone();
    let signal_handle = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, cancelling run");
        signal_ctx.cancel_with_reason(INTERRUPTED);
    });

    let outcome = orchestrator.run(args.ids, &ctx).await;
    signal_handle.abort();

    if args.metrics {
        eprint!("{}", encode_metrics());
    }

    let values = outcome.context("Fan-out run failed")?;
    let sorted: BTreeMap<_, _> = values.into_iter().collect();
    let json = serde_json::to_string_pretty(&sorted).context("Failed to encode results")?;
    println!("{}", json);

    Ok(())
}

/// Load configuration, apply command-line overrides and validate the result
fn load_validated_config(args: &Args) -> Result<Config> {
    let mut config: Config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => load_config_from_env().context("Failed to load config from environment")?,
    };
    args.apply_to(&mut config);

    validate_config(&config).context("Configuration validation failed")?;

    Ok(config)
}

/// Initialize logging to stderr; RUST_LOG takes precedence over the config
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let fmt_layer = if logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
