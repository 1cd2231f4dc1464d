use super::{types::Config, ConfigError};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate configuration
/// Currently validates:
/// - orchestrator.timeout_ms is not 0
/// - orchestrator.max_concurrency is at least 1 when strict_bounds is set
/// - logging.level is a known level
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let orchestrator = &config.orchestrator;

    if orchestrator.timeout_ms == Some(0) {
        return Err(ConfigError::ValidationError(
            "orchestrator.timeout_ms cannot be 0".to_string(),
        ));
    }

    if orchestrator.strict_bounds && orchestrator.max_concurrency < 1 {
        return Err(ConfigError::ValidationError(format!(
            "orchestrator.max_concurrency must be at least 1 when strict_bounds is set (got {})",
            orchestrator.max_concurrency
        )));
    }

    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "logging.level must be one of {:?} (got {:?})",
            LOG_LEVELS, config.logging.level
        )));
    }

    Ok(())
}
