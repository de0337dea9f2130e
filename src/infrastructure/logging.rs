use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const LOG_FILE_NAME: &str = "scheduler.log";
pub const LOG_FILTER_ENV: &str = "SCHEDULER_LOG";

/// Installs a JSON file subscriber under `logs_dir`.
///
/// `SCHEDULER_LOG` takes precedence over `default_level`. The returned guard must be held for as
/// long as logs should be flushed. Installing twice is not an error; the first subscriber wins.
pub fn init_logging(logs_dir: &Path, default_level: &str) -> Result<WorkerGuard, InfraError> {
    fs::create_dir_all(logs_dir)?;
    let file_appender = tracing_appender::rolling::never(logs_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = build_filter(std::env::var(LOG_FILTER_ENV).ok(), default_level)?;
    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_target(true)
        .with_current_span(false)
        .with_filter(filter);

    if tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }
    Ok(guard)
}

fn build_filter(env_value: Option<String>, default_level: &str) -> Result<EnvFilter, InfraError> {
    let directive = env_value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default_level.trim().to_string());
    EnvFilter::try_new(&directive)
        .map_err(|error| InfraError::InvalidConfig(format!("invalid log filter '{directive}': {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_filter_overrides_default_level() {
        let filter = build_filter(Some("activity_scheduler=debug".to_string()), "info")
            .expect("valid filter");
        assert_eq!(filter.to_string(), "activity_scheduler=debug");
    }

    #[test]
    fn blank_environment_falls_back_to_default_level() {
        let filter = build_filter(Some("  ".to_string()), "warn").expect("valid filter");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn malformed_filter_is_config_error() {
        assert!(matches!(
            build_filter(None, "activity_scheduler=[[["),
            Err(InfraError::InvalidConfig(_))
        ));
    }
}
