use crate::domain::models::DEFAULT_DURATION_MINUTES;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const SCHEDULER_JSON: &str = "scheduler.json";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_LOG_LEVEL: &str = "info";
const ENV_API_BASE_URL: &[&str] = &["SCHEDULER_API_BASE_URL", "ACTIVITY_API_BASE_URL"];
const ENV_TIMEZONE: &[&str] = &["SCHEDULER_TIMEZONE", "TZ_DISPLAY"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the optimistic local state in place after a failed write.
    #[default]
    KeepLocal,
    /// Reload the full collection after a failed write.
    Reload,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct SchedulerConfigFile {
    schema: u8,
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    display_timezone: Option<String>,
    #[serde(default)]
    default_duration_minutes: Option<u32>,
    #[serde(default)]
    failure_policy: Option<FailurePolicy>,
    #[serde(default)]
    load_retry: Option<RetryPolicy>,
    #[serde(default)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub api_base_url: String,
    pub display_timezone: Tz,
    pub default_duration_minutes: u32,
    pub failure_policy: FailurePolicy,
    pub load_retry: RetryPolicy,
    pub log_level: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            display_timezone: chrono_tz::UTC,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            failure_policy: FailurePolicy::KeepLocal,
            load_retry: RetryPolicy::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn default_file() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "apiBaseUrl": DEFAULT_API_BASE_URL,
        "displayTimezone": DEFAULT_TIMEZONE,
        "defaultDurationMinutes": DEFAULT_DURATION_MINUTES,
        "failurePolicy": "keep_local",
        "loadRetry": {
            "maxAttempts": 3,
            "baseDelayMs": 200
        },
        "logLevel": DEFAULT_LOG_LEVEL
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(SCHEDULER_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_file())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<SchedulerConfigFile, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(serde_json::from_value(parsed)?)
}

pub fn load_config(config_dir: &Path) -> Result<SchedulerConfig, InfraError> {
    load_config_with_lookup(config_dir, |key| std::env::var(key).ok())
}

/// Reads `scheduler.json` and applies environment overrides resolved through `lookup`.
pub fn load_config_with_lookup<F>(config_dir: &Path, lookup: F) -> Result<SchedulerConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = read_config(&config_dir.join(SCHEDULER_JSON))?;
    let defaults = SchedulerConfig::default();

    let api_base_url = optional_lookup_value(&lookup, ENV_API_BASE_URL)
        .or_else(|| non_blank(file.api_base_url))
        .unwrap_or(defaults.api_base_url);
    let timezone_name = optional_lookup_value(&lookup, ENV_TIMEZONE)
        .or_else(|| non_blank(file.display_timezone))
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let display_timezone = parse_timezone(&timezone_name)?;

    let default_duration_minutes = file
        .default_duration_minutes
        .unwrap_or(defaults.default_duration_minutes);
    if default_duration_minutes == 0 {
        return Err(InfraError::InvalidConfig(
            "defaultDurationMinutes must be > 0".to_string(),
        ));
    }

    let load_retry = file.load_retry.unwrap_or(defaults.load_retry);
    if load_retry.max_attempts == 0 {
        return Err(InfraError::InvalidConfig(
            "loadRetry.maxAttempts must be > 0".to_string(),
        ));
    }

    Ok(SchedulerConfig {
        api_base_url,
        display_timezone,
        default_duration_minutes,
        failure_policy: file.failure_policy.unwrap_or(defaults.failure_policy),
        load_retry,
        log_level: non_blank(file.log_level).unwrap_or(defaults.log_level),
    })
}

pub fn parse_timezone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid displayTimezone '{name}': {error}")))
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|key| non_blank(lookup(key)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
