use crate::app_config::{AppConfig, Environment, ReportSchedule};
use crate::ConfigError;

const DEFAULT_KEYWORDS: &str = "Azure Kubernetes Service,AKS";
const DEFAULT_URGENT_CRON: &str = "0 0 */4 * * *";
const MAX_RUN_TIMEOUT_SECS: u64 = 24 * 60 * 60;
const MAX_URGENT_WINDOW_HOURS: u64 = 7 * 24;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 60 * 60;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or validation fails.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or validation fails.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or validation fails.
#[allow(clippy::too_many_lines)]
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match optional(var) {
            None => Ok(default),
            Some(raw) => parse_bool_value(&raw)
                .ok_or_else(|| invalid(var, format!("expected a boolean, got '{raw}'"))),
        }
    };

    let env = parse_environment(&or_default("MENTIONBOT_ENV", "development"))?;
    let bind_addr = parse_addr("MENTIONBOT_BIND_ADDR", "0.0.0.0:8080")?;
    let log_level = or_default("MENTIONBOT_LOG_LEVEL", "info");

    let keywords = split_list(&or_default("KEYWORDS", DEFAULT_KEYWORDS));
    let report_subject = or_default("MENTIONBOT_REPORT_SUBJECT", "AKS");
    let report_schedule = ReportSchedule::parse(&or_default("REPORT_SCHEDULE", "weekly"));
    let report_cron = match optional("MENTIONBOT_REPORT_CRON") {
        Some(cron) => cron,
        None => report_schedule
            .default_cron()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingEnvVar("MENTIONBOT_REPORT_CRON".to_string()))?,
    };
    let urgent_cron = or_default("MENTIONBOT_URGENT_CRON", DEFAULT_URGENT_CRON);

    let enable_context_filtering = parse_bool("ENABLE_CONTEXT_FILTERING", true)?;
    let enable_sentiment_analysis = parse_bool("ENABLE_SENTIMENT_ANALYSIS", true)?;

    let full_run_timeout_secs = parse_u64("MENTIONBOT_FULL_RUN_TIMEOUT_SECS", "1800")?;
    let urgent_run_timeout_secs = parse_u64("MENTIONBOT_URGENT_RUN_TIMEOUT_SECS", "600")?;
    let urgent_window_hours = parse_u64("MENTIONBOT_URGENT_WINDOW_HOURS", "4")?;

    let storage_dir = PathBuf::from(or_default("MENTIONBOT_STORAGE_DIR", "./data/mentions"));
    let rules_path = optional("MENTIONBOT_RULES_PATH").map(PathBuf::from);
    let webhook_url = optional("MENTIONBOT_WEBHOOK_URL");
    let api_keys = split_list(&or_default("MENTIONBOT_API_KEYS", ""));
    let trigger_budget_per_minute = parse_u32("MENTIONBOT_TRIGGER_BUDGET_PER_MINUTE", "10")?;

    let request_timeout_secs = parse_u64("MENTIONBOT_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("MENTIONBOT_USER_AGENT", "mentionbot/0.1 (mention-monitoring)");
    let max_retries = parse_u32("MENTIONBOT_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("MENTIONBOT_RETRY_BACKOFF_BASE_MS", "500")?;

    let reddit_client_id = optional("REDDIT_CLIENT_ID");
    let reddit_client_secret = optional("REDDIT_CLIENT_SECRET");
    let twitter_bearer_token = optional("TWITTER_BEARER_TOKEN");
    let twitter_keyword_delay_secs = parse_u64("TWITTER_KEYWORD_DELAY_SECS", "3")?;
    let youtube_api_key = optional("YOUTUBE_API_KEY");
    let medium_extra_tags = split_list(&or_default("MEDIUM_EXTRA_TAGS", "azure,microsoft-azure"));

    let config = AppConfig {
        env,
        bind_addr,
        log_level,
        keywords,
        report_subject,
        report_schedule,
        report_cron,
        urgent_cron,
        enable_context_filtering,
        enable_sentiment_analysis,
        full_run_timeout_secs,
        urgent_run_timeout_secs,
        urgent_window_hours,
        storage_dir,
        rules_path,
        webhook_url,
        api_keys,
        trigger_budget_per_minute,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        reddit_client_id,
        reddit_client_secret,
        twitter_bearer_token,
        twitter_keyword_delay_secs,
        youtube_api_key,
        medium_extra_tags,
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.report_schedule.label().is_empty() {
        return Err(ConfigError::Validation(
            "REPORT_SCHEDULE must be non-empty".to_string(),
        ));
    }

    if config.keywords.is_empty() {
        return Err(ConfigError::Validation(
            "KEYWORDS must contain at least one non-empty keyword".to_string(),
        ));
    }

    for (var, value, max) in [
        (
            "MENTIONBOT_FULL_RUN_TIMEOUT_SECS",
            config.full_run_timeout_secs,
            MAX_RUN_TIMEOUT_SECS,
        ),
        (
            "MENTIONBOT_URGENT_RUN_TIMEOUT_SECS",
            config.urgent_run_timeout_secs,
            MAX_RUN_TIMEOUT_SECS,
        ),
        (
            "MENTIONBOT_URGENT_WINDOW_HOURS",
            config.urgent_window_hours,
            MAX_URGENT_WINDOW_HOURS,
        ),
        (
            "MENTIONBOT_REQUEST_TIMEOUT_SECS",
            config.request_timeout_secs,
            MAX_REQUEST_TIMEOUT_SECS,
        ),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{var} must be greater than zero"
            )));
        }
        if value > max {
            return Err(ConfigError::Validation(format!(
                "{var} must be at most {max}, got {value}"
            )));
        }
    }

    if config.trigger_budget_per_minute == 0 {
        return Err(ConfigError::Validation(
            "MENTIONBOT_TRIGGER_BUDGET_PER_MINUTE must be greater than zero".to_string(),
        ));
    }

    if config.twitter_keyword_delay_secs > MAX_REQUEST_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "TWITTER_KEYWORD_DELAY_SECS must be at most {MAX_REQUEST_TIMEOUT_SECS}"
        )));
    }

    if config.webhook_url.is_none() && config.env != Environment::Development {
        return Err(ConfigError::Validation(format!(
            "MENTIONBOT_WEBHOOK_URL is required in the {} environment",
            config.env
        )));
    }

    Ok(())
}

/// Splits a comma-separated list, trimming entries and dropping empties.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_bool_value(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MENTIONBOT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
