use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "MENTIONBOT_ENV"));
}

#[test]
fn build_app_config_defaults_from_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should be valid");

    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
    assert_eq!(cfg.keywords, vec!["Azure Kubernetes Service", "AKS"]);
    assert_eq!(cfg.report_schedule, ReportSchedule::Weekly);
    assert_eq!(cfg.report_cron, "0 0 9 * * MON");
    assert_eq!(cfg.urgent_cron, "0 0 */4 * * *");
    assert!(cfg.enable_context_filtering);
    assert!(cfg.enable_sentiment_analysis);
    assert_eq!(cfg.full_run_timeout_secs, 1800);
    assert_eq!(cfg.urgent_run_timeout_secs, 600);
    assert_eq!(cfg.urgent_window_hours, 4);
    assert_eq!(cfg.max_retries, 2);
    assert!(cfg.reddit_client_id.is_none());
    assert!(cfg.webhook_url.is_none());
    assert_eq!(cfg.medium_extra_tags, vec!["azure", "microsoft-azure"]);
    assert_eq!(cfg.report_subject, "AKS");
}

#[test]
fn keywords_are_trimmed_and_empty_entries_dropped() {
    let mut map = HashMap::new();
    map.insert("KEYWORDS", " aks , ,azure kubernetes ,");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.keywords, vec!["aks", "azure kubernetes"]);
}

#[test]
fn keywords_that_are_all_blank_fail_validation() {
    let mut map = HashMap::new();
    map.insert("KEYWORDS", " , ,");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("KEYWORDS")),
        "expected KEYWORDS validation error, got: {result:?}"
    );
}

#[test]
fn daily_schedule_uses_daily_cron() {
    let mut map = HashMap::new();
    map.insert("REPORT_SCHEDULE", "Daily");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.report_schedule, ReportSchedule::Daily);
    assert_eq!(cfg.report_cron, "0 0 9 * * *");
}

#[test]
fn custom_schedule_without_cron_fails() {
    let mut map = HashMap::new();
    map.insert("REPORT_SCHEDULE", "fortnightly");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "MENTIONBOT_REPORT_CRON"),
        "expected MissingEnvVar(MENTIONBOT_REPORT_CRON), got: {result:?}"
    );
}

#[test]
fn custom_schedule_with_cron_is_accepted() {
    let mut map = HashMap::new();
    map.insert("REPORT_SCHEDULE", "fortnightly");
    map.insert("MENTIONBOT_REPORT_CRON", "0 0 9 1,15 * *");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.report_schedule,
        ReportSchedule::Custom("fortnightly".to_string())
    );
    assert_eq!(cfg.report_cron, "0 0 9 1,15 * *");
}

#[test]
fn invalid_bind_addr_fails() {
    let mut map = HashMap::new();
    map.insert("MENTIONBOT_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "MENTIONBOT_BIND_ADDR"),
        "expected InvalidEnvVar(MENTIONBOT_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn invalid_bool_fails() {
    let mut map = HashMap::new();
    map.insert("ENABLE_SENTIMENT_ANALYSIS", "maybe");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "ENABLE_SENTIMENT_ANALYSIS"),
        "got: {result:?}"
    );
}

#[test]
fn feature_flags_can_be_disabled() {
    let mut map = HashMap::new();
    map.insert("ENABLE_CONTEXT_FILTERING", "false");
    map.insert("ENABLE_SENTIMENT_ANALYSIS", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(!cfg.enable_context_filtering);
    assert!(!cfg.enable_sentiment_analysis);
}

#[test]
fn zero_timeout_fails_validation() {
    let mut map = HashMap::new();
    map.insert("MENTIONBOT_FULL_RUN_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("MENTIONBOT_FULL_RUN_TIMEOUT_SECS")),
        "got: {result:?}"
    );
}

#[test]
fn oversized_timeouts_fail_validation() {
    let mut map = HashMap::new();
    map.insert("MENTIONBOT_FULL_RUN_TIMEOUT_SECS", "18446744073709551615");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("must be at most 86400")),
        "got: {result:?}"
    );

    let mut map = HashMap::new();
    map.insert("MENTIONBOT_URGENT_WINDOW_HOURS", "9999999999999999");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("MENTIONBOT_URGENT_WINDOW_HOURS")),
        "got: {result:?}"
    );

    let mut map = HashMap::new();
    map.insert("MENTIONBOT_URGENT_WINDOW_HOURS", "168");
    map.insert("MENTIONBOT_FULL_RUN_TIMEOUT_SECS", "86400");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.urgent_window_hours, 168);
}

#[test]
fn production_requires_webhook() {
    let mut map = HashMap::new();
    map.insert("MENTIONBOT_ENV", "production");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("MENTIONBOT_WEBHOOK_URL")),
        "got: {result:?}"
    );

    map.insert("MENTIONBOT_WEBHOOK_URL", "https://hooks.example.com/abc");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
}

#[test]
fn blank_credentials_are_treated_as_absent() {
    let mut map = HashMap::new();
    map.insert("REDDIT_CLIENT_ID", "   ");
    map.insert("YOUTUBE_API_KEY", "yt-key");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.reddit_client_id.is_none());
    assert_eq!(cfg.youtube_api_key.as_deref(), Some("yt-key"));
}

#[test]
fn debug_output_redacts_secrets() {
    let mut map = HashMap::new();
    map.insert("TWITTER_BEARER_TOKEN", "super-secret-token");
    map.insert("MENTIONBOT_WEBHOOK_URL", "https://hooks.example.com/secret-path");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("super-secret-token"));
    assert!(!rendered.contains("secret-path"));
    assert!(rendered.contains("[redacted]"));
}

#[test]
fn api_keys_are_split_and_redacted() {
    let mut map = HashMap::new();
    map.insert("MENTIONBOT_API_KEYS", " alpha-key , beta-key ,");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.api_keys, vec!["alpha-key", "beta-key"]);
    assert_eq!(cfg.trigger_budget_per_minute, 10);

    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("alpha-key"));
    assert!(rendered.contains("[2 redacted]"));
}

#[test]
fn zero_trigger_budget_fails_validation() {
    let mut map = HashMap::new();
    map.insert("MENTIONBOT_TRIGGER_BUDGET_PER_MINUTE", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("MENTIONBOT_TRIGGER_BUDGET_PER_MINUTE")),
        "got: {result:?}"
    );
}
