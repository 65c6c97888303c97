use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Reporting cadence for the full monitoring run.
///
/// `Daily` and `Weekly` map to fixed lookback windows. Any other label is kept
/// verbatim and falls back to "time since the last completed run".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSchedule {
    Daily,
    Weekly,
    Custom(String),
}

impl ReportSchedule {
    /// Parses a schedule label. Matching is case-insensitive for the two
    /// built-in cadences.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "daily" => ReportSchedule::Daily,
            "weekly" => ReportSchedule::Weekly,
            _ => ReportSchedule::Custom(raw.trim().to_string()),
        }
    }

    /// Label written into `Report::period`.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            ReportSchedule::Daily => "daily",
            ReportSchedule::Weekly => "weekly",
            ReportSchedule::Custom(label) => label,
        }
    }

    /// Default cron expression for the built-in cadences (09:00 UTC).
    #[must_use]
    pub fn default_cron(&self) -> Option<&'static str> {
        match self {
            ReportSchedule::Daily => Some("0 0 9 * * *"),
            ReportSchedule::Weekly => Some("0 0 9 * * MON"),
            ReportSchedule::Custom(_) => None,
        }
    }
}

impl std::fmt::Display for ReportSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub keywords: Vec<String>,
    /// Short product name used in report and alert titles.
    pub report_subject: String,
    pub report_schedule: ReportSchedule,
    pub report_cron: String,
    pub urgent_cron: String,
    pub enable_context_filtering: bool,
    pub enable_sentiment_analysis: bool,
    pub full_run_timeout_secs: u64,
    pub urgent_run_timeout_secs: u64,
    pub urgent_window_hours: u64,
    pub storage_dir: PathBuf,
    pub rules_path: Option<PathBuf>,
    pub webhook_url: Option<String>,
    /// Bearer keys accepted on the trigger routes. Empty disables auth.
    pub api_keys: Vec<String>,
    /// Guarded requests each caller may make per minute.
    pub trigger_budget_per_minute: u32,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub twitter_keyword_delay_secs: u64,
    pub youtube_api_key: Option<String>,
    pub medium_extra_tags: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("keywords", &self.keywords)
            .field("report_subject", &self.report_subject)
            .field("report_schedule", &self.report_schedule)
            .field("report_cron", &self.report_cron)
            .field("urgent_cron", &self.urgent_cron)
            .field("enable_context_filtering", &self.enable_context_filtering)
            .field("enable_sentiment_analysis", &self.enable_sentiment_analysis)
            .field("full_run_timeout_secs", &self.full_run_timeout_secs)
            .field("urgent_run_timeout_secs", &self.urgent_run_timeout_secs)
            .field("urgent_window_hours", &self.urgent_window_hours)
            .field("storage_dir", &self.storage_dir)
            .field("rules_path", &self.rules_path)
            .field("webhook_url", &redact(&self.webhook_url))
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .field("trigger_budget_per_minute", &self.trigger_budget_per_minute)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("reddit_client_id", &redact(&self.reddit_client_id))
            .field("reddit_client_secret", &redact(&self.reddit_client_secret))
            .field("twitter_bearer_token", &redact(&self.twitter_bearer_token))
            .field(
                "twitter_keyword_delay_secs",
                &self.twitter_keyword_delay_secs,
            )
            .field("youtube_api_key", &redact(&self.youtube_api_key))
            .field("medium_extra_tags", &self.medium_extra_tags)
            .finish()
    }
}
