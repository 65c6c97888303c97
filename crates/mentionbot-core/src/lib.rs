//! Shared data model, configuration and term tables for mentionbot.

pub mod app_config;
pub mod config;
pub mod models;
pub mod rules;

pub use app_config::{AppConfig, Environment, ReportSchedule};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use models::{Alert, AlertKind, Mention, Report, ReportKind, ReportSummary, Sentiment};
pub use rules::{load_rules, RelevanceRules, Rules, SentimentRules, UrgencyRules};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),

    #[error("failed to read rules file {path}: {source}")]
    RulesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rules file: {0}")]
    RulesFileParse(#[from] serde_yaml::Error),
}
