//! The mention pipeline: fetch, filter, score, store, report and notify.

pub mod error;
pub mod fetch;
pub mod metrics;
pub mod notify;
pub mod relevance;
pub mod report;
pub mod sentiment;
pub mod service;
pub mod store;
pub mod urgency;

pub use error::{MonitorError, NotifyError, StorageError};
pub use fetch::{fetch_mentions, search_window, FetchOutcome, FetchProfile};
pub use metrics::{MetricsStore, RunMetrics, UrgentCheckMetrics};
pub use notify::{report_summary_line, report_title, LogNotifier, Notifier, WebhookNotifier};
pub use relevance::RelevanceFilter;
pub use report::ReportBuilder;
pub use sentiment::SentimentScorer;
pub use service::{MonitorSettings, MonitoringService, RunOutcome, UrgentOutcome};
pub use store::{FsStore, MentionStore};
pub use urgency::{should_alert, UrgencyCategory, UrgencyClassifier};
