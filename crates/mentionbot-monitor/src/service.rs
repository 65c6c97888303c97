//! The monitoring service: the two entry points the scheduler drives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use mentionbot_core::{load_rules, AppConfig, Mention, Report, ReportSchedule, Rules};
use mentionbot_sources::{build_sources, MentionSource};

use crate::error::MonitorError;
use crate::fetch::{fetch_mentions, search_window, FetchProfile};
use crate::metrics::{MetricsStore, RunMetrics, UrgentCheckMetrics};
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::relevance::RelevanceFilter;
use crate::report::ReportBuilder;
use crate::sentiment::SentimentScorer;
use crate::store::{FsStore, MentionStore};
use crate::urgency::{should_alert, UrgencyClassifier};

/// Run parameters taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub keywords: Vec<String>,
    pub schedule: ReportSchedule,
    /// Product name used in report titles.
    pub subject: String,
    pub enable_context_filtering: bool,
    pub enable_sentiment_analysis: bool,
    pub full_run_timeout: Duration,
    pub urgent_run_timeout: Duration,
    pub urgent_window: Duration,
}

impl MonitorSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            keywords: config.keywords.clone(),
            schedule: config.report_schedule.clone(),
            subject: config.report_subject.clone(),
            enable_context_filtering: config.enable_context_filtering,
            enable_sentiment_analysis: config.enable_sentiment_analysis,
            full_run_timeout: Duration::from_secs(config.full_run_timeout_secs),
            urgent_run_timeout: Duration::from_secs(config.urgent_run_timeout_secs),
            urgent_window: Duration::from_secs(config.urgent_window_hours.saturating_mul(60 * 60)),
        }
    }
}

/// What a completed full run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub total_mentions: usize,
    pub error_count: usize,
    pub timed_out: Vec<&'static str>,
    /// Object name the mention batch was stored under.
    pub stored_as: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgentOutcome {
    /// Nothing urgent; nothing stored or sent.
    Quiet,
    /// This many urgent mentions were stored and reported.
    Alerted(usize),
}

fn batch_name(prefix: &str) -> String {
    format!("{prefix}-{}.json", Utc::now().format("%Y-%m-%d-%H-%M-%S"))
}

pub struct MonitoringService {
    settings: MonitorSettings,
    sources: Vec<Arc<dyn MentionSource>>,
    relevance: RelevanceFilter,
    urgency: UrgencyClassifier,
    sentiment: SentimentScorer,
    store: Arc<dyn MentionStore>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<MetricsStore>,
}

impl MonitoringService {
    #[must_use]
    pub fn new(
        settings: MonitorSettings,
        sources: Vec<Arc<dyn MentionSource>>,
        rules: Rules,
        store: Arc<dyn MentionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            sources,
            relevance: RelevanceFilter::new(rules.relevance),
            urgency: UrgencyClassifier::new(rules.urgency),
            sentiment: SentimentScorer::new(rules.sentiment),
            store,
            notifier,
            metrics: Arc::new(MetricsStore::new()),
        }
    }

    /// Wire the service from configuration: every platform source, the term
    /// tables, a filesystem store and a webhook (or log) notifier.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] if a source client cannot be built, the rules
    /// file is invalid, or the webhook client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, MonitorError> {
        let sources = build_sources(config)?;
        let rules = load_rules(config.rules_path.as_deref())?;
        let store: Arc<dyn MentionStore> = Arc::new(FsStore::new(config.storage_dir.clone()));
        let notifier: Arc<dyn Notifier> = match &config.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(
                url.clone(),
                config.report_subject.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )?),
            None => {
                tracing::warn!("MENTIONBOT_WEBHOOK_URL not set; reports will be written to the log");
                Arc::new(LogNotifier::new(config.report_subject.clone()))
            }
        };

        Ok(Self::new(
            MonitorSettings::from_config(config),
            sources,
            rules,
            store,
            notifier,
        ))
    }

    #[must_use]
    pub fn sources(&self) -> &[Arc<dyn MentionSource>] {
        &self.sources
    }

    #[must_use]
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Shared handle for metrics readers.
    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsStore> {
        Arc::clone(&self.metrics)
    }

    pub async fn metrics_snapshot(&self) -> RunMetrics {
        self.metrics.snapshot().await
    }

    /// Scheduled full run.
    ///
    /// Metrics are recorded before the batch is stored and the report sent,
    /// so they stay current even when delivery fails. The batch is stored and
    /// the report sent even when no mentions were found.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] if the batch cannot be serialized or stored,
    /// or the report cannot be delivered. A storage failure skips delivery.
    pub async fn run_monitoring(&self) -> Result<RunOutcome, MonitorError> {
        let started = Instant::now();
        let window = search_window(
            &self.settings.schedule,
            self.metrics.last_run().await,
            Utc::now(),
        );
        tracing::info!(
            schedule = %self.settings.schedule,
            window_hours = window.as_secs() / 3600,
            sources = self.sources.len(),
            "starting monitoring run"
        );

        let outcome = fetch_mentions(
            &self.sources,
            &self.settings.keywords,
            window,
            FetchProfile::full(self.settings.full_run_timeout),
        )
        .await;
        let mut mentions = outcome.mentions;
        tracing::info!(count = mentions.len(), "collected mentions from all sources");

        if self.settings.enable_context_filtering {
            mentions = self.relevance.filter(mentions);
            tracing::info!(count = mentions.len(), "after context filtering");
        }

        if self.settings.enable_sentiment_analysis {
            self.sentiment.score_unset(&mut mentions);
        }

        self.metrics
            .record_run(&mentions, started.elapsed(), outcome.error_count)
            .await;

        let stored_as = batch_name("mentions");
        let batch = serde_json::to_vec(&mentions)?;
        self.store.store(&stored_as, &batch).await?;

        let report = ReportBuilder::new(self.settings.schedule.label()).build(mentions);
        self.notifier.send_report(&report).await?;

        tracing::info!(
            total = report.total_mentions,
            errors = outcome.error_count,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "monitoring run complete"
        );

        Ok(RunOutcome {
            total_mentions: report.total_mentions,
            error_count: outcome.error_count,
            timed_out: outcome.timed_out,
            stored_as,
        })
    }

    /// Short-window check for relevant mentions that need attention now.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] if urgent mentions were found but could not
    /// be stored or reported.
    pub async fn run_urgent_check(&self) -> Result<UrgentOutcome, MonitorError> {
        let started = Instant::now();
        tracing::info!(
            window_hours = self.settings.urgent_window.as_secs() / 3600,
            "starting urgent check"
        );

        let outcome = fetch_mentions(
            &self.sources,
            &self.settings.keywords,
            self.settings.urgent_window,
            FetchProfile::urgent(self.settings.urgent_run_timeout),
        )
        .await;
        let candidates = outcome.mentions.len();

        let urgent: Vec<Mention> = outcome
            .mentions
            .into_iter()
            .filter(|m| should_alert(&self.relevance, &self.urgency, m))
            .collect();

        self.metrics
            .record_urgent_check(UrgentCheckMetrics {
                checked_at: Utc::now(),
                candidates,
                urgent_count: urgent.len(),
                error_count: outcome.error_count,
            })
            .await;

        if urgent.is_empty() {
            tracing::info!(candidates, "no urgent mentions found");
            return Ok(UrgentOutcome::Quiet);
        }

        let count = urgent.len();
        tracing::warn!(count, candidates, "urgent mentions found");

        let batch = serde_json::to_vec(&urgent)?;
        self.store
            .store(&batch_name("urgent-mentions"), &batch)
            .await?;

        let report = ReportBuilder::urgent(urgent, &self.settings.subject);
        self.notifier.send_report(&report).await?;

        tracing::info!(
            count,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "urgent check complete"
        );
        Ok(UrgentOutcome::Alerted(count))
    }

    /// Build a scheduled-style report from supplied mentions without any
    /// fetching, storage or delivery. Unscored mentions are scored first.
    #[must_use]
    pub fn sample_report(&self, mut mentions: Vec<Mention>) -> Report {
        self.sentiment.score_unset(&mut mentions);
        ReportBuilder::new(self.settings.schedule.label()).build(mentions)
    }

    /// Deliver an already-built report through the configured notifier.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Notify`] if delivery fails.
    pub async fn send_report(&self, report: &Report) -> Result<(), MonitorError> {
        self.notifier.send_report(report).await?;
        Ok(())
    }
}
