//! Report and alert delivery.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentionbot_core::{Alert, Report};
use reqwest::Client;
use serde::Serialize;

use crate::error::NotifyError;

const MAX_WEBHOOK_MENTIONS: usize = 10;
const TITLE_CHARS: usize = 150;
const SNIPPET_CHARS: usize = 300;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_report(&self, report: &Report) -> Result<(), NotifyError>;
    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct WebhookMention<'a> {
    source: &'a str,
    title: String,
    url: &'a str,
    snippet: String,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct WebhookReport<'a> {
    title: String,
    summary: String,
    mentions: Vec<WebhookMention<'a>>,
    report: &'a Report,
}

#[derive(Debug, Serialize)]
struct WebhookAlert<'a> {
    title: &'a str,
    summary: &'a str,
    alert: &'a Alert,
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Headline for a report, e.g. `AKS Mentions Report - Daily (Mar 10, 2024)`.
#[must_use]
pub fn report_title(report: &Report, subject: &str) -> String {
    if let Some(title) = &report.summary.title {
        return title.clone();
    }
    let end = report.generated_at.format("%b %-d, %Y");
    match report.period.as_str() {
        "weekly" => {
            let start = (report.generated_at - chrono::Duration::days(7)).format("%b %-d");
            format!("{subject} Mentions Report - Weekly ({start} - {end})")
        }
        period => format!(
            "{subject} Mentions Report - {} ({end})",
            capitalize(period)
        ),
    }
}

#[must_use]
pub fn report_summary_line(report: &Report) -> String {
    match &report.summary.description {
        Some(description) => description.clone(),
        None => format!(
            "Found {} mentions in the last {}",
            report.total_mentions, report.period
        ),
    }
}

/// Posts JSON digests to a webhook (Teams workflow, Slack relay, Logic App...).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    subject: String,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        subject: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            subject: subject.into(),
        })
    }

    async fn post<T: Serialize + Sync>(&self, body: &T) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::UnexpectedStatus {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_report(&self, report: &Report) -> Result<(), NotifyError> {
        let message = WebhookReport {
            title: report_title(report, &self.subject),
            summary: report_summary_line(report),
            mentions: report
                .mentions
                .iter()
                .take(MAX_WEBHOOK_MENTIONS)
                .map(|m| WebhookMention {
                    source: &m.source,
                    title: truncate(&m.title, TITLE_CHARS),
                    url: &m.url,
                    snippet: truncate(&m.content, SNIPPET_CHARS),
                    timestamp: format_timestamp(m.created_at),
                })
                .collect(),
            report,
        };

        self.post(&message).await?;
        tracing::info!(
            total = report.total_mentions,
            urgent = report.is_urgent(),
            "report delivered to webhook"
        );
        Ok(())
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.post(&WebhookAlert {
            title: &alert.title,
            summary: &alert.message,
            alert,
        })
        .await?;
        tracing::info!(alert_id = %alert.id, "alert delivered to webhook");
        Ok(())
    }
}

/// Writes digests to the log. Used in development when no webhook is set.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    subject: String,
}

impl LogNotifier {
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_report(&self, report: &Report) -> Result<(), NotifyError> {
        tracing::info!(
            title = %report_title(report, &self.subject),
            total = report.total_mentions,
            sources = ?report.summary.sources,
            sentiment = ?report.summary.sentiment,
            top_sources = ?report.summary.top_sources,
            "{}",
            report_summary_line(report)
        );
        for mention in report.mentions.iter().take(MAX_WEBHOOK_MENTIONS) {
            tracing::info!(
                source = %mention.source,
                url = %mention.url,
                sentiment = mention.sentiment_label(),
                "{}",
                truncate(&mention.title, TITLE_CHARS)
            );
        }
        Ok(())
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError> {
        tracing::warn!(
            alert_id = %alert.id,
            kind = ?alert.kind,
            title = %alert.title,
            "{}",
            alert.message
        );
        Ok(())
    }
}
