use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label used in report breakdowns for mentions whose sentiment was never set.
pub const UNSCORED_LABEL: &str = "unscored";

/// Overall tone of a mention as assigned by the word-list scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single piece of external content that matched one or more keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    /// Source-prefixed identifier, e.g. `reddit_abc123`.
    pub id: String,
    /// Adapter name that produced the mention.
    pub source: String,
    /// Human-facing venue, e.g. `r/kubernetes`.
    pub platform: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    pub author: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub score: i64,
    pub comment_count: i64,
    pub sentiment: Option<Sentiment>,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

impl Mention {
    /// Label used for the sentiment breakdown.
    #[must_use]
    pub fn sentiment_label(&self) -> &'static str {
        self.sentiment.map_or(UNSCORED_LABEL, Sentiment::as_str)
    }

    /// Lowercased `title + " " + content`, the text every classifier reads.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(self.title.len() + self.content.len() + 1);
        text.push_str(&self.title);
        text.push(' ');
        text.push_str(&self.content);
        text.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Scheduled,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub sources: BTreeMap<String, usize>,
    pub sentiment: BTreeMap<String, usize>,
    pub top_sources: Vec<String>,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Digest of one run, handed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub period: String,
    pub total_mentions: usize,
    pub mentions: Vec<Mention>,
    pub summary: ReportSummary,
}

impl Report {
    #[must_use]
    pub fn is_urgent(&self) -> bool {
        self.summary.kind == ReportKind::Urgent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Critical,
    Urgent,
    Info,
}

/// Out-of-band notification about a single mention or condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<Mention>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    #[must_use]
    pub fn new(kind: AlertKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            message: message.into(),
            mention: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_mention(mut self, mention: Mention) -> Self {
        self.mention = Some(mention);
        self
    }
}
