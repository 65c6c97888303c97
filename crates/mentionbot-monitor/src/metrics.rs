//! Process-wide summary of the most recent runs.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mentionbot_core::Mention;
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrgentCheckMetrics {
    pub checked_at: DateTime<Utc>,
    pub candidates: usize,
    pub urgent_count: usize,
    pub error_count: usize,
}

/// Statistics of the last completed full run, plus the last urgent check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    pub total_mentions: usize,
    pub last_run: Option<DateTime<Utc>>,
    pub last_run_duration_ms: u64,
    pub source_metrics: BTreeMap<String, usize>,
    pub sentiment_breakdown: BTreeMap<String, usize>,
    pub error_count: usize,
    pub last_urgent_check: Option<UrgentCheckMetrics>,
}

/// Lock-guarded [`RunMetrics`]. Readers never observe a half-written run.
#[derive(Debug, Default)]
pub struct MetricsStore {
    inner: RwLock<RunMetrics>,
}

impl MetricsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every full-run field with the results of the run that just
    /// finished. The last urgent check is kept.
    pub async fn record_run(&self, mentions: &[Mention], duration: Duration, error_count: usize) {
        let mut source_metrics = BTreeMap::new();
        let mut sentiment_breakdown = BTreeMap::new();
        for mention in mentions {
            *source_metrics.entry(mention.source.clone()).or_insert(0) += 1;
            *sentiment_breakdown
                .entry(mention.sentiment_label().to_string())
                .or_insert(0) += 1;
        }

        let mut metrics = self.inner.write().await;
        metrics.total_mentions = mentions.len();
        metrics.last_run = Some(Utc::now());
        metrics.last_run_duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        metrics.source_metrics = source_metrics;
        metrics.sentiment_breakdown = sentiment_breakdown;
        metrics.error_count = error_count;
    }

    pub async fn record_urgent_check(&self, check: UrgentCheckMetrics) {
        self.inner.write().await.last_urgent_check = Some(check);
    }

    pub async fn snapshot(&self) -> RunMetrics {
        self.inner.read().await.clone()
    }

    pub async fn last_run(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_run
    }
}
