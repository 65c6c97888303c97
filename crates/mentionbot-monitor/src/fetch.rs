//! Fan-out/fan-in fetch across every enabled source under one deadline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mentionbot_core::{Mention, ReportSchedule};
use mentionbot_sources::{dedup_by_id, FetchContext, MentionSource};
use tokio::task::JoinSet;
use tokio::time::Instant;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
/// Upper bound on a run deadline.
const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Deadline parameters for one kind of run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProfile {
    pub label: &'static str,
    pub timeout: Duration,
}

impl FetchProfile {
    #[must_use]
    pub fn full(timeout: Duration) -> Self {
        Self {
            label: "full",
            timeout,
        }
    }

    #[must_use]
    pub fn urgent(timeout: Duration) -> Self {
        Self {
            label: "urgent",
            timeout,
        }
    }
}

/// Merged result of one fetch across all sources.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Union of every completed source's mentions, deduplicated by id.
    pub mentions: Vec<Mention>,
    /// Sources that returned an error or panicked.
    pub error_count: usize,
    pub succeeded: Vec<&'static str>,
    pub failed: Vec<&'static str>,
    /// Sources still running when the deadline fired. Their results are dropped.
    pub timed_out: Vec<&'static str>,
    /// Sources not called because they are disabled.
    pub skipped: Vec<&'static str>,
}

/// Lookback window for a full run.
///
/// `daily` and `weekly` are fixed. Any other schedule searches back to the
/// previous completed run, never less than 24 hours.
#[must_use]
pub fn search_window(
    schedule: &ReportSchedule,
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Duration {
    match schedule {
        ReportSchedule::Daily => DAY,
        ReportSchedule::Weekly => DAY * 7,
        ReportSchedule::Custom(_) => last_run
            .and_then(|last| (now - last).to_std().ok())
            .map_or(DAY, |since| since.max(DAY)),
    }
}

/// Run every enabled source concurrently and merge what finishes before the
/// profile's deadline.
pub async fn fetch_mentions(
    sources: &[Arc<dyn MentionSource>],
    keywords: &[String],
    window: Duration,
    profile: FetchProfile,
) -> FetchOutcome {
    let deadline = Instant::now() + profile.timeout.min(MAX_TIMEOUT);
    let ctx = FetchContext::new(deadline);
    let keywords: Arc<[String]> = keywords.into();

    let mut outcome = FetchOutcome::default();
    let mut tasks = JoinSet::new();
    let mut pending = HashMap::new();

    for source in sources {
        let name = source.name();
        if !source.is_enabled() {
            tracing::debug!(source = name, profile = profile.label, "source disabled, skipping");
            outcome.skipped.push(name);
            continue;
        }

        let source = Arc::clone(source);
        let keywords = Arc::clone(&keywords);
        tracing::info!(source = name, window_secs = window.as_secs(), "fetching mentions");
        let handle = tasks.spawn(async move { source.fetch_mentions(&ctx, &keywords, window).await });
        pending.insert(handle.id(), name);
    }

    loop {
        let next = match tokio::time::timeout_at(deadline, tasks.join_next_with_id()).await {
            Ok(Some(next)) => next,
            Ok(None) => break,
            Err(_) => {
                tasks.abort_all();
                outcome.timed_out = pending.into_values().collect();
                outcome.timed_out.sort_unstable();
                tracing::warn!(
                    profile = profile.label,
                    sources = ?outcome.timed_out,
                    "fetch deadline reached, dropping unfinished sources"
                );
                break;
            }
        };

        match next {
            Ok((id, Ok(mentions))) => {
                let name = pending.remove(&id).unwrap_or("unknown");
                tracing::info!(source = name, count = mentions.len(), "source finished");
                outcome.succeeded.push(name);
                outcome.mentions.extend(mentions);
            }
            Ok((id, Err(e))) => {
                let name = pending.remove(&id).unwrap_or("unknown");
                tracing::error!(source = name, error = %e, "source failed");
                outcome.failed.push(name);
                outcome.error_count += 1;
            }
            Err(join_err) => {
                let name = pending.remove(&join_err.id()).unwrap_or("unknown");
                tracing::error!(source = name, error = %join_err, "source task panicked");
                outcome.failed.push(name);
                outcome.error_count += 1;
            }
        }
    }

    let before = outcome.mentions.len();
    dedup_by_id(&mut outcome.mentions);
    tracing::info!(
        profile = profile.label,
        total = outcome.mentions.len(),
        duplicates = before - outcome.mentions.len(),
        errors = outcome.error_count,
        "fetch complete"
    );

    outcome
}
