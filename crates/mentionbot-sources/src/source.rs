//! The adapter contract shared by every platform source.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentionbot_core::Mention;
use tokio::time::Instant;

use crate::error::SourceError;

/// Deadline used when a timeout overflows the clock.
const MAX_DEADLINE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Per-run state handed to every adapter. Carries the shared deadline that
/// bounds the whole fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchContext {
    deadline: Instant,
}

impl FetchContext {
    #[must_use]
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        Self::new(
            now.checked_add(timeout)
                .unwrap_or_else(|| now + MAX_DEADLINE),
        )
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Sleeps for `duration` or until the deadline, whichever comes first.
    ///
    /// Returns `false` when the deadline cut the pause short.
    pub async fn pause(&self, duration: Duration) -> bool {
        match Instant::now().checked_add(duration) {
            Some(wake) if wake < self.deadline => {
                tokio::time::sleep_until(wake).await;
                true
            }
            _ => {
                tokio::time::sleep_until(self.deadline).await;
                false
            }
        }
    }
}

/// A platform adapter that turns keyword searches into [`Mention`]s.
#[async_trait]
pub trait MentionSource: Send + Sync {
    /// Stable adapter name, also used as `Mention::source`.
    fn name(&self) -> &'static str;

    /// `false` when required credentials are missing. Disabled adapters are
    /// never called.
    fn is_enabled(&self) -> bool;

    /// Fetch mentions created within `window` of now.
    ///
    /// Adapters check `ctx` between units of work and return whatever they
    /// have collected once it expires.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` only when the whole fetch failed (e.g. auth).
    /// Per-keyword and per-page failures are logged and skipped.
    async fn fetch_mentions(
        &self,
        ctx: &FetchContext,
        keywords: &[String],
        window: Duration,
    ) -> Result<Vec<Mention>, SourceError>;
}

/// Oldest creation time still inside `window`.
#[must_use]
pub fn cutoff(window: Duration) -> DateTime<Utc> {
    let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Drops later mentions whose `id` was already seen. Order is preserved.
pub fn dedup_by_id(mentions: &mut Vec<Mention>) {
    let mut seen = HashSet::new();
    mentions.retain(|m| seen.insert(m.id.clone()));
}
