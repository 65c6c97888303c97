//! Starts monitoring runs in the background, one of each kind at a time.

use std::sync::Arc;

use mentionbot_monitor::{MonitoringService, UrgentOutcome};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct Runner {
    service: Arc<MonitoringService>,
    full: Arc<Mutex<()>>,
    urgent: Arc<Mutex<()>>,
}

impl Runner {
    #[must_use]
    pub fn new(service: Arc<MonitoringService>) -> Self {
        Self {
            service,
            full: Arc::new(Mutex::new(())),
            urgent: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn service(&self) -> &MonitoringService {
        &self.service
    }

    /// Spawn a full run. `None` when one is already in progress.
    pub fn try_start_full(&self, trigger: &'static str) -> Option<JoinHandle<()>> {
        let Ok(guard) = Arc::clone(&self.full).try_lock_owned() else {
            tracing::warn!(trigger, "monitoring run already in progress; not starting another");
            return None;
        };
        let service = Arc::clone(&self.service);

        Some(tokio::spawn(async move {
            let _guard = guard;
            tracing::info!(trigger, "monitoring run started");
            match service.run_monitoring().await {
                Ok(outcome) => tracing::info!(
                    trigger,
                    total = outcome.total_mentions,
                    errors = outcome.error_count,
                    timed_out = ?outcome.timed_out,
                    stored_as = %outcome.stored_as,
                    "monitoring run finished"
                ),
                Err(e) => tracing::error!(trigger, error = %e, "monitoring run failed"),
            }
        }))
    }

    /// Spawn an urgent check. `None` when one is already in progress.
    pub fn try_start_urgent(&self, trigger: &'static str) -> Option<JoinHandle<()>> {
        let Ok(guard) = Arc::clone(&self.urgent).try_lock_owned() else {
            tracing::warn!(trigger, "urgent check already in progress; not starting another");
            return None;
        };
        let service = Arc::clone(&self.service);

        Some(tokio::spawn(async move {
            let _guard = guard;
            match service.run_urgent_check().await {
                Ok(UrgentOutcome::Quiet) => {
                    tracing::info!(trigger, "urgent check finished, nothing to report");
                }
                Ok(UrgentOutcome::Alerted(count)) => {
                    tracing::warn!(trigger, count, "urgent check finished, alert sent");
                }
                Err(e) => tracing::error!(trigger, error = %e, "urgent check failed"),
            }
        }))
    }
}
