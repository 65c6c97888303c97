//! Background job scheduler.
//!
//! Registers the full monitoring run on `report_cron` and the urgent check on
//! `urgent_cron`. Both go through the [`Runner`], so a job that fires while the
//! previous one is still running is skipped.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::runner::Runner;

/// Builds and starts the scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    runner: Runner,
    report_cron: &str,
    urgent_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_monitoring_job(&scheduler, runner.clone(), report_cron).await?;
    register_urgent_job(&scheduler, runner, urgent_cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_monitoring_job(
    scheduler: &JobScheduler,
    runner: Runner,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let runner = runner.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting monitoring run");
            if let Some(handle) = runner.try_start_full("scheduler") {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "scheduler: monitoring run task aborted");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered monitoring job");
    Ok(())
}

async fn register_urgent_job(
    scheduler: &JobScheduler,
    runner: Runner,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let runner = runner.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting urgent check");
            if let Some(handle) = runner.try_start_urgent("scheduler") {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "scheduler: urgent check task aborted");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered urgent check job");
    Ok(())
}
