//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring ingestion job.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::runner::IngestRunner;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    runner: Arc<IngestRunner>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_ingestion_job(&scheduler, runner, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring ingestion run. A tick that finds the previous run
/// still going is skipped.
async fn register_ingestion_job(
    scheduler: &JobScheduler,
    runner: Arc<IngestRunner>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let runner = Arc::clone(&runner);

        Box::pin(async move {
            tracing::info!("scheduler: starting ingestion run");
            if let Err(e) = runner.spawn("scheduler", None) {
                tracing::warn!(error = %e, "scheduler: skipping tick");
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered ingestion job");
    Ok(())
}
