//! Background job scheduler.
//!
//! Registers the optional unattended auto-collect job when
//! `KWDB_AUTO_COLLECT_CRON` is configured.

use kwdb_core::AppConfig;
use kwdb_db::TriggerSource;
use kwdb_research::{CollectError, RunRequest};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;
use crate::runs::start_auto_run;

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// configured cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    state: AppState,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    start_scheduler(
        state,
        config.auto_collect_cron.as_deref(),
        config.auto_collect_target,
    )
    .await
}

async fn start_scheduler(
    state: AppState,
    cron: Option<&str>,
    target_count: u32,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    if let Some(cron) = cron {
        register_auto_collect_job(&scheduler, state, cron, target_count).await?;
    } else {
        tracing::debug!("scheduler: no auto-collect cron configured");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_auto_collect_job(
    scheduler: &JobScheduler,
    state: AppState,
    cron: &str,
    target_count: u32,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            run_scheduled_collect(&state, target_count);
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, target_count, "scheduler: registered auto-collect job");
    Ok(())
}

fn run_scheduled_collect(state: &AppState, target_count: u32) {
    let request = RunRequest {
        target_count,
        initial_seeds: Vec::new(),
    };
    match start_auto_run(state, request, TriggerSource::Scheduler) {
        Ok(_) => tracing::info!(target_count, "scheduler: auto-collect run started"),
        Err(CollectError::ConcurrentRunConflict) => {
            tracing::info!("scheduler: auto-collect already running; skipping");
        }
        Err(e) => tracing::error!(error = %e, "scheduler: auto-collect failed to start"),
    }
}
