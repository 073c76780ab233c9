//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers one
//! recurring generation job per registered feed. Each cycle rebuilds the
//! feed artifact and then pings Meta that a fresh file is ready; failures
//! are logged and the next cycle proceeds normally.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use merchsync_core::AppConfig;
use merchsync_feed::{Feed, FeedRegistry, UploadClient};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    registry: Arc<FeedRegistry>,
    upload_client: Arc<UploadClient>,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    for feed in registry.iter() {
        register_generation_job(
            &scheduler,
            Arc::clone(feed),
            Arc::clone(&upload_client),
            Arc::clone(&config),
        )
        .await?;
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register a recurring generation job for one feed at its own interval.
async fn register_generation_job(
    scheduler: &JobScheduler,
    feed: Arc<Feed>,
    upload_client: Arc<UploadClient>,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let interval = feed.gen_interval();

    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let feed = Arc::clone(&feed);
        let upload_client = Arc::clone(&upload_client);
        let config = Arc::clone(&config);

        Box::pin(async move {
            run_generation_cycle(&feed, &upload_client, &config).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// One generation cycle: rebuild the artifact, then notify Meta.
async fn run_generation_cycle(feed: &Feed, upload_client: &UploadClient, config: &AppConfig) {
    let stream = feed.stream_name();

    match feed.regenerate().await {
        Ok(report) => {
            tracing::info!(
                stream = %stream,
                rows = report.rows,
                elapsed_ms = report.elapsed.as_millis(),
                "scheduler: feed regenerated"
            );
        }
        Err(e) => {
            // Generation failed, so the last good artifact keeps serving;
            // skip the upload ping for this cycle.
            tracing::error!(stream = %stream, error = %e, "scheduler: feed generation failed");
            return;
        }
    }

    feed.send_upload_notification(upload_client, &config.public_base_url)
        .await;
}
