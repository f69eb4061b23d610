//! Cron scheduler for the periodic backup check.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use heritage_core::error::AppError;

use crate::jobs::{BackupCheck, JobOutcome};

/// Cron-based trigger for [`BackupCheck::tick`].
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler })
    }

    /// Run the backup check on a six-field cron `schedule`.
    pub async fn register_backup_check(
        &self,
        check: Arc<BackupCheck>,
        schedule: &str,
    ) -> Result<(), AppError> {
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let check = Arc::clone(&check);
            Box::pin(async move {
                match check.tick(Utc::now()).await {
                    Ok(outcomes) => {
                        let ran = outcomes
                            .iter()
                            .filter(|(_, o)| matches!(o, JobOutcome::Completed { .. }))
                            .count();
                        tracing::debug!(ran, "Backup check finished");
                    }
                    Err(e) => tracing::error!(error = %e, "Backup check failed"),
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid backup.check_schedule '{schedule}': {e}"
            ))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add backup check schedule: {e}"))
        })?;

        tracing::info!(schedule, "Registered: backup_check");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
