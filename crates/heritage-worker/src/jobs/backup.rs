//! Periodic backup check: run due jobs, record them, apply retention.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use heritage_core::result::AppResult;
use heritage_entity::backup::{BackupArtifact, BackupJobType, BackupSettings};
use heritage_service::backup::schedule::{is_due, prune_candidates};
use heritage_service::{AuditRecorder, BackupSettingsService, RequestContext};

use crate::claim::{ClaimToken, RunClaim};
use crate::executor::BackupExecutor;

/// Sensitive-operation tag recorded when old backups are deleted.
pub const BACKUP_PRUNE: &str = "BACKUP_PRUNE";

/// What one check did for one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Disabled or not yet due.
    NotDue,
    /// Due, but the executor has no way to back this job up.
    Unconfigured,
    /// Another trigger holds the run claim.
    Claimed,
    /// A backup ran and was recorded.
    Completed {
        /// The new backup.
        artifact: BackupArtifact,
        /// Whether `record_run` changed the settings document.
        recorded: bool,
        /// Backups deleted by retention.
        pruned: Vec<BackupArtifact>,
    },
    /// The backup or its bookkeeping failed; the job stays due.
    Failed(String),
}

/// Runs every job that is due, one tick at a time.
#[derive(Debug, Clone)]
pub struct BackupCheck {
    settings: BackupSettingsService,
    executor: Arc<dyn BackupExecutor>,
    claims: Arc<dyn RunClaim>,
    recorder: AuditRecorder,
}

impl BackupCheck {
    /// Create a new backup check.
    pub fn new(
        settings: BackupSettingsService,
        executor: Arc<dyn BackupExecutor>,
        claims: Arc<dyn RunClaim>,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            settings,
            executor,
            claims,
            recorder,
        }
    }

    /// Check every job type against `now`.
    ///
    /// Fails only if the settings document cannot be read; failures of a
    /// single job are reported in its [`JobOutcome`].
    pub async fn tick(&self, now: DateTime<Utc>) -> AppResult<Vec<(BackupJobType, JobOutcome)>> {
        let settings = self.settings.get_settings().await?;

        let mut outcomes = Vec::with_capacity(BackupJobType::ALL.len());
        for job in BackupJobType::ALL {
            let outcome = self.check_job(&settings, job, now).await;
            outcomes.push((job, outcome));
        }
        Ok(outcomes)
    }

    async fn check_job(
        &self,
        settings: &BackupSettings,
        job: BackupJobType,
        now: DateTime<Utc>,
    ) -> JobOutcome {
        if !is_due(settings, job, now) {
            tracing::debug!(job = %job, "Backup not due");
            return JobOutcome::NotDue;
        }
        if !self.executor.is_configured(job) {
            tracing::debug!(job = %job, "Backup due but no backup command is configured");
            return JobOutcome::Unconfigured;
        }

        let token = match self.claims.try_claim(job, now).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::info!(job = %job, "Backup already claimed by another trigger");
                return JobOutcome::Claimed;
            }
            Err(e) => {
                tracing::error!(job = %job, error = %e, "Failed to claim backup run");
                return JobOutcome::Failed(e.to_string());
            }
        };

        let outcome = match self.run_claimed(job, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(job = %job, error = %e, "Backup run failed");
                JobOutcome::Failed(e.to_string())
            }
        };

        self.release(&token).await;
        outcome
    }

    async fn run_claimed(&self, job: BackupJobType, now: DateTime<Utc>) -> AppResult<JobOutcome> {
        // Another trigger may have finished the job between our read and the claim.
        let fresh = self.settings.get_settings().await?;
        if !is_due(&fresh, job, now) {
            tracing::info!(job = %job, "Backup completed elsewhere, skipping");
            return Ok(JobOutcome::NotDue);
        }

        // The artifact's file time may come from the source data, so the
        // run is recorded at the tick time plus how long it took.
        let started = Instant::now();
        let artifact = self.executor.run_backup(job).await?;
        let completed_at = now + Duration::from_std(started.elapsed()).unwrap_or(Duration::zero());

        let outcome = self.settings.record_run(job, completed_at).await?;
        let max_keep = outcome.settings().policy(job).max_backups_to_keep;
        let pruned = self.apply_retention(job, max_keep).await?;

        Ok(JobOutcome::Completed {
            artifact,
            recorded: outcome.was_recorded(),
            pruned,
        })
    }

    async fn apply_retention(
        &self,
        job: BackupJobType,
        max_keep: u32,
    ) -> AppResult<Vec<BackupArtifact>> {
        let artifacts = self.executor.list_artifacts(job).await?;
        let candidates = prune_candidates(&artifacts, max_keep);

        let mut pruned = Vec::with_capacity(candidates.len());
        for artifact in candidates {
            match self.executor.delete_artifact(&artifact).await {
                Ok(()) => pruned.push(artifact),
                Err(e) => tracing::warn!(
                    job = %job,
                    path = %artifact.path.display(),
                    error = %e,
                    "Failed to delete old backup"
                ),
            }
        }

        if !pruned.is_empty() {
            let paths: Vec<String> = pruned
                .iter()
                .map(|a| a.path.display().to_string())
                .collect();
            tracing::info!(job = %job, deleted = pruned.len(), max_keep, "Pruned old backups");
            self.recorder
                .record_sensitive_operation(
                    &RequestContext::system(),
                    BACKUP_PRUNE,
                    Some(json!({
                        "job": job.as_str(),
                        "maxBackupsToKeep": max_keep,
                        "deleted": paths,
                    })),
                )
                .await;
        }

        Ok(pruned)
    }

    async fn release(&self, token: &ClaimToken) {
        if let Err(e) = self.claims.release(token).await {
            tracing::warn!(job = %token.job, error = %e, "Failed to release backup claim");
        }
    }
}
