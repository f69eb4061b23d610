//! Backup settings service.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{info, warn};
use validator::Validate;

use heritage_core::result::AppResult;
use heritage_database::{BackupSettingsRepository, RecordRunOutcome};
use heritage_entity::backup::{BackupJobType, BackupSettings, BackupSettingsUpdate};

/// Reads and changes the singleton backup settings document.
#[derive(Debug, Clone)]
pub struct BackupSettingsService {
    repo: Arc<dyn BackupSettingsRepository>,
}

impl BackupSettingsService {
    /// Creates a new settings service.
    pub fn new(repo: Arc<dyn BackupSettingsRepository>) -> Self {
        Self { repo }
    }

    /// Return the settings document, creating it with defaults on first use.
    pub async fn get_settings(&self) -> AppResult<BackupSettings> {
        self.repo.get_or_create(now()).await
    }

    /// Validate and deep-merge a partial update.
    ///
    /// Invalid values are rejected with a validation error before anything
    /// is written.
    pub async fn update_settings(
        &self,
        update: &BackupSettingsUpdate,
        updated_by: &str,
    ) -> AppResult<BackupSettings> {
        update.validate()?;

        let settings = self.repo.merge_update(update, updated_by, now()).await?;
        info!(
            updated_by,
            family_tree_enabled = settings.family_tree_backup.enabled,
            cms_enabled = settings.cms_backup.enabled,
            "Backup settings updated"
        );
        Ok(settings)
    }

    /// Report a completed run of `job`.
    ///
    /// Reporting the same or an older completion time again changes nothing
    /// and yields [`RecordRunOutcome::Stale`].
    pub async fn record_run(
        &self,
        job: BackupJobType,
        completed_at: DateTime<Utc>,
    ) -> AppResult<RecordRunOutcome> {
        // Stored run times carry whole microseconds.
        let completed_at = completed_at.trunc_subsecs(6);
        let outcome = self.repo.record_run(job, completed_at).await?;

        match &outcome {
            RecordRunOutcome::Recorded(settings) => info!(
                job = %job,
                completed_at = %completed_at,
                next = ?settings.policy(job).next_scheduled_backup,
                "Backup run recorded"
            ),
            RecordRunOutcome::Stale(settings) => warn!(
                job = %job,
                completed_at = %completed_at,
                last = ?settings.policy(job).last_auto_backup,
                "Ignoring stale backup run report"
            ),
        }
        Ok(outcome)
    }
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use heritage_core::ErrorKind;
    use heritage_database::MemoryBackupSettingsRepository;

    use super::*;
    use crate::backup::schedule::is_due;

    fn service() -> BackupSettingsService {
        BackupSettingsService::new(Arc::new(MemoryBackupSettingsRepository::new()))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn update(json: &str) -> BackupSettingsUpdate {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_first_access_creates_defaults() {
        let settings = service().get_settings().await.unwrap();
        for job in BackupJobType::ALL {
            let policy = settings.policy(job);
            assert!(policy.enabled);
            assert_eq!(policy.interval_hours, 48.0);
            assert_eq!(policy.max_backups_to_keep, 20);
            assert!(policy.last_auto_backup.is_none());
        }
        assert_eq!(settings.settings_id, "default");
    }

    #[tokio::test]
    async fn test_concurrent_first_access_yields_one_document() {
        let service = service();
        let calls = (0..10).map(|_| {
            let service = service.clone();
            async move { service.get_settings().await.unwrap() }
        });
        let documents = futures::future::join_all(calls).await;
        assert!(documents.iter().all(|d| d.created_at == documents[0].created_at));
    }

    #[tokio::test]
    async fn test_update_is_deep_merge() {
        let service = service();
        service
            .update_settings(&update(r#"{"cmsBackup":{"maxBackupsToKeep":5}}"#), "alice")
            .await
            .unwrap();

        let settings = service
            .update_settings(&update(r#"{"familyTreeBackup":{"intervalHours":72}}"#), "bob")
            .await
            .unwrap();

        assert_eq!(settings.family_tree_backup.interval_hours, 72.0);
        assert_eq!(settings.family_tree_backup.max_backups_to_keep, 20);
        assert!(settings.family_tree_backup.enabled);
        assert_eq!(settings.cms_backup.max_backups_to_keep, 5);
        assert_eq!(settings.cms_backup.interval_hours, 48.0);
        assert_eq!(settings.updated_by.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected_before_persisting() {
        let service = service();
        for body in [
            r#"{"familyTreeBackup":{"intervalHours":0}}"#,
            r#"{"familyTreeBackup":{"intervalHours":-2}}"#,
            r#"{"cmsBackup":{"maxBackupsToKeep":-1}}"#,
        ] {
            let err = service
                .update_settings(&update(body), "alice")
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }

        let settings = service.get_settings().await.unwrap();
        assert_eq!(settings.family_tree_backup.interval_hours, 48.0);
        assert_eq!(settings.cms_backup.max_backups_to_keep, 20);
        assert!(settings.updated_by.is_none());
    }

    #[tokio::test]
    async fn test_record_run_sets_next_and_due() {
        let service = service();
        let outcome = service
            .record_run(BackupJobType::FamilyTree, t0())
            .await
            .unwrap();
        assert!(outcome.was_recorded());

        let settings = outcome.settings();
        assert_eq!(settings.family_tree_backup.last_auto_backup, Some(t0()));
        assert_eq!(
            settings.family_tree_backup.next_scheduled_backup,
            Some(t0() + Duration::hours(48))
        );
        assert!(settings.cms_backup.last_auto_backup.is_none());

        assert!(!is_due(settings, BackupJobType::FamilyTree, t0() + Duration::hours(24)));
        assert!(is_due(settings, BackupJobType::FamilyTree, t0() + Duration::hours(48)));
    }

    #[tokio::test]
    async fn test_duplicate_run_report_is_stale() {
        let service = service();
        service.record_run(BackupJobType::Cms, t0()).await.unwrap();

        let again = service.record_run(BackupJobType::Cms, t0()).await.unwrap();
        assert!(matches!(again, RecordRunOutcome::Stale(_)));

        let older = service
            .record_run(BackupJobType::Cms, t0() - Duration::hours(1))
            .await
            .unwrap();
        assert!(!older.was_recorded());
        assert_eq!(older.settings().cms_backup.last_auto_backup, Some(t0()));
    }

    #[tokio::test]
    async fn test_interval_change_moves_next_run() {
        let service = service();
        service
            .record_run(BackupJobType::FamilyTree, t0())
            .await
            .unwrap();
        let settings = service
            .update_settings(&update(r#"{"familyTreeBackup":{"intervalHours":72}}"#), "alice")
            .await
            .unwrap();
        assert_eq!(
            settings.family_tree_backup.next_scheduled_backup,
            Some(t0() + Duration::hours(72))
        );
    }
}
