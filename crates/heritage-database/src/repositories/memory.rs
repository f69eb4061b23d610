//! In-process settings repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use heritage_core::result::AppResult;
use heritage_entity::backup::{BackupJobType, BackupSettings, BackupSettingsUpdate};

use super::backup_settings::{BackupSettingsRepository, RecordRunOutcome};

/// Settings repository holding the document in process memory.
///
/// Each operation runs under one lock, which gives the same atomicity as
/// the PostgreSQL statements within a single process. Clones share the
/// same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackupSettingsRepository {
    document: Arc<RwLock<Option<BackupSettings>>>,
}

impl MemoryBackupSettingsRepository {
    /// Create an empty repository; the document is created on first access.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository seeded with an existing document.
    pub fn with_settings(settings: BackupSettings) -> Self {
        Self {
            document: Arc::new(RwLock::new(Some(settings))),
        }
    }
}

#[async_trait]
impl BackupSettingsRepository for MemoryBackupSettingsRepository {
    async fn get_or_create(&self, now: DateTime<Utc>) -> AppResult<BackupSettings> {
        if let Some(settings) = self.document.read().await.as_ref() {
            return Ok(settings.clone());
        }

        let mut document = self.document.write().await;
        Ok(document
            .get_or_insert_with(|| BackupSettings::defaults(now))
            .clone())
    }

    async fn merge_update(
        &self,
        update: &BackupSettingsUpdate,
        updated_by: &str,
        now: DateTime<Utc>,
    ) -> AppResult<BackupSettings> {
        let mut document = self.document.write().await;
        let settings = document.get_or_insert_with(|| BackupSettings::defaults(now));
        settings.merge(update, updated_by, now);
        Ok(settings.clone())
    }

    async fn record_run(
        &self,
        job: BackupJobType,
        completed_at: DateTime<Utc>,
    ) -> AppResult<RecordRunOutcome> {
        let mut document = self.document.write().await;
        let settings = document.get_or_insert_with(|| BackupSettings::defaults(completed_at));

        if settings.apply_run(job, completed_at) {
            Ok(RecordRunOutcome::Recorded(settings.clone()))
        } else {
            Ok(RecordRunOutcome::Stale(settings.clone()))
        }
    }
}
