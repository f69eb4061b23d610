//! Backup settings repository: the contract and its PostgreSQL implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::debug;

use heritage_core::error::{AppError, ErrorKind};
use heritage_core::result::AppResult;
use heritage_entity::backup::{BackupJobType, BackupSettings, BackupSettingsUpdate, SETTINGS_ID};

/// Result of reporting a completed backup run.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordRunOutcome {
    /// The run was newer than the stored one and is now recorded.
    Recorded(BackupSettings),
    /// A run at or after this time was already recorded; nothing changed.
    Stale(BackupSettings),
}

impl RecordRunOutcome {
    /// The settings document after the call.
    pub fn settings(&self) -> &BackupSettings {
        match self {
            Self::Recorded(settings) | Self::Stale(settings) => settings,
        }
    }

    /// Whether this call changed the document.
    pub fn was_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Atomic operations on the singleton backup settings document.
///
/// Every method addresses the document by [`SETTINGS_ID`] and is one
/// atomic step in the backend, so concurrent callers, including other
/// server instances, converge on one document.
#[async_trait]
pub trait BackupSettingsRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Return the document, creating it with defaults if it does not exist.
    async fn get_or_create(&self, now: DateTime<Utc>) -> AppResult<BackupSettings>;

    /// Deep-merge a validated update and stamp `updatedAt` / `updatedBy`.
    async fn merge_update(
        &self,
        update: &BackupSettingsUpdate,
        updated_by: &str,
        now: DateTime<Utc>,
    ) -> AppResult<BackupSettings>;

    /// Set `lastAutoBackup` for `job` if `completed_at` is newer than the
    /// stored value, recomputing `nextScheduledBackup`.
    async fn record_run(
        &self,
        job: BackupJobType,
        completed_at: DateTime<Utc>,
    ) -> AppResult<RecordRunOutcome>;
}

/// Row shape of the `backup_settings` table.
#[derive(Debug, FromRow)]
struct BackupSettingsRow {
    settings_id: String,
    family_tree_backup: Json<Value>,
    cms_backup: Json<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl BackupSettingsRow {
    fn into_settings(self) -> AppResult<BackupSettings> {
        let document = json!({
            "settingsId": self.settings_id,
            "familyTreeBackup": self.family_tree_backup.0,
            "cmsBackup": self.cms_backup.0,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
            "updatedBy": self.updated_by,
        });
        serde_json::from_value(document).map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Stored backup settings document is malformed",
                e,
            )
        })
    }
}

/// PostgreSQL-backed settings repository.
///
/// Mutations lock the row with `SELECT … FOR UPDATE`, apply the change
/// with the same [`BackupSettings`] methods the memory backend uses, and
/// write the document back in the same transaction.
#[derive(Debug, Clone)]
pub struct PgBackupSettingsRepository {
    pool: PgPool,
}

impl PgBackupSettingsRepository {
    /// Create a new repository over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_defaults<'e, E>(executor: E, now: DateTime<Utc>) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        let defaults = BackupSettings::defaults(now);
        sqlx::query(
            "INSERT INTO backup_settings \
                 (settings_id, family_tree_backup, cms_backup, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (settings_id) DO NOTHING",
        )
        .bind(SETTINGS_ID)
        .bind(Json(serde_json::to_value(&defaults.family_tree_backup)?))
        .bind(Json(serde_json::to_value(&defaults.cms_backup)?))
        .bind(now)
        .execute(executor)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create backup settings", e)
        })?;
        Ok(())
    }

    async fn fetch<'e, E>(executor: E, for_update: bool) -> AppResult<BackupSettings>
    where
        E: PgExecutor<'e>,
    {
        let sql = if for_update {
            "SELECT * FROM backup_settings WHERE settings_id = $1 FOR UPDATE"
        } else {
            "SELECT * FROM backup_settings WHERE settings_id = $1"
        };

        let row = sqlx::query_as::<_, BackupSettingsRow>(sql)
            .bind(SETTINGS_ID)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load backup settings", e)
            })?
            .ok_or_else(|| AppError::not_found("Backup settings document does not exist"))?;

        row.into_settings()
    }

    async fn store<'e, E>(executor: E, settings: &BackupSettings) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "UPDATE backup_settings SET \
                 family_tree_backup = $2, \
                 cms_backup = $3, \
                 updated_at = $4, \
                 updated_by = $5 \
             WHERE settings_id = $1",
        )
        .bind(SETTINGS_ID)
        .bind(Json(serde_json::to_value(&settings.family_tree_backup)?))
        .bind(Json(serde_json::to_value(&settings.cms_backup)?))
        .bind(settings.updated_at)
        .bind(settings.updated_by.as_deref())
        .execute(executor)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to store backup settings", e)
        })?;
        Ok(())
    }

    /// Run `change` on the locked document; it returns whether to write back.
    async fn modify<T>(
        &self,
        now: DateTime<Utc>,
        change: impl FnOnce(&mut BackupSettings) -> T,
        should_store: impl FnOnce(&T) -> bool,
    ) -> AppResult<(BackupSettings, T)> {
        let mut tx = self.pool.begin().await.map_err(begin_error)?;

        Self::insert_defaults(&mut *tx, now).await?;
        let mut settings = Self::fetch(&mut *tx, true).await?;
        let result = change(&mut settings);
        if should_store(&result) {
            Self::store(&mut *tx, &settings).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit backup settings", e)
        })?;
        Ok((settings, result))
    }
}

fn begin_error(e: sqlx::Error) -> AppError {
    AppError::with_source(ErrorKind::Database, "Failed to start transaction", e)
}

#[async_trait]
impl BackupSettingsRepository for PgBackupSettingsRepository {
    async fn get_or_create(&self, now: DateTime<Utc>) -> AppResult<BackupSettings> {
        Self::insert_defaults(&self.pool, now).await?;
        Self::fetch(&self.pool, false).await
    }

    async fn merge_update(
        &self,
        update: &BackupSettingsUpdate,
        updated_by: &str,
        now: DateTime<Utc>,
    ) -> AppResult<BackupSettings> {
        let (settings, ()) = self
            .modify(now, |settings| settings.merge(update, updated_by, now), |_| true)
            .await?;

        debug!(updated_by, "Backup settings updated");
        Ok(settings)
    }

    async fn record_run(
        &self,
        job: BackupJobType,
        completed_at: DateTime<Utc>,
    ) -> AppResult<RecordRunOutcome> {
        let (settings, applied) = self
            .modify(
                completed_at,
                |settings| settings.apply_run(job, completed_at),
                |applied| *applied,
            )
            .await?;

        Ok(if applied {
            RecordRunOutcome::Recorded(settings)
        } else {
            RecordRunOutcome::Stale(settings)
        })
    }
}
