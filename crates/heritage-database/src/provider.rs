//! Selects the settings repository backend from configuration.

use std::sync::Arc;

use tracing::{info, warn};

use heritage_core::config::database::{DatabaseConfig, DatabaseProvider};
use heritage_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::repositories::backup_settings::{BackupSettingsRepository, PgBackupSettingsRepository};
use crate::repositories::memory::MemoryBackupSettingsRepository;

/// Build the configured settings repository.
///
/// For PostgreSQL this connects the pool and applies migrations before
/// returning.
pub async fn connect_settings_repository(
    config: &DatabaseConfig,
) -> AppResult<Arc<dyn BackupSettingsRepository>> {
    let repo: Arc<dyn BackupSettingsRepository> = match config.provider {
        DatabaseProvider::Postgres => {
            info!("Initializing PostgreSQL settings repository");
            let db = DatabasePool::connect(config).await?;
            db.migrate().await?;
            Arc::new(PgBackupSettingsRepository::new(db.pool().clone()))
        }
        DatabaseProvider::Memory => {
            warn!(
                "Using in-memory settings repository; settings are lost on restart \
                 and not shared between instances"
            );
            Arc::new(MemoryBackupSettingsRepository::new())
        }
    };

    Ok(repo)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn test_memory_provider_needs_no_url() {
        let config = DatabaseConfig {
            provider: DatabaseProvider::Memory,
            ..Default::default()
        };
        let repo = connect_settings_repository(&config).await.unwrap();
        let settings = repo.get_or_create(Utc::now()).await.unwrap();
        assert_eq!(settings.settings_id, "default");
    }

    #[tokio::test]
    async fn test_postgres_provider_requires_url() {
        let config = DatabaseConfig::default();
        let err = connect_settings_repository(&config).await.unwrap_err();
        assert_eq!(err.kind, heritage_core::ErrorKind::Configuration);
    }
}
