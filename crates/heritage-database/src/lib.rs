//! # heritage-database
//!
//! PostgreSQL connection management and the repository behind the
//! singleton backup settings document, with an in-memory implementation of
//! the same contract for tests and single-process deployments.

pub mod connection;
pub mod provider;
pub mod repositories;

pub use connection::DatabasePool;
pub use provider::connect_settings_repository;
pub use repositories::backup_settings::{
    BackupSettingsRepository, PgBackupSettingsRepository, RecordRunOutcome,
};
pub use repositories::memory::MemoryBackupSettingsRepository;
