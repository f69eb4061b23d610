//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use heritage_audit::AuditLogReader;
use heritage_core::config::AppConfig;
use heritage_service::{AuditRecorder, BackupSettingsService};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. Every field is cheap
/// to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Writes audit records
    pub recorder: AuditRecorder,
    /// Backup settings document
    pub backup_settings: BackupSettingsService,
    /// Reads the audit log file for review
    pub audit_reader: AuditLogReader,
}

impl AppState {
    /// Assemble the state from its parts.
    pub fn new(
        config: Arc<AppConfig>,
        recorder: AuditRecorder,
        backup_settings: BackupSettingsService,
        audit_reader: AuditLogReader,
    ) -> Self {
        Self {
            config,
            recorder,
            backup_settings,
            audit_reader,
        }
    }
}
