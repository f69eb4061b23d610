//! Backup worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings for the periodic backup check and the external backup command.
///
/// Scheduling policy (interval, retention) is not configured here; it lives
/// in the persisted settings document and is edited through the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Whether the periodic check runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression for the due check.
    #[serde(default = "default_check_schedule")]
    pub check_schedule: String,
    /// Root directory; artifacts live in `<directory>/<job>/`.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Command producing a family-tree backup.
    #[serde(default)]
    pub family_tree_command: Option<String>,
    /// Command producing a CMS backup.
    #[serde(default)]
    pub cms_command: Option<String>,
    /// Seconds before an unreleased run claim expires.
    #[serde(default = "default_claim_ttl")]
    pub claim_ttl_seconds: u64,
    /// Seconds a backup command may run before it is killed. Must be
    /// shorter than `claim_ttl_seconds`.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,
}

impl BackupConfig {
    /// The backup command time limit as a [`Duration`].
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }

    /// Reject a command timeout that would let a run outlive its claim.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.command_timeout_seconds == 0 {
            return Err(AppError::configuration(
                "backup.command_timeout_seconds must be positive",
            ));
        }
        if self.command_timeout_seconds >= self.claim_ttl_seconds {
            return Err(AppError::configuration(format!(
                "backup.command_timeout_seconds ({}) must be less than backup.claim_ttl_seconds ({})",
                self.command_timeout_seconds, self.claim_ttl_seconds
            )));
        }
        Ok(())
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_schedule: default_check_schedule(),
            directory: default_directory(),
            family_tree_command: None,
            cms_command: None,
            claim_ttl_seconds: default_claim_ttl(),
            command_timeout_seconds: default_command_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_check_schedule() -> String {
    "0 */5 * * * *".to_string()
}

fn default_directory() -> PathBuf {
    PathBuf::from("data/backups")
}

fn default_claim_ttl() -> u64 {
    3600
}

fn default_command_timeout() -> u64 {
    1800
}
