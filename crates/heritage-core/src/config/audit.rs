//! Audit log configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Append-only audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Path of the JSON-lines audit log file.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// Upper bound on how long a caller waits for one append, in milliseconds.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
}

impl AuditConfig {
    /// The append latency bound as a [`Duration`].
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            write_timeout_ms: default_write_timeout(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("data/audit/audit.log")
}

fn default_write_timeout() -> u64 {
    2000
}
