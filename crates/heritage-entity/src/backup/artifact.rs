//! Completed backup artifact.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::BackupJobType;

/// One completed backup produced by the backup executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupArtifact {
    /// Which job produced it.
    pub job: BackupJobType,
    /// Where it is stored.
    pub path: PathBuf,
    /// When it was completed.
    pub created_at: DateTime<Utc>,
    /// Size in bytes.
    pub size_bytes: u64,
}
