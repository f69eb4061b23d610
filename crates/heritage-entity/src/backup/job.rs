//! Backup job type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The independent backup jobs the scheduler tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackupJobType {
    /// Family-tree records (persons, relations, media).
    FamilyTree,
    /// News CMS content.
    Cms,
}

impl BackupJobType {
    /// Every job type, in check order.
    pub const ALL: [BackupJobType; 2] = [Self::FamilyTree, Self::Cms];

    /// Return the job type as written in settings and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FamilyTree => "familyTree",
            Self::Cms => "cms",
        }
    }

    /// Directory name used for this job's artifacts.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::FamilyTree => "family-tree",
            Self::Cms => "cms",
        }
    }
}

impl fmt::Display for BackupJobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackupJobType {
    type Err = heritage_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "familytree" => Ok(Self::FamilyTree),
            "cms" => Ok(Self::Cms),
            _ => Err(heritage_core::AppError::validation(format!(
                "Invalid backup job type: '{s}'. Expected one of: familyTree, cms"
            ))),
        }
    }
}
