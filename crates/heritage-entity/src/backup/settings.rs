//! The singleton backup settings document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::job::BackupJobType;
use super::policy::{BackupPolicy, BackupPolicyPatch};

/// Fixed identifier of the one settings document per deployment.
pub const SETTINGS_ID: &str = "default";

/// Backup policy for every job type, stored as a single document.
///
/// A stored document that lacks a job type deserializes that job as
/// disabled, so the scheduler never runs a job nobody configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSettings {
    /// Always [`SETTINGS_ID`].
    pub settings_id: String,
    /// Family-tree backup policy.
    #[serde(default = "BackupPolicy::disabled")]
    pub family_tree_backup: BackupPolicy,
    /// CMS backup policy.
    #[serde(default = "BackupPolicy::disabled")]
    pub cms_backup: BackupPolicy,
    /// When the document was first created.
    pub created_at: DateTime<Utc>,
    /// When the document was last changed.
    pub updated_at: DateTime<Utc>,
    /// Who made the last settings change.
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl BackupSettings {
    /// The document created on first access.
    pub fn defaults(now: DateTime<Utc>) -> Self {
        Self {
            settings_id: SETTINGS_ID.to_string(),
            family_tree_backup: BackupPolicy::default(),
            cms_backup: BackupPolicy::default(),
            created_at: now,
            updated_at: now,
            updated_by: None,
        }
    }

    /// The policy for one job type.
    pub fn policy(&self, job: BackupJobType) -> &BackupPolicy {
        match job {
            BackupJobType::FamilyTree => &self.family_tree_backup,
            BackupJobType::Cms => &self.cms_backup,
        }
    }

    /// Mutable access to the policy for one job type.
    pub fn policy_mut(&mut self, job: BackupJobType) -> &mut BackupPolicy {
        match job {
            BackupJobType::FamilyTree => &mut self.family_tree_backup,
            BackupJobType::Cms => &mut self.cms_backup,
        }
    }

    /// Deep-merge a validated update into this document.
    pub fn merge(&mut self, update: &BackupSettingsUpdate, updated_by: &str, now: DateTime<Utc>) {
        for job in BackupJobType::ALL {
            if let Some(patch) = update.patch(job) {
                self.policy_mut(job).apply(patch);
            }
        }
        self.updated_by = Some(updated_by.to_string());
        self.updated_at = now;
    }

    /// Record a completed run for `job`. See [`BackupPolicy::apply_run`].
    pub fn apply_run(&mut self, job: BackupJobType, completed_at: DateTime<Utc>) -> bool {
        let applied = self.policy_mut(job).apply_run(completed_at);
        if applied {
            self.updated_at = completed_at.max(self.updated_at);
        }
        applied
    }
}

/// Partial update of the settings document, one optional patch per job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BackupSettingsUpdate {
    /// Changes to the family-tree policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub family_tree_backup: Option<BackupPolicyPatch>,
    /// Changes to the CMS policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub cms_backup: Option<BackupPolicyPatch>,
}

impl BackupSettingsUpdate {
    /// The patch for one job type, if any.
    pub fn patch(&self, job: BackupJobType) -> Option<&BackupPolicyPatch> {
        match job {
            BackupJobType::FamilyTree => self.family_tree_backup.as_ref(),
            BackupJobType::Cms => self.cms_backup.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use heritage_core::AppError;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_merge_leaves_unrelated_fields() {
        let mut settings = BackupSettings::defaults(now());
        settings.cms_backup.max_backups_to_keep = 5;

        let update: BackupSettingsUpdate =
            serde_json::from_str(r#"{"familyTreeBackup":{"intervalHours":72}}"#).unwrap();
        settings.merge(&update, "alice", now());

        assert_eq!(settings.family_tree_backup.interval_hours, 72.0);
        assert_eq!(settings.family_tree_backup.max_backups_to_keep, 20);
        assert!(settings.family_tree_backup.enabled);
        assert_eq!(settings.cms_backup.max_backups_to_keep, 5);
        assert_eq!(settings.cms_backup.interval_hours, 48.0);
        assert_eq!(settings.updated_by.as_deref(), Some("alice"));
    }

    #[test]
    fn test_missing_job_type_deserializes_disabled() {
        let json = r#"{
            "settingsId": "default",
            "familyTreeBackup": {"enabled": true, "intervalHours": 24, "maxBackupsToKeep": 3},
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }"#;
        let settings: BackupSettings = serde_json::from_str(json).unwrap();
        assert!(settings.family_tree_backup.enabled);
        assert!(!settings.cms_backup.enabled);
    }

    #[test]
    fn test_validate_names_offending_field() {
        let update: BackupSettingsUpdate =
            serde_json::from_str(r#"{"cmsBackup":{"maxBackupsToKeep":-1}}"#).unwrap();
        let err = AppError::from(update.validate().unwrap_err());
        assert!(err.message.contains("cmsBackup.maxBackupsToKeep"), "{}", err.message);
        assert!(err.message.contains("got -1"), "{}", err.message);
        assert!(!err.message.contains("familyTreeBackup"));
    }
}
