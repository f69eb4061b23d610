//! Per-job backup scheduling and retention policy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Default minimum spacing between two runs, in hours.
pub const DEFAULT_INTERVAL_HOURS: f64 = 48.0;

/// Default number of completed backups kept per job.
pub const DEFAULT_MAX_BACKUPS_TO_KEEP: u32 = 20;

/// Scheduling and retention policy for one backup job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPolicy {
    /// Whether the job is scheduled at all.
    pub enabled: bool,
    /// Minimum spacing between consecutive runs, in hours.
    pub interval_hours: f64,
    /// Retention cap on completed backups.
    pub max_backups_to_keep: u32,
    /// Completion time of the last successful run.
    #[serde(default)]
    pub last_auto_backup: Option<DateTime<Utc>>,
    /// Advisory next due time, always `last_auto_backup + interval_hours`.
    #[serde(default)]
    pub next_scheduled_backup: Option<DateTime<Utc>>,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: DEFAULT_INTERVAL_HOURS,
            max_backups_to_keep: DEFAULT_MAX_BACKUPS_TO_KEEP,
            last_auto_backup: None,
            next_scheduled_backup: None,
        }
    }
}

impl BackupPolicy {
    /// Policy used when a stored settings document lacks a job type.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// The configured interval as a duration.
    pub fn interval(&self) -> Duration {
        hours_to_duration(self.interval_hours)
    }

    /// When the job next becomes due: `last_auto_backup + interval_hours`.
    ///
    /// `None` when the job has never run, or when the sum is not
    /// representable.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.last_auto_backup
            .and_then(|last| last.checked_add_signed(self.interval()))
    }

    /// Recompute `next_scheduled_backup` from the stored fields.
    pub fn refresh_next(&mut self) {
        self.next_scheduled_backup = self.due_at();
    }

    /// Apply a validated patch, leaving unset fields untouched.
    pub fn apply(&mut self, patch: &BackupPolicyPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(hours) = patch.interval_hours {
            self.interval_hours = hours;
        }
        if let Some(keep) = patch.max_backups_to_keep {
            self.max_backups_to_keep = keep as u32;
        }
        self.refresh_next();
    }

    /// Record a completed run.
    ///
    /// Returns `false` without changing anything when `completed_at` is not
    /// later than the stored last run (a duplicate or stale report).
    pub fn apply_run(&mut self, completed_at: DateTime<Utc>) -> bool {
        if matches!(self.last_auto_backup, Some(last) if completed_at <= last) {
            return false;
        }
        self.last_auto_backup = Some(completed_at);
        self.refresh_next();
        true
    }
}

/// Partial update of one job's policy.
///
/// Run bookkeeping is not patchable; only a recorded run moves it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BackupPolicyPatch {
    /// New enabled flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// New interval in hours; must be positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(
        range(
            exclusive_min = 0.0,
            max = 87_600.0,
            message = "must be a positive number of hours, at most 87600"
        ),
        custom(function = "finite_hours")
    )]
    pub interval_hours: Option<f64>,
    /// New retention cap; must not be negative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0i64, max = 4_294_967_295i64, message = "must be between 0 and 4294967295"))]
    pub max_backups_to_keep: Option<i64>,
}

impl BackupPolicyPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.interval_hours.is_none() && self.max_backups_to_keep.is_none()
    }
}

fn finite_hours(hours: f64) -> Result<(), ValidationError> {
    if hours.is_finite() {
        return Ok(());
    }
    let mut error = ValidationError::new("finite");
    error.message = Some("must be a finite number".into());
    error.add_param("value".into(), &hours.to_string());
    Err(error)
}

/// Convert fractional hours to a duration with millisecond precision.
pub fn hours_to_duration(hours: f64) -> Duration {
    let millis = (hours * 3_600_000.0).round();
    if millis.is_nan() || millis <= 0.0 {
        return Duration::zero();
    }
    Duration::try_milliseconds(millis.min(i64::MAX as f64) as i64).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let policy = BackupPolicy::default();
        assert!(policy.enabled);
        assert_eq!(policy.interval_hours, 48.0);
        assert_eq!(policy.max_backups_to_keep, 20);
        assert!(policy.last_auto_backup.is_none());
        assert!(policy.due_at().is_none());
    }

    #[test]
    fn test_due_at_adds_interval() {
        let mut policy = BackupPolicy::default();
        policy.last_auto_backup = Some(at(1));
        assert_eq!(policy.due_at(), Some(at(3)));
    }

    #[test]
    fn test_fractional_interval() {
        assert_eq!(hours_to_duration(1.5), Duration::minutes(90));
    }

    #[test]
    fn test_apply_run_is_monotonic() {
        let mut policy = BackupPolicy::default();
        assert!(policy.apply_run(at(2)));
        assert_eq!(policy.next_scheduled_backup, Some(at(4)));

        assert!(!policy.apply_run(at(2)));
        assert!(!policy.apply_run(at(1)));
        assert_eq!(policy.last_auto_backup, Some(at(2)));
    }

    #[test]
    fn test_apply_patch_recomputes_next() {
        let mut policy = BackupPolicy::default();
        policy.apply_run(at(1));
        policy.apply(&BackupPolicyPatch {
            interval_hours: Some(72.0),
            ..Default::default()
        });
        assert_eq!(policy.next_scheduled_backup, Some(at(4)));
        assert_eq!(policy.max_backups_to_keep, 20);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let negative_interval = BackupPolicyPatch {
            interval_hours: Some(-1.0),
            ..Default::default()
        };
        assert!(negative_interval.validate().is_err());

        let zero_interval = BackupPolicyPatch {
            interval_hours: Some(0.0),
            ..Default::default()
        };
        assert!(zero_interval.validate().is_err());

        let nan_interval = BackupPolicyPatch {
            interval_hours: Some(f64::NAN),
            ..Default::default()
        };
        assert!(nan_interval.validate().is_err());

        let negative_keep = BackupPolicyPatch {
            max_backups_to_keep: Some(-3),
            ..Default::default()
        };
        assert!(negative_keep.validate().is_err());

        let zero_keep = BackupPolicyPatch {
            max_backups_to_keep: Some(0),
            ..Default::default()
        };
        assert!(zero_keep.validate().is_ok());

        let too_long = BackupPolicyPatch {
            interval_hours: Some(87_600.5),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let too_many = BackupPolicyPatch {
            max_backups_to_keep: Some(i64::from(u32::MAX) + 1),
            ..Default::default()
        };
        assert!(too_many.validate().is_err());
    }
}
