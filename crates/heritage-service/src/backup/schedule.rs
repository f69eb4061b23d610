//! Backup due-time and retention decisions.
//!
//! Everything here is a pure function of the settings document and the
//! supplied clock, so it is safe to call from any number of tasks.

use chrono::{DateTime, Utc};

use heritage_entity::backup::{BackupArtifact, BackupJobType, BackupSettings};

/// Whether `job` should run at `now`.
///
/// Disabled jobs are never due; a job that has never run is due at once;
/// otherwise the job is due from `lastAutoBackup + intervalHours` onward.
pub fn is_due(settings: &BackupSettings, job: BackupJobType, now: DateTime<Utc>) -> bool {
    let policy = settings.policy(job);
    if !policy.enabled {
        return false;
    }
    match policy.last_auto_backup {
        None => true,
        // An unrepresentable due time lies beyond any real clock.
        Some(_) => policy.due_at().is_some_and(|due| now >= due),
    }
}

/// Advisory next run time of `job`: `now` if it has never run.
///
/// The value does not depend on whether the job is enabled.
pub fn next_run_after(
    settings: &BackupSettings,
    job: BackupJobType,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let policy = settings.policy(job);
    match policy.last_auto_backup {
        None => now,
        Some(last) => policy.due_at().unwrap_or(last),
    }
}

/// Artifacts to delete so that at most `max_keep` remain, oldest first.
///
/// Returns exactly `artifacts.len() - max_keep` entries when over the cap,
/// otherwise none. Ties on creation time are broken by path.
pub fn prune_candidates(artifacts: &[BackupArtifact], max_keep: u32) -> Vec<BackupArtifact> {
    let keep = usize::try_from(max_keep).unwrap_or(usize::MAX);
    if artifacts.len() <= keep {
        return Vec::new();
    }

    let mut sorted = artifacts.to_vec();
    sorted.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.path.cmp(&b.path))
    });
    sorted.truncate(artifacts.len() - keep);
    sorted
}
