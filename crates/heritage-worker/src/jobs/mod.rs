//! Scheduled jobs.

pub mod backup;

pub use backup::{BACKUP_PRUNE, BackupCheck, JobOutcome};
