//! Scheduled backup work for Heritage.
//!
//! This crate provides:
//! - A cron scheduler that triggers the periodic backup check
//! - The backup check itself: claim, re-check, run, record, prune
//! - A backup executor running an external command per job type
//! - A process-local run claim guarding against double runs

pub mod claim;
pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use claim::{ClaimToken, LocalRunClaim, RunClaim};
pub use executor::{BackupExecutor, CommandBackupExecutor};
pub use jobs::{BackupCheck, JobOutcome};
pub use scheduler::CronScheduler;
