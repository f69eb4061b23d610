//! Backup policy: settings persistence and schedule decisions.

pub mod schedule;
pub mod settings;

pub use schedule::{is_due, next_run_after, prune_candidates};
pub use settings::BackupSettingsService;
