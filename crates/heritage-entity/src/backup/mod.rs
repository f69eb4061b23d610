//! Backup scheduling entities.

pub mod artifact;
pub mod job;
pub mod policy;
pub mod settings;

pub use artifact::BackupArtifact;
pub use job::BackupJobType;
pub use policy::{BackupPolicy, BackupPolicyPatch};
pub use settings::{BackupSettings, BackupSettingsUpdate, SETTINGS_ID};
