//! Repository implementations.

pub mod backup_settings;
pub mod memory;
