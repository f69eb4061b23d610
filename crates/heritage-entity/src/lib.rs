//! # heritage-entity
//!
//! Domain entity models for Heritage Admin. Every struct in this crate is
//! either a persisted record (audit log line, backup settings document) or a
//! domain value object. All entities derive `Debug`, `Clone`, `Serialize`
//! and `Deserialize`, and serialize with camelCase field names.

pub mod audit;
pub mod backup;
