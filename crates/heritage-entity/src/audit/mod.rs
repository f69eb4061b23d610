//! Audit log entities.

pub mod action;
pub mod model;
pub mod principal;

pub use action::AuditAction;
pub use model::{AuditRecord, CreateAuditRecord};
pub use principal::Principal;
