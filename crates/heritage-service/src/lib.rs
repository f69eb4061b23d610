//! # heritage-service
//!
//! Service layer for Heritage Admin. Services receive their collaborators
//! at construction time as `Arc` references.
//!
//! - [`AuditRecorder`] builds audit records from a [`RequestContext`].
//! - [`ResponseInterceptor`] records one admin action per response.
//! - [`BackupSettingsService`] owns the singleton backup settings document.
//! - [`backup::schedule`] decides when jobs are due and what to prune.

pub mod audit;
pub mod backup;
pub mod context;

pub use audit::{AuditRecorder, ResponseInterceptor};
pub use backup::BackupSettingsService;
pub use context::RequestContext;
