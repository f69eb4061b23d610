//! Pluggable audit sink trait.

use async_trait::async_trait;

use heritage_core::AppResult;
use heritage_entity::audit::{AuditRecord, CreateAuditRecord};

/// Destination for audit records.
///
/// An implementation assigns the write-time fields (sequence, timestamp,
/// hashes) and returns the record exactly as persisted. A returned error is
/// a log-write failure; callers report it and move on, they never retry.
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug + 'static {
    /// Durably append one record.
    async fn append(&self, record: CreateAuditRecord) -> AppResult<AuditRecord>;
}
