//! In-memory audit sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use heritage_core::{AppError, AppResult};
use heritage_entity::audit::{AuditRecord, CreateAuditRecord};

use crate::chain::{self, GENESIS_HASH};
use crate::sink::AuditSink;

/// Audit sink that keeps the chained records in a vector.
///
/// Clones share the same records. Used by tests and by tooling that needs a
/// sink without a file.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following append fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of every record appended so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, data: CreateAuditRecord) -> AppResult<AuditRecord> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::storage("audit sink is failing"));
        }

        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let (seq, prev_hash, last_timestamp) = match records.last() {
            Some(last) => (last.seq + 1, last.hash.clone(), Some(last.timestamp)),
            None => (1, GENESIS_HASH.to_string(), None),
        };
        let now = Utc::now();
        let timestamp = last_timestamp.map_or(now, |last| last.max(now));

        let mut record = AuditRecord::new(data, seq, timestamp, prev_hash);
        chain::seal(&mut record)?;
        records.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use heritage_entity::audit::{AuditAction, Principal};

    use super::*;

    #[tokio::test]
    async fn test_records_are_chained() {
        let sink = MemoryAuditSink::new();
        for _ in 0..3 {
            sink.append(CreateAuditRecord::new(
                AuditAction::Create,
                "news",
                Principal::Anonymous,
            ))
            .await
            .unwrap();
        }

        let records = sink.records();
        assert_eq!(records[0].prev_hash, GENESIS_HASH);
        assert_eq!(records[1].prev_hash, records[0].hash);
        assert_eq!(records[2].seq, 3);
    }

    #[tokio::test]
    async fn test_failing_sink_appends_nothing() {
        let sink = MemoryAuditSink::new();
        sink.set_failing(true);
        let result = sink
            .append(CreateAuditRecord::new(
                AuditAction::Delete,
                "persons",
                Principal::Anonymous,
            ))
            .await;
        assert!(result.is_err());
        assert!(sink.is_empty());
    }
}
