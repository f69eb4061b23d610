//! # heritage-audit
//!
//! The append-only audit log. Records are written as one JSON object per
//! line, each line hash-chained to the previous one, and flushed to disk
//! before an append returns.
//!
//! - [`JsonlAuditLog`] is the writer and implements [`AuditSink`].
//! - [`AuditLogReader`] reads the file sequentially and verifies the chain.
//! - [`MemoryAuditSink`] keeps records in memory for tests.

pub mod chain;
pub mod memory;
pub mod reader;
pub mod sink;
pub mod writer;

pub use memory::MemoryAuditSink;
pub use reader::{AuditLogReader, ChainBreak, VerifyReport};
pub use sink::AuditSink;
pub use writer::JsonlAuditLog;
