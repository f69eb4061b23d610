//! Sequential reader and chain verifier for the audit log.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;

use heritage_core::{AppError, AppResult, ErrorKind};
use heritage_entity::audit::AuditRecord;

use crate::chain::{self, GENESIS_HASH};

/// First point at which the hash chain does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChainBreak {
    /// A complete line is not a valid record.
    Malformed { line: u64, error: String },
    /// A record is missing or out of order.
    SequenceGap { line: u64, expected: u64, found: u64 },
    /// `prevHash` does not match the previous record's hash.
    PrevHashMismatch { seq: u64 },
    /// The record content does not match its own hash.
    HashMismatch { seq: u64 },
}

/// Outcome of verifying a whole log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    /// Records verified before the first break (or all of them).
    pub records: u64,
    /// Hash of the last verified record.
    pub last_hash: String,
    /// Whether the file ends with an incomplete line.
    pub torn_tail: bool,
    /// The first break found, if any.
    pub first_break: Option<ChainBreak>,
}

impl VerifyReport {
    /// Whether every complete record chains correctly.
    pub fn is_intact(&self) -> bool {
        self.first_break.is_none()
    }
}

/// Reads an audit log file strictly sequentially.
///
/// A trailing line without a terminating newline is the remains of a crash
/// mid-write and is ignored.
#[derive(Debug, Clone)]
pub struct AuditLogReader {
    path: PathBuf,
}

impl AuditLogReader {
    /// Create a reader for the log at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every complete record.
    pub fn read_all(&self) -> AppResult<Vec<AuditRecord>> {
        let mut records = Vec::new();
        self.for_each_line(|line_no, line| {
            records.push(parse(line_no, line)?);
            Ok(true)
        })?;
        Ok(records)
    }

    /// Read the last `limit` complete records, oldest first.
    pub fn tail(&self, limit: usize) -> AppResult<Vec<AuditRecord>> {
        let mut window = VecDeque::with_capacity(limit.min(1024));
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.for_each_line(|line_no, line| {
            if window.len() == limit {
                window.pop_front();
            }
            window.push_back(parse(line_no, line)?);
            Ok(true)
        })?;
        Ok(window.into())
    }

    /// Replay the log and check sequence numbers and hashes.
    pub fn verify(&self) -> AppResult<VerifyReport> {
        let mut expected_seq = 1u64;
        let mut prev_hash = GENESIS_HASH.to_string();
        let mut first_break = None;

        let torn_tail = self.for_each_line(|line_no, line| {
            let record: AuditRecord = match serde_json::from_slice(line) {
                Ok(record) => record,
                Err(e) => {
                    first_break = Some(ChainBreak::Malformed {
                        line: line_no,
                        error: e.to_string(),
                    });
                    return Ok(false);
                }
            };

            if record.seq != expected_seq {
                first_break = Some(ChainBreak::SequenceGap {
                    line: line_no,
                    expected: expected_seq,
                    found: record.seq,
                });
                return Ok(false);
            }
            if record.prev_hash != prev_hash {
                first_break = Some(ChainBreak::PrevHashMismatch { seq: record.seq });
                return Ok(false);
            }
            if chain::compute_hash(&record)? != record.hash {
                first_break = Some(ChainBreak::HashMismatch { seq: record.seq });
                return Ok(false);
            }

            expected_seq += 1;
            prev_hash = record.hash;
            Ok(true)
        })?;

        Ok(VerifyReport {
            records: expected_seq - 1,
            last_hash: prev_hash,
            torn_tail,
            first_break,
        })
    }

    /// Feed every complete line to `visit` until it returns `false`.
    ///
    /// Returns whether the file ends with an incomplete line.
    fn for_each_line<F>(&self, mut visit: F) -> AppResult<bool>
    where
        F: FnMut(u64, &[u8]) -> AppResult<bool>,
    {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut line_no = 0u64;

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                return Ok(false);
            }
            if buf.last() != Some(&b'\n') {
                return Ok(true);
            }

            line_no += 1;
            let line = &buf[..buf.len() - 1];
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if !visit(line_no, line)? {
                return Ok(false);
            }
        }
    }
}

fn parse(line_no: u64, line: &[u8]) -> AppResult<AuditRecord> {
    serde_json::from_slice(line).map_err(|e| {
        AppError::with_source(
            ErrorKind::Serialization,
            format!("Audit log line {line_no} is not a valid record"),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use heritage_entity::audit::{AuditAction, CreateAuditRecord, Principal};

    use super::*;
    use crate::sink::AuditSink;
    use crate::writer::JsonlAuditLog;

    async fn write_log(path: &Path, count: usize) {
        let log = JsonlAuditLog::open(path, Duration::from_secs(5)).await.unwrap();
        for i in 0..count {
            let mut data = CreateAuditRecord::new(
                AuditAction::Update,
                "persons",
                Principal::from_username(Some("editor")),
            );
            data.resource_id = Some(i.to_string());
            log.append(data).await.unwrap();
        }
    }

    fn rewrite_lines(path: &Path, edit: impl FnOnce(&mut Vec<String>)) {
        let contents = std::fs::read_to_string(path).unwrap();
        let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
        edit(&mut lines);
        std::fs::write(path, lines.join("\n") + "\n").unwrap();
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let reader = AuditLogReader::new("/nonexistent/audit.log");
        assert!(reader.read_all().unwrap().is_empty());
        let report = reader.verify().unwrap();
        assert!(report.is_intact());
        assert_eq!(report.records, 0);
    }

    #[tokio::test]
    async fn test_trailing_incomplete_line_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        write_log(&path, 3).await;

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"id":"01","seq":4,"#).unwrap();
        drop(file);

        let reader = AuditLogReader::new(&path);
        assert_eq!(reader.read_all().unwrap().len(), 3);

        let report = reader.verify().unwrap();
        assert!(report.is_intact());
        assert!(report.torn_tail);
        assert_eq!(report.records, 3);
    }

    #[tokio::test]
    async fn test_tail_returns_latest_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        write_log(&path, 10).await;

        let tail = AuditLogReader::new(&path).tail(3).unwrap();
        let seqs: Vec<u64> = tail.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![8, 9, 10]);
        assert!(AuditLogReader::new(&path).tail(0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_detects_edited_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        write_log(&path, 4).await;

        rewrite_lines(&path, |lines| {
            lines[1] = lines[1].replace("\"user\":\"editor\"", "\"user\":\"someone-else\"");
        });

        let report = AuditLogReader::new(&path).verify().unwrap();
        assert_eq!(report.first_break, Some(ChainBreak::HashMismatch { seq: 2 }));
        assert_eq!(report.records, 1);
    }

    #[tokio::test]
    async fn test_verify_detects_deleted_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        write_log(&path, 4).await;

        rewrite_lines(&path, |lines| {
            lines.remove(2);
        });

        let report = AuditLogReader::new(&path).verify().unwrap();
        assert_eq!(
            report.first_break,
            Some(ChainBreak::SequenceGap {
                line: 3,
                expected: 3,
                found: 4
            })
        );
    }

    #[tokio::test]
    async fn test_verify_detects_garbage_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        write_log(&path, 2).await;

        rewrite_lines(&path, |lines| lines.insert(1, "not json".to_string()));

        let report = AuditLogReader::new(&path).verify().unwrap();
        assert!(matches!(
            report.first_break,
            Some(ChainBreak::Malformed { line: 2, .. })
        ));
    }
}
