//! JSON-lines audit log writer.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use heritage_core::{AppError, AppResult, ErrorKind};
use heritage_entity::audit::{AuditRecord, CreateAuditRecord};

use crate::chain::{self, GENESIS_HASH};
use crate::sink::AuditSink;

/// Bytes read per step when scanning the end of an existing log.
const TAIL_CHUNK: u64 = 8 * 1024;

/// Append-only audit log stored as newline-terminated JSON records.
///
/// Appends from any number of tasks are serialized behind one lock. Each
/// record is written with a single `write_all` and `sync_data`'d before the
/// append reports success. The caller waits at most `write_timeout`; a write
/// that outlives the timeout still completes whole in the background.
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    inner: Arc<Inner>,
    write_timeout: Duration,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    state: Mutex<WriterState>,
}

/// Where complete records land. Only tests substitute anything but [`File`].
trait LogFile: Write + Send + std::fmt::Debug {
    fn sync(&mut self) -> std::io::Result<()>;
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl LogFile for File {
    fn sync(&mut self) -> std::io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

#[derive(Debug)]
struct WriterState {
    file: Box<dyn LogFile>,
    /// Length of the file up to the end of the last complete record.
    len: u64,
    seq: u64,
    last_hash: String,
    last_timestamp: Option<DateTime<Utc>>,
}

impl JsonlAuditLog {
    /// Open (or create) the log at `path` and recover the chain position.
    ///
    /// A torn final line left by a crash mid-write is truncated away.
    pub async fn open(path: impl Into<PathBuf>, write_timeout: Duration) -> AppResult<Self> {
        let path = path.into();
        let recover_path = path.clone();
        let state = tokio::task::spawn_blocking(move || recover(&recover_path))
            .await
            .map_err(|e| AppError::internal(format!("Audit log open task failed: {e}")))??;

        info!(
            path = %path.display(),
            seq = state.seq,
            "Audit log opened"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                state: Mutex::new(state),
            }),
            write_timeout,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Sequence number of the last record written.
    pub fn last_seq(&self) -> u64 {
        self.inner
            .state
            .lock()
            .map(|state| state.seq)
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for JsonlAuditLog {
    async fn append(&self, record: CreateAuditRecord) -> AppResult<AuditRecord> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || inner.append_blocking(record));

        match tokio::time::timeout(self.write_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(AppError::internal(format!("Audit append task failed: {e}"))),
            Err(_) => Err(AppError::timeout(format!(
                "Audit append did not complete within {}ms",
                self.write_timeout.as_millis()
            ))),
        }
    }
}

impl Inner {
    fn append_blocking(&self, data: CreateAuditRecord) -> AppResult<AuditRecord> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::internal("Audit log writer lock poisoned"))?;

        let now = Utc::now();
        let timestamp = match state.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };

        let mut record = AuditRecord::new(data, state.seq + 1, timestamp, state.last_hash.clone());
        chain::seal(&mut record)?;

        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        if let Err(e) = write_line(state.file.as_mut(), &line) {
            // Cut off whatever part of the line reached the file so the
            // next record starts on a clean line.
            let len = state.len;
            if let Err(truncate_err) = state.file.truncate(len) {
                warn!(error = %truncate_err, "Failed to roll back partial audit write");
            }
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to append audit record: {e}"),
                e,
            ));
        }

        state.len += line.len() as u64;
        state.seq = record.seq;
        state.last_hash = record.hash.clone();
        state.last_timestamp = Some(timestamp);

        debug!(seq = record.seq, action = %record.action, "Audit record appended");
        Ok(record)
    }
}

fn write_line(file: &mut dyn LogFile, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line)?;
    file.sync()
}

/// Open the file, drop a torn tail and read back the last complete record.
fn recover(path: &Path) -> AppResult<WriterState> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    let len = file.metadata()?.len();

    let (valid_len, last_line) = scan_tail(&mut file, len)?;
    if valid_len < len {
        warn!(
            path = %path.display(),
            discarded_bytes = len - valid_len,
            "Truncating incomplete trailing audit record"
        );
        file.set_len(valid_len)?;
        file.sync_data()?;
    }

    let state = match last_line {
        Some(line) => {
            let last: AuditRecord = serde_json::from_slice(&line).map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!(
                        "Last audit record in {} is unreadable; run `heritage audit verify`",
                        path.display()
                    ),
                    e,
                )
            })?;
            WriterState {
                file: Box::new(file),
                len: valid_len,
                seq: last.seq,
                last_hash: last.hash,
                last_timestamp: Some(last.timestamp),
            }
        }
        None => WriterState {
            file: Box::new(file),
            len: valid_len,
            seq: 0,
            last_hash: GENESIS_HASH.to_string(),
            last_timestamp: None,
        },
    };

    Ok(state)
}

/// Find the end of the last complete line and return that line's bytes.
///
/// Returns the length the file should have (everything up to and including
/// the last `\n`) and the last complete line, if any.
fn scan_tail(file: &mut File, len: u64) -> std::io::Result<(u64, Option<Vec<u8>>)> {
    let mut pos = len;
    let mut tail: Vec<u8> = Vec::new();

    while pos > 0 && tail.iter().filter(|b| **b == b'\n').count() < 2 {
        let start = pos.saturating_sub(TAIL_CHUNK);
        let mut chunk = vec![0u8; (pos - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&tail);
        tail = chunk;
        pos = start;
    }

    let Some(last_newline) = tail.iter().rposition(|b| *b == b'\n') else {
        return Ok((0, None));
    };

    let valid_len = pos + last_newline as u64 + 1;
    let line_start = tail[..last_newline]
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);

    Ok((valid_len, Some(tail[line_start..last_newline].to_vec())))
}
