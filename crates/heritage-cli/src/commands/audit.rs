//! Audit log CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use heritage_audit::{AuditLogReader, ChainBreak};
use heritage_core::config::AppConfig;
use heritage_core::error::{AppError, ErrorKind};
use heritage_entity::audit::AuditRecord;

use crate::output::{self, OutputFormat};

/// Arguments for audit commands
#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Audit subcommand
    #[command(subcommand)]
    pub command: AuditCommand,
}

/// Audit subcommands
#[derive(Debug, Subcommand)]
pub enum AuditCommand {
    /// Show the most recent records
    Tail {
        /// Number of records
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
    },
    /// Replay the log and check the hash chain
    Verify,
}

/// Audit display row
#[derive(Debug, Serialize, Tabled)]
struct AuditRow {
    /// Sequence number
    seq: u64,
    /// Time
    time: String,
    /// Principal
    user: String,
    /// Action
    action: String,
    /// Resource class
    resource: String,
    /// Resource ID
    id: String,
    /// HTTP status
    status: String,
    /// Client IP
    ip: String,
}

impl From<&AuditRecord> for AuditRow {
    fn from(record: &AuditRecord) -> Self {
        Self {
            seq: record.seq,
            time: record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            user: record.user.clone(),
            action: record.action.to_string(),
            resource: record.resource.clone(),
            id: output::cell(record.resource_id.as_deref()),
            status: output::cell(record.status_code),
            ip: output::cell(record.ip.as_deref()),
        }
    }
}

/// Execute audit commands
pub async fn execute(
    args: &AuditArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let reader = AuditLogReader::new(&config.audit.log_path);

    match &args.command {
        AuditCommand::Tail { count } => {
            let count = *count;
            let records = run_blocking(move || reader.tail(count)).await?;
            match format {
                OutputFormat::Json => output::print_json(&records),
                OutputFormat::Table => {
                    let rows: Vec<AuditRow> = records.iter().map(AuditRow::from).collect();
                    output::print_list(&rows, format);
                }
            }
            Ok(())
        }
        AuditCommand::Verify => {
            let path = reader.path().display().to_string();
            let report = run_blocking(move || reader.verify()).await?;

            match format {
                OutputFormat::Json => output::print_json(&report),
                OutputFormat::Table => {
                    output::print_kv("Log", &path);
                    output::print_kv("Verified records", &report.records.to_string());
                    output::print_kv("Last hash", &report.last_hash);
                    if report.torn_tail {
                        output::print_warning("Log ends with an incomplete line (ignored)");
                    }
                }
            }

            match &report.first_break {
                None => {
                    if format == OutputFormat::Table {
                        output::print_success("Hash chain intact");
                    }
                    Ok(())
                }
                Some(first_break) => Err(AppError::new(
                    ErrorKind::Validation,
                    format!("Audit log chain broken: {}", describe(first_break)),
                )),
            }
        }
    }
}

fn describe(first_break: &ChainBreak) -> String {
    match first_break {
        ChainBreak::Malformed { line, error } => format!("line {line} is not a record ({error})"),
        ChainBreak::SequenceGap {
            line,
            expected,
            found,
        } => format!("line {line} has seq {found}, expected {expected}"),
        ChainBreak::PrevHashMismatch { seq } => {
            format!("record {seq} does not link to the previous record")
        }
        ChainBreak::HashMismatch { seq } => format!("record {seq} was modified"),
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("Reader task failed: {e}")))?
}
