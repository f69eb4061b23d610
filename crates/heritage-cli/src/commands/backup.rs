//! Backup schedule CLI commands.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use heritage_core::config::AppConfig;
use heritage_core::error::AppError;
use heritage_database::connect_settings_repository;
use heritage_entity::backup::{BackupJobType, BackupSettings};
use heritage_service::BackupSettingsService;
use heritage_service::backup::schedule::{is_due, next_run_after};

use crate::output::{self, OutputFormat};

/// Arguments for backup commands
#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Backup subcommand
    #[command(subcommand)]
    pub command: BackupCommand,
}

/// Backup subcommands
#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Show policy, last run and next run per job
    Status,
}

/// Backup status row
#[derive(Debug, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct StatusRow {
    /// Job type
    job: String,
    /// Enabled flag
    enabled: bool,
    /// Interval in hours
    interval_hours: f64,
    /// Retention cap
    keep: u32,
    /// Last completed run
    last_run: String,
    /// Advisory next run
    next_run: String,
    /// Due now
    due: bool,
}

impl StatusRow {
    fn new(settings: &BackupSettings, job: BackupJobType, now: DateTime<Utc>) -> Self {
        let policy = settings.policy(job);
        Self {
            job: job.to_string(),
            enabled: policy.enabled,
            interval_hours: policy.interval_hours,
            keep: policy.max_backups_to_keep,
            last_run: output::cell(policy.last_auto_backup.map(|t| t.to_rfc3339())),
            next_run: next_run_after(settings, job, now).to_rfc3339(),
            due: is_due(settings, job, now),
        }
    }
}

/// Execute backup commands
pub async fn execute(
    args: &BackupArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        BackupCommand::Status => {
            let repo = connect_settings_repository(&config.database).await?;
            let service = BackupSettingsService::new(Arc::clone(&repo));
            let settings = service.get_settings().await?;
            let now = Utc::now();

            let rows: Vec<StatusRow> = BackupJobType::ALL
                .into_iter()
                .map(|job| StatusRow::new(&settings, job, now))
                .collect();
            output::print_list(&rows, format);

            if format == OutputFormat::Table {
                if let Some(by) = &settings.updated_by {
                    output::print_kv("Last changed by", by);
                }
                output::print_kv("Last changed at", &settings.updated_at.to_rfc3339());
            }
            Ok(())
        }
    }
}
