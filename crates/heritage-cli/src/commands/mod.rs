//! CLI command definitions and dispatch.

pub mod audit;
pub mod backup;

use clap::{Parser, Subcommand};

use heritage_core::config::AppConfig;
use heritage_core::error::AppError;

use crate::output::OutputFormat;

/// Environment variable selecting the configuration overlay.
const ENV_VAR: &str = "HERITAGE_ENV";

/// Heritage admin: audit log review and backup status
#[derive(Debug, Parser)]
#[command(name = "heritage", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file (default: config/default.toml plus the
    /// $HERITAGE_ENV overlay)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Audit log
    Audit(audit::AuditArgs),
    /// Backup schedule
    Backup(backup::BackupArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(self.config.as_deref())?;
        match &self.command {
            Commands::Audit(args) => audit::execute(args, &config, self.format).await,
            Commands::Backup(args) => backup::execute(args, &config, self.format).await,
        }
    }
}

/// Helper: load configuration from an explicit file or the layered defaults
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, AppError> {
    match config_path {
        Some(path) => AppConfig::load_file(path),
        None => {
            let env = std::env::var(ENV_VAR).unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_audit_tail() {
        let cli = Cli::try_parse_from(["heritage", "--format", "json", "audit", "tail", "-n", "5"])
            .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Audit(audit::AuditArgs {
                command: audit::AuditCommand::Tail { count: 5 }
            })
        ));
    }
}
