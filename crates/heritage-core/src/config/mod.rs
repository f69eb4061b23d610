//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field has a default so an empty file is valid.

pub mod app;
pub mod audit;
pub mod backup;
pub mod database;
pub mod logging;

use std::path::Path;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::audit::AuditConfig;
use self::backup::BackupConfig;
use self::database::DatabaseConfig;
use self::logging::LoggingConfig;

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "HERITAGE";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay + env vars).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Audit log settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Backup worker settings.
    #[serde(default)]
    pub backup: BackupConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the `config/` directory.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` and environment
    /// variables prefixed with `HERITAGE__` (e.g. `HERITAGE__SERVER__PORT`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(env_source())
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        Self::finish(config)
    }

    /// Load configuration from one explicit file, still honouring env overrides.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(true))
            .add_source(env_source())
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        Self::finish(config)
    }

    fn finish(config: config::Config) -> Result<Self, AppError> {
        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.backup.validate()?;
        Ok(config)
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::database::DatabaseProvider;
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file).unwrap();

        let config = AppConfig::load_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.provider, DatabaseProvider::Postgres);
        assert_eq!(config.audit.write_timeout_ms, 2000);
        assert_eq!(config.backup.check_schedule, "0 */5 * * * *");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_sections_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[database]
provider = "memory"

[audit]
log_path = "/var/log/heritage/audit.log"

[backup]
cms_command = "scripts/dump-cms.sh"
"#
        )
        .unwrap();

        let config = AppConfig::load_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.provider, DatabaseProvider::Memory);
        assert_eq!(
            config.audit.log_path,
            std::path::PathBuf::from("/var/log/heritage/audit.log")
        );
        assert_eq!(
            config.backup.cms_command.as_deref(),
            Some("scripts/dump-cms.sh")
        );
        assert!(config.backup.family_tree_command.is_none());
    }

    #[test]
    fn test_command_timeout_must_be_below_claim_ttl() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[backup]
claim_ttl_seconds = 600
command_timeout_seconds = 600
"#
        )
        .unwrap();

        let err = AppConfig::load_file(file.path()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
        assert!(err.message.contains("command_timeout_seconds"));

        let defaults = BackupConfig::default();
        assert!(defaults.validate().is_ok());
        assert!(defaults.command_timeout_seconds < defaults.claim_ttl_seconds);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = AppConfig::load_file("/nonexistent/heritage.toml").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }
}
