//! Heritage Admin server
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use heritage_api::AppState;
use heritage_audit::{AuditLogReader, JsonlAuditLog};
use heritage_core::config::AppConfig;
use heritage_core::error::AppError;
use heritage_service::{AuditRecorder, BackupSettingsService};
use heritage_entity::backup::BackupJobType;
use heritage_worker::{
    BackupCheck, BackupExecutor, CommandBackupExecutor, CronScheduler, LocalRunClaim,
};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `HERITAGE_CONFIG`, or the layered `config/` directory
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("HERITAGE_CONFIG") {
        Ok(path) => AppConfig::load_file(path),
        Err(_) => {
            let env = std::env::var("HERITAGE_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Heritage Admin v{}", env!("CARGO_PKG_VERSION"));

    // Audit log
    let audit_log =
        JsonlAuditLog::open(&config.audit.log_path, config.audit.write_timeout()).await?;
    let recorder = AuditRecorder::new(Arc::new(audit_log));
    let audit_reader = AuditLogReader::new(&config.audit.log_path);

    // Settings store
    let settings_repo = heritage_database::connect_settings_repository(&config.database).await?;
    let backup_settings = BackupSettingsService::new(settings_repo);
    backup_settings.get_settings().await?;

    // Backup scheduler
    let mut scheduler = if config.backup.enabled {
        let executor = CommandBackupExecutor::from_config(&config.backup);
        for job in BackupJobType::ALL {
            if !executor.is_configured(job) {
                tracing::warn!(job = %job, "No backup command configured; job will be skipped");
            }
        }

        let check = Arc::new(BackupCheck::new(
            backup_settings.clone(),
            Arc::new(executor),
            Arc::new(LocalRunClaim::with_ttl_seconds(config.backup.claim_ttl_seconds)),
            recorder.clone(),
        ));

        let scheduler = CronScheduler::new().await?;
        scheduler
            .register_backup_check(check, &config.backup.check_schedule)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Backup scheduler disabled");
        None
    };

    // HTTP server
    let state = AppState::new(
        Arc::new(config.clone()),
        recorder,
        backup_settings,
        audit_reader,
    );
    let app = heritage_api::build_app(state);

    heritage_api::serve(&config.server, app, shutdown_signal()).await?;

    if let Some(scheduler) = scheduler.as_mut() {
        let grace = std::time::Duration::from_secs(config.server.shutdown_grace_seconds);
        match tokio::time::timeout(grace, scheduler.shutdown()).await {
            Ok(result) => result?,
            Err(_) => tracing::warn!("Backup scheduler did not stop within the grace period"),
        }
    }

    tracing::info!("Heritage Admin shut down");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
