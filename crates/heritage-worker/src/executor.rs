//! Backup execution: producing, listing and deleting backup artifacts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;

use heritage_core::config::backup::BackupConfig;
use heritage_core::error::{AppError, ErrorKind};
use heritage_core::result::AppResult;
use heritage_entity::backup::{BackupArtifact, BackupJobType};

/// Environment variable naming the job a backup command runs for.
pub const ENV_BACKUP_JOB: &str = "HERITAGE_BACKUP_JOB";

/// Environment variable naming the file a backup command must write.
pub const ENV_BACKUP_OUTPUT: &str = "HERITAGE_BACKUP_OUTPUT";

/// Creates and manages backup artifacts for one deployment.
#[async_trait]
pub trait BackupExecutor: Send + Sync + std::fmt::Debug + 'static {
    /// Whether this executor can produce backups of `job` at all.
    fn is_configured(&self, _job: BackupJobType) -> bool {
        true
    }

    /// Produce one backup of `job` and return the finished artifact.
    async fn run_backup(&self, job: BackupJobType) -> AppResult<BackupArtifact>;

    /// Every stored artifact of `job`, oldest first.
    async fn list_artifacts(&self, job: BackupJobType) -> AppResult<Vec<BackupArtifact>>;

    /// Remove one artifact. Removing an artifact that is already gone succeeds.
    async fn delete_artifact(&self, artifact: &BackupArtifact) -> AppResult<()>;
}

/// Runs a configured shell command per job type.
///
/// The command receives [`ENV_BACKUP_JOB`] and [`ENV_BACKUP_OUTPUT`] and must
/// write the backup to the output path. Artifacts are the files under
/// `<directory>/<job dir>/`. A command still running after the configured
/// timeout is killed and its partial output removed.
#[derive(Debug, Clone)]
pub struct CommandBackupExecutor {
    directory: PathBuf,
    commands: HashMap<BackupJobType, String>,
    command_timeout: Duration,
}

impl CommandBackupExecutor {
    /// Build from the `[backup]` configuration section.
    pub fn from_config(config: &BackupConfig) -> Self {
        let mut commands = HashMap::new();
        if let Some(command) = &config.family_tree_command {
            commands.insert(BackupJobType::FamilyTree, command.clone());
        }
        if let Some(command) = &config.cms_command {
            commands.insert(BackupJobType::Cms, command.clone());
        }
        Self {
            directory: config.directory.clone(),
            commands,
            command_timeout: config.command_timeout(),
        }
    }

    /// Directory holding the artifacts of `job`.
    pub fn job_dir(&self, job: BackupJobType) -> PathBuf {
        self.directory.join(job.dir_name())
    }

    fn output_path(&self, job: BackupJobType, now: DateTime<Utc>) -> PathBuf {
        self.job_dir(job).join(format!(
            "{}-{}.backup",
            job.dir_name(),
            now.format("%Y%m%dT%H%M%S%.3fZ")
        ))
    }
}

#[async_trait]
impl BackupExecutor for CommandBackupExecutor {
    fn is_configured(&self, job: BackupJobType) -> bool {
        self.commands.contains_key(&job)
    }

    async fn run_backup(&self, job: BackupJobType) -> AppResult<BackupArtifact> {
        let command = self.commands.get(&job).ok_or_else(|| {
            AppError::configuration(format!("No backup command configured for job '{job}'"))
        })?;

        let dir = self.job_dir(job);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create backup directory {}", dir.display()),
                e,
            )
        })?;

        let output = self.output_path(job, Utc::now());
        tracing::info!(job = %job, output = %output.display(), "Starting backup command");

        let mut child = Command::new("sh");
        child
            .arg("-c")
            .arg(command)
            .env(ENV_BACKUP_JOB, job.as_str())
            .env(ENV_BACKUP_OUTPUT, &output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let Ok(result) = tokio::time::timeout(self.command_timeout, child.output()).await else {
            // Dropping the future killed the child.
            match tokio::fs::remove_file(&output).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(job = %job, error = %e, "Failed to remove partial backup"),
            }
            return Err(AppError::timeout(format!(
                "Backup command for job '{job}' did not finish within {}s",
                self.command_timeout.as_secs_f64()
            )));
        };

        let result = result.map_err(|e| {
            AppError::with_source(
                ErrorKind::Internal,
                format!("Failed to start backup command for job '{job}'"),
                e,
            )
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(AppError::internal(format!(
                "Backup command for job '{job}' failed ({}): {}",
                result.status,
                stderr.trim()
            )));
        }

        let artifact = read_artifact(job, &output).await?.ok_or_else(|| {
            AppError::internal(format!(
                "Backup command for job '{job}' did not write {}",
                output.display()
            ))
        })?;

        tracing::info!(
            job = %job,
            path = %artifact.path.display(),
            size_bytes = artifact.size_bytes,
            "Backup completed"
        );
        Ok(artifact)
    }

    async fn list_artifacts(&self, job: BackupJobType) -> AppResult<Vec<BackupArtifact>> {
        let dir = self.job_dir(job);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(artifact) = read_artifact(job, &entry.path()).await? {
                artifacts.push(artifact);
            }
        }
        artifacts.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(artifacts)
    }

    async fn delete_artifact(&self, artifact: &BackupArtifact) -> AppResult<()> {
        match tokio::fs::remove_file(&artifact.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete backup {}", artifact.path.display()),
                e,
            )),
        }
    }
}

/// Stat a regular file as an artifact; `None` if it does not exist or is not a file.
async fn read_artifact(job: BackupJobType, path: &Path) -> AppResult<Option<BackupArtifact>> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Ok(None);
    }

    Ok(Some(BackupArtifact {
        job,
        path: path.to_path_buf(),
        created_at: DateTime::<Utc>::from(metadata.modified()?),
        size_bytes: metadata.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &Path, cms_command: Option<&str>) -> BackupConfig {
        BackupConfig {
            directory: dir.to_path_buf(),
            cms_command: cms_command.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_command_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandBackupExecutor::from_config(&config(dir.path(), None));
        assert!(!executor.is_configured(BackupJobType::Cms));
        let err = executor.run_backup(BackupJobType::Cms).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_is_configured_follows_commands() {
        let executor = CommandBackupExecutor::from_config(&config(Path::new("data"), Some("true")));
        assert!(executor.is_configured(BackupJobType::Cms));
        assert!(!executor.is_configured(BackupJobType::FamilyTree));
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandBackupExecutor::from_config(&config(&dir.path().join("nope"), None));
        assert!(
            executor
                .list_artifacts(BackupJobType::FamilyTree)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandBackupExecutor::from_config(&config(dir.path(), None));
        let artifact = BackupArtifact {
            job: BackupJobType::Cms,
            path: dir.path().join("gone.backup"),
            created_at: Utc::now(),
            size_bytes: 0,
        };
        executor.delete_artifact(&artifact).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandBackupExecutor::from_config(&config(
            dir.path(),
            Some(r#"printf '%s' "$HERITAGE_BACKUP_JOB" > "$HERITAGE_BACKUP_OUTPUT""#),
        ));

        let artifact = executor.run_backup(BackupJobType::Cms).await.unwrap();
        assert!(artifact.path.starts_with(dir.path().join("cms")));
        assert_eq!(std::fs::read_to_string(&artifact.path).unwrap(), "cms");
        assert_eq!(artifact.size_bytes, 3);

        let listed = executor.list_artifacts(BackupJobType::Cms).await.unwrap();
        assert_eq!(listed, vec![artifact.clone()]);

        executor.delete_artifact(&artifact).await.unwrap();
        assert!(executor.list_artifacts(BackupJobType::Cms).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandBackupExecutor::from_config(&config(
            dir.path(),
            Some("echo disk full >&2; exit 3"),
        ));
        let err = executor.run_backup(BackupJobType::Cms).await.unwrap_err();
        assert!(err.message.contains("disk full"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_without_output_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandBackupExecutor::from_config(&config(dir.path(), Some("true")));
        assert!(executor.run_backup(BackupJobType::Cms).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_command_times_out_and_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = CommandBackupExecutor::from_config(&config(
            dir.path(),
            Some(r#"printf x > "$HERITAGE_BACKUP_OUTPUT"; exec sleep 5"#),
        ));
        executor.command_timeout = Duration::from_millis(200);

        let started = std::time::Instant::now();
        let err = executor.run_backup(BackupJobType::Cms).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(executor.list_artifacts(BackupJobType::Cms).await.unwrap().is_empty());
    }
}
