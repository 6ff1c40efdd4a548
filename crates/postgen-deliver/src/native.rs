//! Desktop host: downloads land in a directory, sharing goes through an
//! external command.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use postgen_core::{DeliveryConfig, PostError, PostResult};
use tokio::process::Command;

use crate::host::{Delay, DownloadHandle, DownloadSink, Notifier, ShareError, ShareFile, ShareRequest, ShareTarget};

/// Writes each file to a hidden temp file in `dir`, then renames it into
/// place when triggered.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn materialize(&self, file_name: &str, bytes: &[u8]) -> PostResult<DownloadHandle> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PostError::delivery(format!("cannot create {}: {}", self.dir.display(), e), file_name))?;

        let temp = self.dir.join(format!(".{}.part", file_name));
        tokio::fs::write(&temp, bytes)
            .await
            .map_err(|e| PostError::delivery(e.to_string(), file_name))?;

        Ok(DownloadHandle {
            file_name: file_name.to_string(),
            locator: temp.to_string_lossy().into_owned(),
        })
    }

    async fn trigger(&self, handle: &DownloadHandle) -> PostResult<()> {
        let target = self.dir.join(&handle.file_name);
        tokio::fs::rename(&handle.locator, &target)
            .await
            .map_err(|e| PostError::delivery(e.to_string(), handle.file_name.clone()))?;
        tracing::debug!("Saved {}", target.display());
        Ok(())
    }

    async fn release(&self, handle: DownloadHandle) {
        // Only left behind when the trigger failed.
        match tokio::fs::remove_file(&handle.locator).await {
            Ok(()) => tracing::debug!("Removed leftover {}", handle.locator),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove {}: {}", handle.locator, e),
        }
    }
}

/// Runs a configured program with every file path appended, in one call.
///
/// Files are staged in a fresh directory under `staging_root` for each
/// request and that directory is removed once the program exits.
#[derive(Debug, Clone)]
pub struct CommandShare {
    program: String,
    args: Vec<String>,
    cancel_exit_code: i32,
    staging_root: PathBuf,
}

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

impl CommandShare {
    /// `command[0]` is the program, the rest are leading arguments.
    pub fn new(command: &[String], cancel_exit_code: i32, staging_root: impl Into<PathBuf>) -> PostResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| PostError::InvalidArgument("share command must name a program".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            cancel_exit_code,
            staging_root: staging_root.into(),
        })
    }

    /// Build from the delivery config; `None` when no command is configured.
    /// Staging happens under the system temp dir, never in the output dir.
    pub fn from_config(config: &DeliveryConfig) -> PostResult<Option<Self>> {
        match &config.share_command {
            Some(command) => Ok(Some(Self::new(
                command,
                config.share_cancel_exit_code,
                std::env::temp_dir().join("postgen-share"),
            )?)),
            None => Ok(None),
        }
    }

    fn request_dir(&self) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        self.staging_root
            .join(format!("{}-{}", std::process::id(), seq))
    }

    async fn stage(&self, dir: &Path, files: &[ShareFile]) -> Result<Vec<PathBuf>, ShareError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ShareError::Failed(e.to_string()))?;
        let mut paths = Vec::with_capacity(files.len());
        for file in files {
            let path = dir.join(&file.name);
            tokio::fs::write(&path, &file.bytes)
                .await
                .map_err(|e| ShareError::Failed(format!("{}: {}", file.name, e)))?;
            paths.push(path);
        }
        Ok(paths)
    }

    async fn run(&self, dir: &Path, request: &ShareRequest) -> Result<(), ShareError> {
        let paths = self.stage(dir, &request.files).await?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(&paths)
            .env("POSTGEN_SHARE_TITLE", &request.title)
            .env("POSTGEN_SHARE_TEXT", &request.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ShareError::Failed(format!("cannot run {}: {}", self.program, e)))?;

        if output.status.success() {
            return Ok(());
        }
        if output.status.code() == Some(self.cancel_exit_code) {
            return Err(ShareError::Cancelled);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ShareError::Failed(format!(
            "{} exited with {}: {}",
            self.program,
            output.status,
            stderr.trim()
        )))
    }
}

#[async_trait]
impl ShareTarget for CommandShare {
    fn supports_files(&self, files: &[ShareFile]) -> bool {
        !files.is_empty()
    }

    async fn share(&self, request: ShareRequest) -> Result<(), ShareError> {
        let dir = self.request_dir();
        let result = self.run(&dir, &request).await;

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => tracing::debug!("Removed share staging dir {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove {}: {}", dir.display(), e),
        }
        result
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Logs the notice and echoes it on stderr for the user.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::error!("{}", message);
        eprintln!("postgen: {}", message);
    }
}
