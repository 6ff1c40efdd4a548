//! Seams between the delivery pipeline and the host environment.

use std::time::Duration;

use async_trait::async_trait;
use postgen_core::PostResult;

pub const PNG_MIME: &str = "image/png";

/// One file offered to the OS share surface.
#[derive(Debug, Clone)]
pub struct ShareFile {
    pub name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// A single share request covering the whole slide set.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    pub files: Vec<ShareFile>,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The user dismissed the share sheet.
    Cancelled,
    /// Anything else; delivery falls back to downloads.
    Failed(String),
}

impl std::fmt::Display for ShareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShareError::Cancelled => f.write_str("share cancelled by user"),
            ShareError::Failed(reason) => write!(f, "share failed: {}", reason),
        }
    }
}

/// OS-level share capability that accepts several files at once.
#[async_trait]
pub trait ShareTarget: Send + Sync {
    /// Whether this host can share these files in one request.
    fn supports_files(&self, files: &[ShareFile]) -> bool;

    /// Present the share surface and wait for the user. Unbounded wait.
    async fn share(&self, request: ShareRequest) -> Result<(), ShareError>;
}

/// A transient, downloadable handle for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHandle {
    pub file_name: String,
    /// Host-specific locator (temp path, object URL, ...).
    pub locator: String,
}

/// Per-file download mechanism.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Make `bytes` available under a transient handle.
    async fn materialize(&self, file_name: &str, bytes: &[u8]) -> PostResult<DownloadHandle>;

    /// Fire the download for a materialized handle.
    async fn trigger(&self, handle: &DownloadHandle) -> PostResult<()>;

    /// Free the transient handle. Called whether or not the trigger worked.
    async fn release(&self, handle: DownloadHandle);
}

/// Suspends between downloads.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Surfaces an irrecoverable delivery failure to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Share target for hosts without a native share surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoShare;

#[async_trait]
impl ShareTarget for NoShare {
    fn supports_files(&self, _files: &[ShareFile]) -> bool {
        false
    }

    async fn share(&self, _request: ShareRequest) -> Result<(), ShareError> {
        Err(ShareError::Failed("native share is not available".into()))
    }
}
