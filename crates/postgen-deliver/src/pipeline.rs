//! Hands rendered slides to the user: one native share request for the whole
//! set when the host supports it, otherwise one download per slide with a
//! pause between triggers.

use std::time::Duration;

use postgen_core::{PostError, RenderedAsset, DEFAULT_DOWNLOAD_INTERVAL};

use crate::filename::sanitize_base_name;
use crate::host::{Delay, DownloadSink, Notifier, ShareError, ShareFile, ShareRequest, ShareTarget, PNG_MIME};
use crate::state::{PipelineState, StateMachine};

/// How a delivery ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The OS share surface accepted the files.
    Shared,
    /// The user dismissed the share sheet; counts as success.
    ShareCancelled,
    /// Every file was downloaded.
    Downloaded { count: usize },
    /// There was nothing to deliver.
    Empty,
    /// Delivery stopped; files delivered before the failure are kept.
    Failed { message: String },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, DeliveryOutcome::Failed { .. })
    }
}

/// Result of one request, with every state it passed through.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    pub transitions: Vec<PipelineState>,
    /// File names delivered (shared or downloaded), in order.
    pub delivered: Vec<String>,
}

impl DeliveryReport {
    pub fn final_state(&self) -> PipelineState {
        self.transitions.last().copied().unwrap_or(PipelineState::Idle)
    }
}

pub struct DeliveryPipeline {
    share: Box<dyn ShareTarget>,
    sink: Box<dyn DownloadSink>,
    delay: Box<dyn Delay>,
    notifier: Box<dyn Notifier>,
    interval: Duration,
    share_text: String,
}

impl DeliveryPipeline {
    pub fn new(
        share: Box<dyn ShareTarget>,
        sink: Box<dyn DownloadSink>,
        delay: Box<dyn Delay>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            share,
            sink,
            delay,
            notifier,
            interval: DEFAULT_DOWNLOAD_INTERVAL,
            share_text: String::new(),
        }
    }

    /// Pause inserted between consecutive download triggers.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Descriptive text attached to share requests.
    pub fn with_share_text(mut self, text: impl Into<String>) -> Self {
        self.share_text = text.into();
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Deliver `assets` named after `title`, starting from `Delivering`.
    pub async fn deliver(&self, assets: &[RenderedAsset], title: &str) -> DeliveryReport {
        let mut machine = StateMachine::starting_at(PipelineState::Delivering);
        let (outcome, delivered) = self.run(&mut machine, assets, title).await;
        DeliveryReport {
            outcome,
            transitions: machine.into_history(),
            delivered,
        }
    }

    /// Drive `machine` (which must be in `Delivering`) to a terminal state.
    pub(crate) async fn run(
        &self,
        machine: &mut StateMachine,
        assets: &[RenderedAsset],
        title: &str,
    ) -> (DeliveryOutcome, Vec<String>) {
        let base = sanitize_base_name(title);
        let names: Vec<String> = assets.iter().map(|a| a.file_name(&base)).collect();

        if assets.is_empty() {
            tracing::info!("Nothing to deliver");
            machine.advance(PipelineState::Done);
            return (DeliveryOutcome::Empty, Vec::new());
        }

        let files: Vec<ShareFile> = assets
            .iter()
            .zip(&names)
            .map(|(asset, name)| ShareFile {
                name: name.clone(),
                mime: PNG_MIME,
                bytes: asset.png.clone(),
            })
            .collect();

        if self.share.supports_files(&files) {
            machine.advance(PipelineState::NativeShare);
            let request = ShareRequest {
                files,
                title: title.trim().to_string(),
                text: self.share_text.clone(),
            };
            tracing::info!("Opening native share for {} file(s)", names.len());
            match self.share.share(request).await {
                Ok(()) => {
                    tracing::info!("Native share completed");
                    machine.advance(PipelineState::Done);
                    return (DeliveryOutcome::Shared, names);
                }
                Err(ShareError::Cancelled) => {
                    tracing::info!("Native share cancelled by user");
                    machine.advance(PipelineState::Done);
                    return (DeliveryOutcome::ShareCancelled, Vec::new());
                }
                Err(ShareError::Failed(reason)) => {
                    tracing::info!("Native share failed ({}); falling back to downloads", reason);
                }
            }
        } else {
            tracing::debug!("Native share unsupported; downloading sequentially");
        }

        machine.advance(PipelineState::SequentialDownload);
        self.download_all(machine, assets, &names).await
    }

    async fn download_all(
        &self,
        machine: &mut StateMachine,
        assets: &[RenderedAsset],
        names: &[String],
    ) -> (DeliveryOutcome, Vec<String>) {
        let mut delivered = Vec::with_capacity(assets.len());

        for (i, (asset, name)) in assets.iter().zip(names).enumerate() {
            if i > 0 {
                self.delay.wait(self.interval).await;
            }

            if let Err(e) = self.download_one(name, &asset.png).await {
                tracing::error!("Download of {} failed: {}", name, e);
                self.notifier.notify(&format!(
                    "Could not save {} ({} of {} file(s) were saved).",
                    name,
                    delivered.len(),
                    assets.len()
                ));
                machine.advance(PipelineState::Failed);
                return (
                    DeliveryOutcome::Failed {
                        message: e.to_string(),
                    },
                    delivered,
                );
            }

            tracing::info!("Downloaded {} ({}/{})", name, i + 1, assets.len());
            delivered.push(name.clone());
        }

        machine.advance(PipelineState::Done);
        (
            DeliveryOutcome::Downloaded {
                count: delivered.len(),
            },
            delivered,
        )
    }

    async fn download_one(&self, name: &str, bytes: &[u8]) -> Result<(), PostError> {
        let handle = self.sink.materialize(name, bytes).await?;
        let triggered = self.sink.trigger(&handle).await;
        self.sink.release(handle).await;
        triggered
    }
}
