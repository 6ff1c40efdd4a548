//! # postgen-deliver
//!
//! Hands rendered slides to the user. A request moves through an explicit
//! state machine: native share of the whole set when the host supports it,
//! otherwise sequential per-file downloads separated by a fixed interval.

pub mod filename;
pub mod host;
pub mod native;
pub mod pipeline;
pub mod session;
pub mod state;

pub use filename::{sanitize_base_name, DEFAULT_BASE_NAME};
pub use host::{
    Delay, DownloadHandle, DownloadSink, NoShare, Notifier, ShareError, ShareFile, ShareRequest,
    ShareTarget, PNG_MIME,
};
pub use native::{CommandShare, DirectorySink, LogNotifier, TokioDelay};
pub use pipeline::{DeliveryOutcome, DeliveryPipeline, DeliveryReport};
pub use session::Session;
pub use state::{PipelineState, StateMachine};
