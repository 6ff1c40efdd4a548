//! The request state machine.
//!
//! ```text
//! Idle -> Rendering -> Delivering -> NativeShare -------> Done
//!                         |              |  (cancel = Done)
//!                         |              v
//!                         +-----> SequentialDownload --> Done
//! any non-terminal state ----------------------------> Failed
//! ```

use std::fmt;

/// Where a render + delivery request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Rendering,
    Delivering,
    NativeShare,
    SequentialDownload,
    Done,
    Failed,
}

impl PipelineState {
    /// Done and Failed end a request; nothing is retried.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// True while a request holds the pipeline.
    pub fn is_busy(&self) -> bool {
        !matches!(
            self,
            PipelineState::Idle | PipelineState::Done | PipelineState::Failed
        )
    }

    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, Rendering) => true,
            (Rendering, Delivering) => true,
            (Delivering, NativeShare) | (Delivering, SequentialDownload) | (Delivering, Done) => true,
            (NativeShare, Done) | (NativeShare, SequentialDownload) => true,
            (SequentialDownload, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Rendering => "rendering",
            PipelineState::Delivering => "delivering",
            PipelineState::NativeShare => "native-share",
            PipelineState::SequentialDownload => "sequential-download",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the current state and every state visited, in order.
#[derive(Debug, Clone)]
pub struct StateMachine {
    history: Vec<PipelineState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            history: vec![PipelineState::Idle],
        }
    }

    /// Start in `state`, for callers that enter the machine midway
    /// (the delivery pipeline on its own starts at `Delivering`).
    pub fn starting_at(state: PipelineState) -> Self {
        Self {
            history: vec![state],
        }
    }

    pub fn current(&self) -> PipelineState {
        self.history.last().copied().unwrap_or(PipelineState::Idle)
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Move to `next`. Illegal transitions are a programming error: they are
    /// logged and ignored, and trip a debug assertion in test builds.
    pub fn advance(&mut self, next: PipelineState) {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::error!("Illegal pipeline transition {} -> {}", current, next);
            debug_assert!(false, "illegal pipeline transition {} -> {}", current, next);
            return;
        }
        tracing::debug!("Pipeline {} -> {}", current, next);
        self.history.push(next);
    }

    pub fn into_history(self) -> Vec<PipelineState> {
        self.history
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
