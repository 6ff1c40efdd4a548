//! One render + delivery request at a time.

use parking_lot::Mutex;
use postgen_core::{PostError, PostResult, RenderInput, RenderedAsset};
use postgen_render::Compositor;

use crate::pipeline::{DeliveryOutcome, DeliveryPipeline, DeliveryReport};
use crate::state::{PipelineState, StateMachine};

/// Owns the compositor and the delivery pipeline and guards the boundary so
/// a second request cannot start while one is rendering or delivering.
pub struct Session {
    compositor: Compositor,
    pipeline: DeliveryPipeline,
    state: Mutex<PipelineState>,
}

impl Session {
    pub fn new(compositor: Compositor, pipeline: DeliveryPipeline) -> Self {
        Self {
            compositor,
            pipeline,
            state: Mutex::new(PipelineState::Idle),
        }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn pipeline(&self) -> &DeliveryPipeline {
        &self.pipeline
    }

    /// State of the current (or last) request.
    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Render every slide of `input` and deliver the set.
    ///
    /// Returns `PostError::Busy` if another request is in flight. Render
    /// errors end the request in `Failed` and are returned as `Err`; delivery
    /// problems are reported through the returned report.
    pub async fn generate(&self, input: &RenderInput) -> PostResult<DeliveryReport> {
        let mut guard = RequestGuard::acquire(&self.state)?;
        let mut machine = StateMachine::new();

        machine.advance(PipelineState::Rendering);
        guard.set(PipelineState::Rendering);
        tracing::info!("Rendering format '{}'", input.format);

        let assets: Vec<RenderedAsset> = match self.compositor.render_all(input).await {
            Ok(assets) => assets,
            Err(e) => {
                tracing::error!("Render failed: {}", e);
                machine.advance(PipelineState::Failed);
                guard.set(PipelineState::Failed);
                return Err(e);
            }
        };

        machine.advance(PipelineState::Delivering);
        guard.set(PipelineState::Delivering);
        let (outcome, delivered) = self.pipeline.run(&mut machine, &assets, &input.title).await;

        let last = machine.current();
        guard.set(last);
        if let DeliveryOutcome::Failed { message } = &outcome {
            tracing::warn!("Delivery ended in failure: {}", message);
        }

        Ok(DeliveryReport {
            outcome,
            transitions: machine.into_history(),
            delivered,
        })
    }
}

/// Holds the session's busy flag for the duration of one request. A request
/// dropped mid-flight (future cancelled) leaves the session in `Failed`.
struct RequestGuard<'a> {
    state: &'a Mutex<PipelineState>,
}

impl<'a> RequestGuard<'a> {
    fn acquire(state: &'a Mutex<PipelineState>) -> PostResult<Self> {
        let mut current = state.lock();
        if current.is_busy() {
            return Err(PostError::Busy);
        }
        *current = PipelineState::Rendering;
        Ok(Self { state })
    }

    fn set(&mut self, next: PipelineState) {
        *self.state.lock() = next;
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        let mut current = self.state.lock();
        if current.is_busy() {
            *current = PipelineState::Failed;
        }
    }
}
