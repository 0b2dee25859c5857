use std::time::Instant;

use crate::input::{ActionSet, InputMapper, ViewAction};
use crate::projection::{FrameUniforms, UniformProjector, ViewportAspect};
use crate::smoothing::ParameterSmoother;
use crate::types::ViewerSettings;
use crate::view::ViewState;

/// Measures elapsed seconds between frames.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick; the first tick reports zero.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last = Some(now);
        dt
    }
}

/// Result of advancing one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    pub uniforms: FrameUniforms,
    /// Set when the quit action was active; the loop exits after this frame.
    pub close_requested: bool,
}

/// The per-frame pipeline: input, smoothing, projection.
///
/// Owns the single [`ViewState`] of the viewer and threads it through each
/// stage in order.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    view: ViewState,
    mapper: InputMapper,
    smoother: ParameterSmoother,
    projector: UniformProjector,
    aspect: ViewportAspect,
}

impl FrameDriver {
    pub fn new(settings: &ViewerSettings, aspect: ViewportAspect) -> Self {
        Self {
            view: ViewState::new(settings.defaults, settings.preset),
            mapper: InputMapper::new(settings.input_rates, settings.defaults, settings.preset),
            smoother: ParameterSmoother::new(settings.decay_rates),
            projector: UniformProjector,
            aspect,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn aspect(&self) -> ViewportAspect {
        self.aspect
    }

    /// Handles a resize notification from the window.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.aspect.update(width, height) {
            tracing::debug!(width, height, aspect = self.aspect.ratio(), "viewport resized");
        }
    }

    pub fn advance(&mut self, actions: &ActionSet, dt: f64) -> FrameStep {
        self.mapper.apply(&mut self.view, actions, dt);
        self.smoother.step(&mut self.view, dt);
        FrameStep {
            uniforms: self.projector.project(&self.view, self.aspect),
            close_requested: actions.contains(ViewAction::Quit),
        }
    }
}
