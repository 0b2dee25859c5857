//! Renderer crate for mandelview, an interactive Mandelbrot explorer.
//!
//! The crate holds the navigation core and the `wgpu` presentation path. Each
//! frame flows through the same stages:
//!
//! ```text
//!   keyboard ──▶ KeyBindings ──▶ ActionSet
//!                                   │
//!                                   ▼
//!   InputMapper::apply ──▶ ViewState.target
//!                                   │
//!   ParameterSmoother::step ──▶ ViewState.displayed
//!                                   │
//!   UniformProjector::project ──▶ FrameUniforms ──▶ GPU UBO ──▶ draw
//! ```
//!
//! The navigation types are plain data and carry no GPU handles, so they are
//! usable and testable without a window. `ShaderProgramManager` validates the
//! GLSL sources with naga before any device exists, which lets the CLI check
//! a shader headlessly.

mod bindings;
mod compile;
mod frame;
mod gpu;
mod input;
mod program;
mod projection;
mod smoothing;
mod types;
mod view;
mod window;

use anyhow::Result;

pub use bindings::{parse_key_name, BindingError, KeyBindings};
pub use compile::{BUNDLED_FRAGMENT_GLSL, VERTEX_SHADER_GLSL};
pub use frame::{FrameClock, FrameDriver, FrameStep};
pub use gpu::AdapterProfile;
pub use input::{movement_basis, ActionSet, InputMapper, InputRates, ViewAction};
pub use program::{
    load_shader_source, Diagnostic, ProgramError, ProgramStage, ShaderProgram,
    ShaderProgramManager, ShaderStageKind, SlotKind, UniformName, UniformSlot,
    DIAGNOSTIC_CAPACITY, ENTRY_POINT,
};
pub use projection::{corrected_zoom, FrameUniforms, UniformProjector, ViewportAspect};
pub use smoothing::{approach, DecayRates, ParameterSmoother};
pub use types::{FragmentSource, Palette, RendererConfig, ViewerSettings};
pub use view::{
    wrap_angle, CameraPose, Vec2, ViewDefaults, ViewState, DEFAULT_PRESET, MIN_ITERATIONS,
    MIN_ZOOM,
};

/// Compiles, links and validates the viewer program for `fragment` without
/// touching the GPU.
pub fn build_program(fragment: &FragmentSource) -> Result<ShaderProgram, ProgramError> {
    let fragment_source = match fragment {
        FragmentSource::Bundled => BUNDLED_FRAGMENT_GLSL.to_string(),
        FragmentSource::File(path) => load_shader_source(path)?,
    };
    ShaderProgramManager::new().build(VERTEX_SHADER_GLSL, &fragment_source)
}

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Builds the shader program, then opens the window and runs until it
    /// closes.
    ///
    /// A program that fails to build is reported before any window appears.
    pub fn run(self) -> Result<()> {
        let program = build_program(&self.config.fragment)?;
        tracing::info!(
            fragment = ?self.config.fragment,
            uniforms = program.uniform_slots().count(),
            "shader program ready"
        );
        window::run_window(self.config, program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_program_builds_headlessly() {
        let program = build_program(&FragmentSource::Bundled).expect("bundled program");
        for name in UniformName::ALL {
            assert!(program.uniform_slot(name).is_some(), "missing {name:?}");
        }
    }

    #[test]
    fn missing_fragment_file_is_reported() {
        let dir = std::env::temp_dir().join("mandelview-renderer-missing");
        let err = build_program(&FragmentSource::File(dir.join("nope.frag")))
            .expect_err("missing file");
        assert!(matches!(err, ProgramError::SourceUnavailable { .. }));
    }
}
