use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use crate::bindings::KeyBindings;
use crate::frame::{FrameClock, FrameDriver};
use crate::gpu::GpuState;
use crate::program::ShaderProgram;
use crate::projection::ViewportAspect;
use crate::types::RendererConfig;

/// Window, GPU and navigation state driven by the event loop.
pub(crate) struct WindowState {
    // Declared before `window` so the surface is released first.
    gpu: GpuState,
    window: Arc<Window>,
    driver: FrameDriver,
    clock: FrameClock,
    keyboard: KeyboardState,
    bindings: KeyBindings,
}

/// What the loop should do after a redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameOutcome {
    Continue,
    Exit,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig, program: &ShaderProgram) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.as_ref(), size, program, &config.palette)?;
        let aspect = ViewportAspect::from_size(size.width, size.height).unwrap_or_else(|| {
            let (width, height) = config.surface_size;
            ViewportAspect::from_size(width, height).unwrap_or_default()
        });

        Ok(Self {
            gpu,
            window,
            driver: FrameDriver::new(&config.settings, aspect),
            clock: FrameClock::new(),
            keyboard: KeyboardState::default(),
            bindings: config.bindings.clone(),
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.driver.resize(new_size.width, new_size.height);
        self.gpu.resize(new_size);
    }

    fn render_frame(&mut self) -> FrameOutcome {
        let dt = self.clock.tick(Instant::now());
        let actions = self
            .bindings
            .active_actions(|code| self.keyboard.is_pressed(code));
        let step = self.driver.advance(&actions, dt);

        match self.gpu.render(&step.uniforms) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.recover_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; closing viewer");
                return FrameOutcome::Exit;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
            }
            Err(other) => {
                warn!("surface error: {other:?}; retrying next frame");
            }
        }

        if step.close_requested {
            FrameOutcome::Exit
        } else {
            FrameOutcome::Continue
        }
    }
}

/// Opens the viewer window and runs the frame loop on the calling thread
/// until the window closes or the quit action fires.
pub(crate) fn run_window(config: RendererConfig, program: ShaderProgram) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create viewer window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config, &program)
        .map_err(|err| anyhow!("failed to initialise window renderer: {err}"))?;

    let profile = state.gpu.adapter_profile();
    if profile.is_software() {
        warn!(
            adapter = %profile.name,
            backend = ?profile.backend,
            "software rasterizer detected; deep zooms will be slow"
        );
    }
    info!(
        width = state.gpu.size().width,
        height = state.gpu.size().height,
        "viewer window ready"
    );

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        state.keyboard.handle_event(&event);
                    }
                    WindowEvent::Focused(false) => {
                        state.keyboard.clear();
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                    }
                    WindowEvent::RedrawRequested => {
                        if state.render_frame() == FrameOutcome::Exit {
                            info!("closing viewer");
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                state.window().request_redraw();
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Physical keys currently held down.
#[derive(Debug, Default)]
struct KeyboardState {
    pressed: HashSet<KeyCode>,
}

impl KeyboardState {
    fn handle_event(&mut self, event: &KeyEvent) -> bool {
        let PhysicalKey::Code(code) = event.physical_key else {
            return false;
        };
        match event.state {
            ElementState::Pressed => self.pressed.insert(code),
            ElementState::Released => self.pressed.remove(&code),
        }
    }

    fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    // Releases are lost while unfocused.
    fn clear(&mut self) {
        self.pressed.clear();
    }
}
