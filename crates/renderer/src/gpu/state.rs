use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::program::ShaderProgram;
use crate::projection::FrameUniforms;
use crate::types::Palette;

use super::context::{AdapterProfile, GpuContext};
use super::palette::PaletteResources;
use super::pipeline::FractalPipeline;
use super::uniforms::FractalUniforms;

/// Everything the window needs to draw one fractal frame.
pub(crate) struct GpuState {
    context: GpuContext,
    pipeline: FractalPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    palette_bind_group: wgpu::BindGroup,
    _palette: PaletteResources,
    uniforms: FractalUniforms,
    frames_since_last_update: u32,
    last_stats: Instant,
}

impl GpuState {
    pub fn new(
        window: &Window,
        size: PhysicalSize<u32>,
        program: &ShaderProgram,
        palette: &Palette,
    ) -> Result<Self> {
        let context = GpuContext::new(window, size)?;
        let pipeline = FractalPipeline::new(&context.device, context.surface_format, program)?;

        let uniforms = FractalUniforms::default();
        let uniform_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("fractal uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let (_, binding) = program.uniform_block();
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("fractal uniform bind group"),
                layout: &pipeline.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let palette_resources = PaletteResources::new(&context.device, &context.queue, palette);
        let palette_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("palette bind group"),
                layout: &pipeline.palette_layout,
                entries: &palette_resources.bind_group_entries(),
            });
        debug!(colors = palette.len(), "palette uploaded");

        Ok(Self {
            context,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            palette_bind_group,
            _palette: palette_resources,
            uniforms,
            frames_since_last_update: 0,
            last_stats: Instant::now(),
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    /// Rebuilds the swapchain after it was lost or went out of date.
    pub fn recover_surface(&mut self) {
        self.context.reconfigure();
    }

    /// Uploads `frame` and draws the full-screen triangle.
    pub fn render(&mut self, frame: &FrameUniforms) -> Result<(), wgpu::SurfaceError> {
        let output = self.context.surface.get_current_texture()?;
        self.record_stats(frame);

        self.uniforms = FractalUniforms::from_frame(frame);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("fractal pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &self.palette_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn record_stats(&mut self, frame: &FrameUniforms) {
        self.frames_since_last_update += 1;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_stats);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_last_update as f32 / elapsed.as_secs_f32();
            debug!(
                fps = fps.round(),
                center_x = frame.center[0],
                center_y = frame.center[1],
                zoom = frame.zoom[0].max(frame.zoom[1]),
                rotation = frame.rotation,
                iterations = frame.max_iterations,
                "render stats"
            );
            self.frames_since_last_update = 0;
            self.last_stats = now;
        }
    }
}
