use std::borrow::Cow;

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

use crate::program::ShaderProgram;

/// Fragment shader shipped with the viewer, used when no path is given.
pub const BUNDLED_FRAGMENT_GLSL: &str = include_str!("../shaders/mandel.frag");

/// Oversized triangle covering the viewport; `v_pos` spans [-1, 1] on screen.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_pos;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -1.0),
    vec2(-1.0, 3.0),
    vec2(3.0, -1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_pos = pos;
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// GPU-side shader modules for a program that already passed validation.
pub(crate) struct ProgramModules {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

/// Uploads both stages of `program` to the device. Validation errors raised
/// by the device are returned.
pub(crate) fn create_program_modules(
    device: &wgpu::Device,
    program: &ShaderProgram,
) -> Result<ProgramModules> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(program.vertex_source().to_owned()),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    });
    let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fractal fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(program.fragment_source().to_owned()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow!("device rejected shader modules: {err}"));
    }

    Ok(ProgramModules { vertex, fragment })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_fragment_declares_expected_block() {
        assert!(BUNDLED_FRAGMENT_GLSL.starts_with("#version 450"));
        for member in ["vec4 center;", "vec4 zoom;", "float rotation;", "uint max_iter;"] {
            assert!(BUNDLED_FRAGMENT_GLSL.contains(member), "{member}");
        }
    }

    #[test]
    fn bundled_fragment_reads_low_halves_before_the_high_center() {
        assert!(BUNDLED_FRAGMENT_GLSL.contains("params.zoom.zw"));
        assert!(BUNDLED_FRAGMENT_GLSL.contains("params.center.xy + (turned + params.center.zw)"));
        assert!(!BUNDLED_FRAGMENT_GLSL.contains("Double-precision"));
        assert!(BUNDLED_FRAGMENT_GLSL.contains("single precision"));
    }
}
