use bytemuck::{Pod, Zeroable};

use crate::projection::FrameUniforms;

/// std140 mirror of the `FractalParams` block in the fractal shader.
///
/// wgpu has no portable f64 uniforms, so every f64 travels as a high/low f32
/// pair: `xy` holds the rounded high halves and `zw` the residuals.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FractalUniforms {
    pub center: [f32; 4],
    pub zoom: [f32; 4],
    pub rotation: f32,
    pub max_iter: u32,
    pub _padding: [u32; 2],
}

unsafe impl Zeroable for FractalUniforms {}
unsafe impl Pod for FractalUniforms {}

impl FractalUniforms {
    pub fn from_frame(frame: &FrameUniforms) -> Self {
        Self {
            center: split_pair(frame.center),
            zoom: split_pair(frame.zoom),
            rotation: frame.rotation,
            max_iter: frame.max_iterations,
            _padding: [0; 2],
        }
    }
}

impl Default for FractalUniforms {
    fn default() -> Self {
        Self::zeroed()
    }
}

fn split_pair(value: [f64; 2]) -> [f32; 4] {
    let (x_hi, x_lo) = split(value[0]);
    let (y_hi, y_lo) = split(value[1]);
    [x_hi, y_hi, x_lo, y_lo]
}

/// Splits an f64 into an f32 plus the f32 residual the rounding dropped.
fn split(value: f64) -> (f32, f32) {
    let high = value as f32;
    let low = (value - f64::from(high)) as f32;
    (high, low)
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use super::*;
    use crate::program::UniformName;
    use crate::projection::{UniformProjector, ViewportAspect};
    use crate::view::{CameraPose, Vec2, ViewState, MIN_ZOOM};

    #[test]
    fn layout_matches_shader_expectations() {
        let offsets = [
            (UniformName::Center, offset_of!(FractalUniforms, center)),
            (UniformName::Zoom, offset_of!(FractalUniforms, zoom)),
            (UniformName::Rotation, offset_of!(FractalUniforms, rotation)),
            (UniformName::MaxIterations, offset_of!(FractalUniforms, max_iter)),
        ];
        for (name, offset) in offsets {
            assert_eq!(name.expected_layout().0 as usize, offset, "{name}");
        }
        assert_eq!(size_of::<FractalUniforms>(), 48);
    }

    #[test]
    fn split_keeps_precision_beyond_f32() {
        let value = -0.743_643_887_037_158_7_f64;
        let (high, low) = split(value);
        assert_ne!(f64::from(high), value);
        let rebuilt = f64::from(high) + f64::from(low);
        assert!((rebuilt - value).abs() < 1e-14);
    }

    #[test]
    fn frame_values_are_packed_in_order() {
        let frame = FrameUniforms {
            max_iterations: 300,
            center: [-0.5, 0.25],
            rotation: 1.5,
            zoom: [2.0, 1.5],
        };
        let packed = FractalUniforms::from_frame(&frame);
        assert_eq!(packed.center, [-0.5, 0.25, 0.0, 0.0]);
        assert_eq!(packed.zoom, [2.0, 1.5, 0.0, 0.0]);
        assert_eq!(packed.rotation, 1.5);
        assert_eq!(packed.max_iter, 300);
        assert_eq!(bytemuck::bytes_of(&packed).len(), 48);
    }

    #[test]
    fn zoom_floor_packs_to_nonzero_high_halves() {
        let mut state = ViewState::default();
        state.displayed = CameraPose::new(Vec2::new(-0.75, 0.1), 0.0, MIN_ZOOM);
        state.target = state.displayed;

        for (width, height) in [(1, 1), (3840, 1080), (1080, 3840)] {
            let aspect = ViewportAspect::from_size(width, height).unwrap();
            let frame = UniformProjector.project(&state, aspect);
            let packed = FractalUniforms::from_frame(&frame);
            assert!(packed.zoom[0] > 0.0, "{width}x{height}");
            assert!(packed.zoom[1] > 0.0, "{width}x{height}");
            assert!(packed.zoom[0].is_normal() && packed.zoom[1].is_normal());
        }
    }
}
