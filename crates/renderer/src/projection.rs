use crate::view::{ViewState, MIN_ITERATIONS};

/// Width-over-height ratio of the drawable surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportAspect(f64);

impl ViewportAspect {
    pub fn from_size(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self(f64::from(width) / f64::from(height)))
    }

    pub fn ratio(self) -> f64 {
        self.0
    }

    /// Recomputes the ratio after a resize, keeping the previous value when the
    /// surface collapsed to zero pixels.
    pub fn update(&mut self, width: u32, height: u32) -> bool {
        match Self::from_size(width, height) {
            Some(aspect) => {
                *self = aspect;
                true
            }
            None => {
                tracing::warn!(width, height, "ignoring degenerate viewport size");
                false
            }
        }
    }
}

impl Default for ViewportAspect {
    fn default() -> Self {
        Self(1.0)
    }
}

/// Exact values handed to the fractal shader for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub max_iterations: u32,
    pub center: [f64; 2],
    pub rotation: f32,
    pub zoom: [f64; 2],
}

/// Maps the smoothed camera onto shader uniforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformProjector;

impl UniformProjector {
    pub fn project(&self, state: &ViewState, aspect: ViewportAspect) -> FrameUniforms {
        let displayed = &state.displayed;
        FrameUniforms {
            max_iterations: iteration_budget(state.target_iterations),
            center: [displayed.center.x, displayed.center.y],
            rotation: displayed.rotation as f32,
            zoom: corrected_zoom(displayed.zoom, aspect.ratio()),
        }
    }
}

fn iteration_budget(iterations: f64) -> u32 {
    let floor = MIN_ITERATIONS as u32;
    if iterations.is_nan() {
        return floor;
    }
    // `as` saturates at u32::MAX for oversized values.
    (iterations.round() as u32).max(floor)
}

/// Shrinks the span of the narrower screen axis so the plane is not stretched.
pub fn corrected_zoom(zoom: f64, aspect: f64) -> [f64; 2] {
    if aspect > 1.0 {
        [zoom, zoom / aspect]
    } else {
        [zoom * aspect, zoom]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{CameraPose, Vec2};

    #[test]
    fn wide_and_tall_viewports_are_symmetric() {
        assert_eq!(corrected_zoom(4.0, 2.0), [4.0, 2.0]);
        assert_eq!(corrected_zoom(4.0, 0.5), [2.0, 4.0]);
        assert_eq!(corrected_zoom(4.0, 1.0), [4.0, 4.0]);
    }

    #[test]
    fn projection_passes_camera_through() {
        let mut state = ViewState::default();
        state.displayed = CameraPose::new(Vec2::new(-0.743643887037151, 0.13182590420533), 0.5, 0.001);
        state.target_iterations = 1234.4;
        let aspect = ViewportAspect::from_size(800, 600).expect("aspect");

        let uniforms = UniformProjector.project(&state, aspect);
        assert_eq!(uniforms.max_iterations, 1234);
        assert_eq!(uniforms.center, [-0.743643887037151, 0.13182590420533]);
        assert_eq!(uniforms.rotation, 0.5_f32);
        assert_eq!(uniforms.zoom[0], 0.001);
        assert!((uniforms.zoom[1] - 0.00075).abs() < 1e-15);
    }

    #[test]
    fn iteration_budget_rounds_and_reclamps() {
        assert_eq!(iteration_budget(2.5), 3);
        assert_eq!(iteration_budget(254.49), 254);
        assert_eq!(iteration_budget(-10.0), 2);
        assert_eq!(iteration_budget(f64::NAN), 2);
        assert_eq!(iteration_budget(1e20), u32::MAX);
    }

    #[test]
    fn zero_height_keeps_previous_aspect() {
        let mut aspect = ViewportAspect::from_size(1600, 900).expect("aspect");
        assert!(!aspect.update(1600, 0));
        assert!((aspect.ratio() - 16.0 / 9.0).abs() < 1e-12);
        assert!(aspect.update(300, 600));
        assert_eq!(aspect.ratio(), 0.5);
    }
}
