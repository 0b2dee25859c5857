use std::f64::consts::{PI, TAU};

/// Smallest zoom span the viewer will accept. Stays a normal `f32` after the
/// aspect correction, so the packed high half never rounds to zero.
pub const MIN_ZOOM: f64 = 1e-30;

/// Lowest iteration budget the fractal shader is ever asked to run.
pub const MIN_ITERATIONS: f64 = 2.0;

/// A point or direction in the fractal plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// Position, orientation and span of the viewing frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub center: Vec2,
    /// Radians, counter-clockwise.
    pub rotation: f64,
    /// Half-extent of the visible plane along the wider screen axis.
    pub zoom: f64,
}

impl CameraPose {
    pub const fn new(center: Vec2, rotation: f64, zoom: f64) -> Self {
        Self {
            center,
            rotation,
            zoom,
        }
    }
}

/// Values the viewer starts from and returns to on reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewDefaults {
    pub pose: CameraPose,
    pub iterations: f64,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            pose: CameraPose::new(Vec2::new(-0.5, 0.0), 0.0, 2.0),
            iterations: 255.0,
        }
    }
}

/// The static bookmark recalled by the recall action. It also seeds the
/// displayed pose, so the first frames glide from here into the defaults.
pub const DEFAULT_PRESET: CameraPose = CameraPose::new(Vec2::new(-0.5, 0.0), 0.0, 3.0);

/// Target camera the user steers plus the smoothed camera that is drawn.
///
/// Targets are written by [`InputMapper`](crate::InputMapper); displayed values
/// by [`ParameterSmoother`](crate::ParameterSmoother). Zoom stays strictly
/// positive and the iteration budget never drops below [`MIN_ITERATIONS`].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub target: CameraPose,
    pub target_iterations: f64,
    pub displayed: CameraPose,
}

impl ViewState {
    pub fn new(defaults: ViewDefaults, initial_display: CameraPose) -> Self {
        let mut state = Self {
            target: defaults.pose,
            target_iterations: defaults.iterations,
            displayed: initial_display,
        };
        state.target.rotation = wrap_angle(state.target.rotation);
        state.clamp();
        state.displayed.zoom = sanitize_zoom(state.displayed.zoom);
        state
    }

    /// Re-applies the zoom floor and iteration floor to the targets.
    pub fn clamp(&mut self) {
        self.target.zoom = sanitize_zoom(self.target.zoom);
        self.target_iterations = sanitize_iterations(self.target_iterations);
    }

    /// Replaces every target with the supplied defaults.
    pub fn reset_to(&mut self, defaults: &ViewDefaults) {
        self.target = defaults.pose;
        self.target.rotation = wrap_angle(self.target.rotation);
        self.target_iterations = defaults.iterations;
        self.clamp();
    }

    /// Steers the camera to a bookmarked pose; the iteration budget is untouched.
    pub fn recall(&mut self, preset: &CameraPose) {
        self.target = *preset;
        self.target.rotation = wrap_angle(self.target.rotation);
        self.clamp();
    }

    /// Pins the targets to whatever is currently on screen.
    pub fn hold(&mut self) {
        self.target = self.displayed;
        self.target.rotation = wrap_angle(self.target.rotation);
        self.clamp();
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(ViewDefaults::default(), DEFAULT_PRESET)
    }
}

/// Folds an angle into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

fn sanitize_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        MIN_ZOOM
    } else {
        zoom.max(MIN_ZOOM)
    }
}

fn sanitize_iterations(iterations: f64) -> f64 {
    if iterations.is_nan() {
        MIN_ITERATIONS
    } else {
        iterations.max(MIN_ITERATIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_starts_from_preset_and_targets_defaults() {
        let state = ViewState::default();
        assert_eq!(state.displayed, DEFAULT_PRESET);
        assert_eq!(state.target, ViewDefaults::default().pose);
        assert_eq!(state.target_iterations, 255.0);
    }

    #[test]
    fn clamp_restores_floors() {
        let mut state = ViewState::default();
        state.target.zoom = -4.0;
        state.target_iterations = -10.0;
        state.clamp();
        assert!(state.target.zoom > 0.0);
        assert_eq!(state.target_iterations, MIN_ITERATIONS);
    }

    #[test]
    fn wrap_angle_stays_in_half_open_range() {
        for raw in [-10.0, -PI, 0.0, PI, 3.5 * PI, 1e6] {
            let wrapped = wrap_angle(raw);
            assert!(wrapped > -PI - 1e-12 && wrapped <= PI + 1e-12, "{raw} -> {wrapped}");
            let turns = (raw - wrapped) / TAU;
            assert!((turns - turns.round()).abs() < 1e-9, "{raw} -> {wrapped}");
        }
        assert_eq!(wrap_angle(f64::NAN), 0.0);
    }

    #[test]
    fn recall_keeps_iterations() {
        let mut state = ViewState::default();
        state.target_iterations = 900.0;
        state.recall(&DEFAULT_PRESET);
        assert_eq!(state.target, DEFAULT_PRESET);
        assert_eq!(state.target_iterations, 900.0);
    }

    #[test]
    fn reset_restores_all_targets() {
        let defaults = ViewDefaults::default();
        let mut state = ViewState::default();
        state.target = CameraPose::new(Vec2::new(3.0, 1.0), 1.0, 0.01);
        state.target_iterations = 5000.0;
        state.reset_to(&defaults);
        assert_eq!(state.target, defaults.pose);
        assert_eq!(state.target_iterations, defaults.iterations);
    }

    #[test]
    fn hold_pins_targets_to_display() {
        let mut state = ViewState::default();
        state.displayed = CameraPose::new(Vec2::new(0.25, -0.1), 0.5, 0.75);
        state.hold();
        assert_eq!(state.target, state.displayed);
    }
}
