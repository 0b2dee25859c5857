use std::fmt;

use crate::view::{wrap_angle, CameraPose, Vec2, ViewDefaults, ViewState, DEFAULT_PRESET};

/// Largest share of the zoom span a single frame may zoom in by.
const MAX_ZOOM_IN_FRACTION: f64 = 0.5;

/// Logical navigation actions the viewer understands.
///
/// Physical keys are bound to these through [`KeyBindings`](crate::KeyBindings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewAction {
    ZoomIn,
    ZoomOut,
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    RotateLeft,
    RotateRight,
    MoreIterations,
    FewerIterations,
    Reset,
    Recall,
    Hold,
    Quit,
}

impl ViewAction {
    pub const ALL: [ViewAction; 14] = [
        ViewAction::ZoomIn,
        ViewAction::ZoomOut,
        ViewAction::Forward,
        ViewAction::Back,
        ViewAction::StrafeLeft,
        ViewAction::StrafeRight,
        ViewAction::RotateLeft,
        ViewAction::RotateRight,
        ViewAction::MoreIterations,
        ViewAction::FewerIterations,
        ViewAction::Reset,
        ViewAction::Recall,
        ViewAction::Hold,
        ViewAction::Quit,
    ];

    /// Name used for this action in configuration files.
    pub fn config_name(self) -> &'static str {
        match self {
            ViewAction::ZoomIn => "zoom_in",
            ViewAction::ZoomOut => "zoom_out",
            ViewAction::Forward => "forward",
            ViewAction::Back => "back",
            ViewAction::StrafeLeft => "strafe_left",
            ViewAction::StrafeRight => "strafe_right",
            ViewAction::RotateLeft => "rotate_left",
            ViewAction::RotateRight => "rotate_right",
            ViewAction::MoreIterations => "more_iterations",
            ViewAction::FewerIterations => "fewer_iterations",
            ViewAction::Reset => "reset",
            ViewAction::Recall => "recall",
            ViewAction::Hold => "hold",
            ViewAction::Quit => "quit",
        }
    }

    pub fn from_config_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|action| action.config_name() == normalized)
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for ViewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

/// Set of actions active during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSet {
    bits: u16,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, action: ViewAction) {
        self.bits |= action.bit();
    }

    pub fn remove(&mut self, action: ViewAction) {
        self.bits &= !action.bit();
    }

    pub fn contains(&self, action: ViewAction) -> bool {
        self.bits & action.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl FromIterator<ViewAction> for ActionSet {
    fn from_iter<I: IntoIterator<Item = ViewAction>>(iter: I) -> Self {
        let mut set = Self::new();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

/// Per-second speeds for the actions that are not proportional to zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputRates {
    /// Radians per second.
    pub angular: f64,
    /// Iterations per second.
    pub iterations: f64,
}

impl Default for InputRates {
    fn default() -> Self {
        Self {
            angular: 2.0,
            iterations: 100.0,
        }
    }
}

/// Turns the active action set into changes of the target camera.
#[derive(Debug, Clone)]
pub struct InputMapper {
    rates: InputRates,
    defaults: ViewDefaults,
    preset: CameraPose,
}

impl InputMapper {
    pub fn new(rates: InputRates, defaults: ViewDefaults, preset: CameraPose) -> Self {
        Self {
            rates,
            defaults,
            preset,
        }
    }

    pub fn defaults(&self) -> &ViewDefaults {
        &self.defaults
    }

    pub fn preset(&self) -> &CameraPose {
        &self.preset
    }

    /// Applies one frame of input. Pan and zoom speed scale with the zoom the
    /// frame started with; panning follows the target rotation.
    pub fn apply(&self, state: &mut ViewState, actions: &ActionSet, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let step = dt * state.target.zoom;

        if actions.contains(ViewAction::ZoomIn) {
            state.target.zoom -= step.min(state.target.zoom * MAX_ZOOM_IN_FRACTION);
        }
        if actions.contains(ViewAction::ZoomOut) {
            state.target.zoom += step;
        }

        let (forward, right) = movement_basis(state.target.rotation);
        if actions.contains(ViewAction::Forward) {
            state.target.center += forward.scaled(step);
        }
        if actions.contains(ViewAction::Back) {
            state.target.center -= forward.scaled(step);
        }
        if actions.contains(ViewAction::StrafeRight) {
            state.target.center += right.scaled(step);
        }
        if actions.contains(ViewAction::StrafeLeft) {
            state.target.center -= right.scaled(step);
        }

        if actions.contains(ViewAction::MoreIterations) {
            state.target_iterations += dt * self.rates.iterations;
        }
        if actions.contains(ViewAction::FewerIterations) {
            state.target_iterations -= dt * self.rates.iterations;
        }

        if actions.contains(ViewAction::RotateLeft) {
            state.target.rotation += dt * self.rates.angular;
        }
        if actions.contains(ViewAction::RotateRight) {
            state.target.rotation -= dt * self.rates.angular;
        }
        state.target.rotation = wrap_angle(state.target.rotation);

        if actions.contains(ViewAction::Reset) {
            state.reset_to(&self.defaults);
        }
        if actions.contains(ViewAction::Recall) {
            state.recall(&self.preset);
        }
        if actions.contains(ViewAction::Hold) {
            state.hold();
        }

        state.clamp();
    }
}

impl Default for InputMapper {
    fn default() -> Self {
        Self::new(InputRates::default(), ViewDefaults::default(), DEFAULT_PRESET)
    }
}

/// Unit "forward" and "right" axes for a camera rotated by `rotation`.
pub fn movement_basis(rotation: f64) -> (Vec2, Vec2) {
    let (sin, cos) = rotation.sin_cos();
    (Vec2::new(cos, sin), Vec2::new(sin, -cos))
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;
    use crate::projection::{UniformProjector, ViewportAspect};
    use crate::smoothing::ParameterSmoother;
    use crate::view::{MIN_ITERATIONS, MIN_ZOOM};

    fn state_at(rotation: f64, zoom: f64) -> ViewState {
        let mut state = ViewState::default();
        state.target = CameraPose::new(Vec2::default(), rotation, zoom);
        state
    }

    fn only(action: ViewAction) -> ActionSet {
        [action].into_iter().collect()
    }

    #[test]
    fn forward_follows_rotation() {
        let mapper = InputMapper::default();

        let mut state = state_at(0.0, 1.0);
        mapper.apply(&mut state, &only(ViewAction::Forward), 0.5);
        assert!((state.target.center.x - 0.5).abs() < 1e-12);
        assert!(state.target.center.y.abs() < 1e-12);

        let mut state = state_at(FRAC_PI_2, 1.0);
        mapper.apply(&mut state, &only(ViewAction::Forward), 0.5);
        assert!(state.target.center.x.abs() < 1e-12);
        assert!((state.target.center.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn strafe_is_perpendicular_to_forward() {
        let mapper = InputMapper::default();
        let mut state = state_at(0.0, 2.0);
        mapper.apply(&mut state, &only(ViewAction::StrafeLeft), 0.25);
        assert!(state.target.center.x.abs() < 1e-12);
        assert!((state.target.center.y - 0.5).abs() < 1e-12);

        let mut state = state_at(0.0, 2.0);
        mapper.apply(&mut state, &only(ViewAction::StrafeRight), 0.25);
        assert!((state.target.center.y + 0.5).abs() < 1e-12);
    }

    #[test]
    fn zoom_rate_is_proportional_to_zoom() {
        let mapper = InputMapper::default();
        let mut state = state_at(0.0, 4.0);
        mapper.apply(&mut state, &only(ViewAction::ZoomIn), 0.1);
        assert!((state.target.zoom - 3.6).abs() < 1e-12);

        let mut state = state_at(0.0, 4.0);
        mapper.apply(&mut state, &only(ViewAction::ZoomOut), 0.1);
        assert!((state.target.zoom - 4.4).abs() < 1e-12);
    }

    #[test]
    fn zoom_stays_positive_after_a_stall() {
        let mapper = InputMapper::default();
        let mut state = state_at(0.0, 1.0);
        mapper.apply(&mut state, &only(ViewAction::ZoomIn), 5.0);
        assert!((state.target.zoom - 0.5).abs() < 1e-12);
    }

    #[test]
    fn stalled_zoom_in_still_reaches_the_gpu() {
        let mapper = InputMapper::default();
        let mut smoother = ParameterSmoother::default();
        let projector = UniformProjector;

        let mut state = state_at(0.0, 1e-29);
        state.displayed = state.target;
        for _ in 0..4 {
            mapper.apply(&mut state, &only(ViewAction::ZoomIn), 1.0);
            smoother.step(&mut state, 1.0);
        }
        assert_eq!(state.target.zoom, MIN_ZOOM);

        let aspect = ViewportAspect::from_size(3840, 1080).unwrap();
        let frame = projector.project(&state, aspect);
        for span in frame.zoom {
            assert!(span as f32 > 0.0, "span {span} rounds to zero in f32");
        }

        for _ in 0..300 {
            mapper.apply(&mut state, &only(ViewAction::ZoomOut), 1.0 / 60.0);
            smoother.step(&mut state, 1.0 / 60.0);
        }
        assert!(state.displayed.zoom > MIN_ZOOM * 10.0);
    }

    #[test]
    fn iterations_never_drop_below_floor() {
        let mapper = InputMapper::default();
        let mut state = ViewState::default();
        for _ in 0..50 {
            mapper.apply(&mut state, &only(ViewAction::FewerIterations), 0.5);
            assert!(state.target_iterations >= MIN_ITERATIONS);
        }
        assert_eq!(state.target_iterations, MIN_ITERATIONS);

        mapper.apply(&mut state, &only(ViewAction::MoreIterations), 0.01);
        assert!((state.target_iterations - 3.0).abs() < 1e-12);
    }

    #[test]
    fn rotation_keys_turn_at_fixed_rate() {
        let mapper = InputMapper::default();
        let mut state = state_at(0.0, 1.0);
        mapper.apply(&mut state, &only(ViewAction::RotateLeft), 0.25);
        assert!((state.target.rotation - 0.5).abs() < 1e-12);
        mapper.apply(&mut state, &only(ViewAction::RotateRight), 0.5);
        assert!((state.target.rotation + 0.5).abs() < 1e-12);
    }

    #[test]
    fn rotation_stays_bounded_over_long_sessions() {
        let mapper = InputMapper::default();
        let mut state = state_at(0.0, 1.0);
        let mut smoother = ParameterSmoother::default();
        let projector = UniformProjector;
        for _ in 0..100_000 {
            mapper.apply(&mut state, &only(ViewAction::RotateLeft), 1.0 / 60.0);
            smoother.step(&mut state, 1.0 / 60.0);
            assert!(state.displayed.rotation.abs() <= PI);
        }
        assert!(state.target.rotation.abs() <= PI);

        let frame = projector.project(&state, ViewportAspect::default());
        assert!(frame.rotation.abs() <= PI as f32);
    }

    #[test]
    fn reset_and_recall_use_their_own_poses() {
        let mapper = InputMapper::default();
        let mut state = state_at(1.0, 0.001);
        state.target_iterations = 777.0;

        mapper.apply(&mut state, &only(ViewAction::Recall), 0.016);
        assert_eq!(state.target, *mapper.preset());
        assert_eq!(state.target_iterations, 777.0);

        mapper.apply(&mut state, &only(ViewAction::Reset), 0.016);
        assert_eq!(state.target, mapper.defaults().pose);
        assert_eq!(state.target_iterations, mapper.defaults().iterations);
    }

    #[test]
    fn idle_frame_changes_nothing() {
        let mapper = InputMapper::default();
        let mut state = ViewState::default();
        let before = state.clone();
        mapper.apply(&mut state, &ActionSet::new(), 0.5);
        assert_eq!(state, before);
    }

    #[test]
    fn action_names_round_trip() {
        for action in ViewAction::ALL {
            assert_eq!(ViewAction::from_config_name(action.config_name()), Some(action));
        }
        assert_eq!(
            ViewAction::from_config_name("Strafe-Left"),
            Some(ViewAction::StrafeLeft)
        );
        assert_eq!(ViewAction::from_config_name("jump"), None);
    }
}
