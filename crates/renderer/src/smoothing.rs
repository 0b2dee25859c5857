use crate::view::{wrap_angle, ViewState, MIN_ZOOM};

/// Decay constants (per second) for the two smoothed parameter groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayRates {
    /// Applied to the center.
    pub position: f64,
    /// Applied to rotation and zoom.
    pub orientation: f64,
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            position: 2.0,
            orientation: 1.5,
        }
    }
}

/// Moves the displayed camera a frame closer to the target camera.
///
/// Each field follows `displayed += (target - displayed) * min(dt * rate, 1)`,
/// a first-order low-pass that cannot overshoot and lands exactly on the
/// target once `dt * rate` reaches one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterSmoother {
    rates: DecayRates,
}

impl ParameterSmoother {
    pub fn new(rates: DecayRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> DecayRates {
        self.rates
    }

    pub fn step(&self, state: &mut ViewState, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let position_t = blend_factor(dt, self.rates.position);
        let orientation_t = blend_factor(dt, self.rates.orientation);

        let displayed = &mut state.displayed;
        let target = &state.target;
        displayed.center.x = approach(displayed.center.x, target.center.x, position_t);
        displayed.center.y = approach(displayed.center.y, target.center.y, position_t);
        displayed.zoom = approach(displayed.zoom, target.zoom, orientation_t).max(MIN_ZOOM);
        displayed.rotation = approach_angle(displayed.rotation, target.rotation, orientation_t);
    }
}

fn blend_factor(dt: f64, rate: f64) -> f64 {
    let rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
    (dt * rate).min(1.0)
}

/// Linear interpolation that returns `target` bit-for-bit once `t` saturates.
pub fn approach(current: f64, target: f64, t: f64) -> f64 {
    if t >= 1.0 {
        target
    } else {
        current + (target - current) * t
    }
}

/// Like [`approach`] but travels the short way around the circle.
fn approach_angle(current: f64, target: f64, t: f64) -> f64 {
    if t >= 1.0 {
        return target;
    }
    let delta = wrap_angle(target - current);
    if delta == 0.0 {
        return current;
    }
    wrap_angle(current + delta * t)
}
