//! Eased transitions between successive point visuals.
//!
//! A point does not jump to a new [`PointVisual`]; its displayed scale, opacity
//! and tint each ease toward the target over [`TRANSITION_SECS`].

use libm::fabsf;

use crate::{IDLE_OPACITY, PointVisual};

/// Duration of one point transition (s).
pub const TRANSITION_SECS: f32 = 0.3;

const NEWTON_ITERATIONS: usize = 8;
const BISECT_ITERATIONS: usize = 32;
const SOLVE_EPSILON: f32 = 1e-6;

/// CSS-style cubic Bézier timing curve through `(0, 0)`, `(x1, y1)`, `(x2, y2)`, `(1, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl CubicBezier {
    /// `cubic-bezier(0.25, 0.46, 0.45, 0.94)`, an ease-out-quad approximation.
    pub const EASE_OUT_QUAD: CubicBezier = CubicBezier::new(0.25, 0.46, 0.45, 0.94);

    /// Construct a curve. `x1` and `x2` are expected within `[0, 1]`.
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        CubicBezier { x1, y1, x2, y2 }
    }

    fn coefficients(p1: f32, p2: f32) -> (f32, f32, f32) {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        let a = 1.0 - c - b;
        (a, b, c)
    }

    fn sample(p1: f32, p2: f32, t: f32) -> f32 {
        let (a, b, c) = Self::coefficients(p1, p2);
        ((a * t + b) * t + c) * t
    }

    fn sample_derivative(p1: f32, p2: f32, t: f32) -> f32 {
        let (a, b, c) = Self::coefficients(p1, p2);
        (3.0 * a * t + 2.0 * b) * t + c
    }

    // Curve parameter t whose x equals `x`: Newton first, bisection if it stalls.
    fn solve_t(&self, x: f32) -> f32 {
        let mut t = x;
        for _ in 0..NEWTON_ITERATIONS {
            let err = Self::sample(self.x1, self.x2, t) - x;
            if fabsf(err) < SOLVE_EPSILON {
                return t;
            }
            let d = Self::sample_derivative(self.x1, self.x2, t);
            if fabsf(d) < SOLVE_EPSILON {
                break;
            }
            t -= err / d;
        }

        let (mut lo, mut hi) = (0.0, 1.0);
        t = x;
        for _ in 0..BISECT_ITERATIONS {
            let sx = Self::sample(self.x1, self.x2, t);
            if fabsf(sx - x) < SOLVE_EPSILON {
                break;
            }
            if x > sx {
                lo = t;
            } else {
                hi = t;
            }
            t = lo + (hi - lo) / 2.0;
        }
        t
    }

    /// Map progress `x ∈ [0, 1]` to eased progress. Inputs outside the range are clamped.
    pub fn ease(&self, x: f32) -> f32 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        Self::sample(self.y1, self.y2, self.solve_t(x))
    }
}

/// A scalar easing from one value to a target over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedValue {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
    curve: CubicBezier,
}

impl AnimatedValue {
    /// Construct a value settled at `value`.
    ///
    /// # Arguments
    ///
    /// * `value`: Initial and target value.
    /// * `duration`: Transition length in seconds. Non-positive durations snap.
    pub const fn new(value: f32, duration: f32) -> Self {
        AnimatedValue { from: value, to: value, elapsed: duration, duration, curve: CubicBezier::EASE_OUT_QUAD }
    }

    /// The displayed value.
    pub fn value(&self) -> f32 {
        if self.duration <= 0.0 || self.elapsed >= self.duration {
            return self.to;
        }
        let progress = self.curve.ease(self.elapsed / self.duration);
        self.from + (self.to - self.from) * progress
    }

    /// The value being eased toward.
    pub fn target(&self) -> f32 {
        self.to
    }

    /// Start easing from the displayed value toward `to`. Retargeting to the
    /// current target leaves the transition untouched.
    pub fn retarget(&mut self, to: f32) {
        if fabsf(to - self.to) < f32::EPSILON {
            return;
        }
        self.from = self.value();
        self.to = to;
        self.elapsed = 0.0;
    }

    /// Advance time by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if dt > 0.0 {
            self.elapsed = (self.elapsed + dt).min(self.duration);
        }
    }

    /// Whether the value has reached its target.
    pub fn is_settled(&self) -> bool {
        self.duration <= 0.0 || self.elapsed >= self.duration
    }
}

/// Displayed state of one point, eased toward its latest [`PointVisual`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedPoint {
    scale: AnimatedValue,
    opacity: AnimatedValue,
    tint: AnimatedValue,
}

impl AnimatedPoint {
    /// A point settled at [`PointVisual::IDLE`].
    pub const fn idle() -> Self {
        AnimatedPoint {
            scale: AnimatedValue::new(1.0, TRANSITION_SECS),
            opacity: AnimatedValue::new(IDLE_OPACITY, TRANSITION_SECS),
            tint: AnimatedValue::new(0.0, TRANSITION_SECS),
        }
    }

    /// Ease toward `visual`. Emphasis maps to tint `1.0`, otherwise `0.0`.
    pub fn retarget(&mut self, visual: &PointVisual) {
        self.scale.retarget(visual.scale);
        self.opacity.retarget(visual.opacity);
        self.tint.retarget(if visual.emphasized { 1.0 } else { 0.0 });
    }

    /// Advance all three channels by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.scale.advance(dt);
        self.opacity.advance(dt);
        self.tint.advance(dt);
    }

    /// Displayed scale.
    pub fn scale(&self) -> f32 {
        self.scale.value()
    }

    /// Displayed opacity.
    pub fn opacity(&self) -> f32 {
        self.opacity.value()
    }

    /// Displayed tint, `0.0` for base color through `1.0` for accent.
    pub fn tint(&self) -> f32 {
        self.tint.value()
    }

    /// Whether every channel has reached its target.
    pub fn is_settled(&self) -> bool {
        self.scale.is_settled() && self.opacity.is_settled() && self.tint.is_settled()
    }
}

impl Default for AnimatedPoint {
    fn default() -> Self {
        AnimatedPoint::idle()
    }
}
