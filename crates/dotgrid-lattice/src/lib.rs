#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for a pointer-reactive dot lattice."]
#![doc = ""]
#![doc = "This crate provides the lattice presets and their viewport breakpoint,"]
#![doc = "pointer tracking in surface-local coordinates, pulse sets, and the pure"]
#![doc = "function mapping pointer distance and pulse membership to a point's scale,"]
#![doc = "opacity and emphasis."]

use core::fmt;
use libm::sqrtf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub mod frame;
pub mod pulse_set;
pub mod transition;

pub use error::LatticeError;
pub use frame::FrameCache;
pub use pulse_set::PulseSet;
pub use transition::{AnimatedPoint, AnimatedValue, CubicBezier};

/// Viewport width (px) at which the lattice switches from the compact to the standard preset.
pub const BREAKPOINT_WIDTH: f32 = 768.0;
/// Distance (px) below which a point counts as hovered. Strict: a point exactly
/// at this distance is not hovered.
pub const INTERACTION_RADIUS: f32 = 120.0;
/// Scale of a point directly under the pointer.
pub const HOVER_PEAK_SCALE: f32 = 1.8;
/// Scale lost between the pointer center and the interaction radius.
pub const HOVER_FALLOFF: f32 = 0.8;
/// Scale of a pulsing, non-hovered point.
pub const PULSE_SCALE: f32 = 1.5;
/// Opacity of a pulsing, non-hovered point.
pub const PULSE_OPACITY: f32 = 0.8;
/// Opacity of a dormant point.
pub const IDLE_OPACITY: f32 = 0.15;
/// Base radius (px) of a point before scaling.
pub const DOT_RADIUS: f32 = 2.0;

/// One of the two fixed lattice layouts.
///
/// The fields are private: the only values that exist are [`GridConfig::COMPACT`]
/// and [`GridConfig::STANDARD`]. Deserialization rejects any other shape.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "GridShape"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    rows: u16,
    cols: u16,
    spacing: f32,
}

impl GridConfig {
    /// 9×9 lattice with 24px spacing, used below [`BREAKPOINT_WIDTH`].
    pub const COMPACT: GridConfig = GridConfig { rows: 9, cols: 9, spacing: 24.0 };
    /// 12×12 lattice with 28px spacing, used at or above [`BREAKPOINT_WIDTH`].
    pub const STANDARD: GridConfig = GridConfig { rows: 12, cols: 12, spacing: 28.0 };

    /// Select the preset for a viewport width in pixels.
    ///
    /// # Arguments
    ///
    /// * `width`: Current viewport width in logical pixels.
    pub fn for_viewport(width: f32) -> Self {
        if width < BREAKPOINT_WIDTH {
            GridConfig::COMPACT
        } else {
            GridConfig::STANDARD
        }
    }

    /// Look up the preset with the given dimensions.
    ///
    /// # Errors
    ///
    /// Returns `Err(LatticeError::UnknownPreset)` unless the dimensions match
    /// [`GridConfig::COMPACT`] or [`GridConfig::STANDARD`] exactly.
    pub fn from_dimensions(rows: u16, cols: u16, spacing: f32) -> Result<Self, LatticeError> {
        let candidate = GridConfig { rows, cols, spacing };
        [GridConfig::COMPACT, GridConfig::STANDARD]
            .into_iter()
            .find(|preset| *preset == candidate)
            .ok_or(LatticeError::UnknownPreset("dimensions match neither preset"))
    }

    /// Number of rows.
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    /// Number of columns.
    pub const fn cols(&self) -> u16 {
        self.cols
    }

    /// Distance between neighbouring point centers (px).
    pub const fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Total number of points, `rows × cols`.
    pub const fn point_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Surface dimensions `(width, height)` in pixels.
    pub fn surface_size(&self) -> (f32, f32) {
        (self.cols as f32 * self.spacing, self.rows as f32 * self.spacing)
    }

    /// Surface-local center of the point at `(row, col)`.
    pub fn center(&self, row: u16, col: u16) -> (f32, f32) {
        let half = self.spacing / 2.0;
        (col as f32 * self.spacing + half, row as f32 * self.spacing + half)
    }

    /// Flat index `row × cols + col` of a point.
    ///
    /// # Errors
    ///
    /// Returns `Err(LatticeError::IndexOutOfBounds)` if `row` or `col` lies outside the preset.
    pub fn index(&self, row: u16, col: u16) -> Result<usize, LatticeError> {
        if row >= self.rows || col >= self.cols {
            return Err(LatticeError::IndexOutOfBounds("row or column outside the lattice"));
        }
        Ok(row as usize * self.cols as usize + col as usize)
    }

    /// Inverse of [`GridConfig::index`].
    ///
    /// # Errors
    ///
    /// Returns `Err(LatticeError::IndexOutOfBounds)` if `index >= point_count()`.
    pub fn locate(&self, index: usize) -> Result<(u16, u16), LatticeError> {
        if index >= self.point_count() {
            return Err(LatticeError::IndexOutOfBounds("flat index outside the lattice"));
        }
        let cols = self.cols as usize;
        Ok(((index / cols) as u16, (index % cols) as u16))
    }

    /// Iterate `(index, row, col)` in row-major order.
    pub fn points(&self) -> impl Iterator<Item = (usize, u16, u16)> + use<> {
        let cols = self.cols as usize;
        (0..self.point_count()).map(move |i| (i, (i / cols) as u16, (i % cols) as u16))
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct GridShape {
    rows: u16,
    cols: u16,
    spacing: f32,
}

#[cfg(feature = "serde")]
impl TryFrom<GridShape> for GridConfig {
    type Error = LatticeError;

    fn try_from(shape: GridShape) -> Result<Self, Self::Error> {
        GridConfig::from_dimensions(shape.rows, shape.cols, shape.spacing)
    }
}

impl fmt::Display for GridConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} @ {:.0}px", self.rows, self.cols, self.spacing)
    }
}

/// Re-selects the preset as the viewport width changes.
#[derive(Debug, Clone, Default)]
pub struct LayoutSelector {
    current: Option<GridConfig>,
}

impl LayoutSelector {
    /// Construct a selector with no preset chosen yet.
    pub const fn new() -> Self {
        LayoutSelector { current: None }
    }

    /// Feed the current viewport width.
    ///
    /// Returns `Some(preset)` when the selection differs from the previous one
    /// (always on the first call) and `None` otherwise.
    pub fn observe(&mut self, width: f32) -> Option<GridConfig> {
        let selected = GridConfig::for_viewport(width);
        if self.current == Some(selected) {
            return None;
        }
        self.current = Some(selected);
        Some(selected)
    }

    /// The preset chosen by the last call to [`LayoutSelector::observe`].
    pub fn current(&self) -> Option<GridConfig> {
        self.current
    }

    /// Forget the current selection, so the next observation reports a preset again.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Pointer position in surface-local pixels.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    /// Surface-local x (px).
    pub x: f32,
    /// Surface-local y (px).
    pub y: f32,
}

impl PointerState {
    /// No pointer over the surface. Far enough off-surface that every point of
    /// either preset lies outside [`INTERACTION_RADIUS`].
    pub const AWAY: PointerState = PointerState { x: -1000.0, y: -1000.0 };

    /// Construct a pointer state at surface-local `(x, y)`.
    pub const fn at(x: f32, y: f32) -> Self {
        PointerState { x, y }
    }

    /// Whether this is the [`PointerState::AWAY`] sentinel.
    pub fn is_away(&self) -> bool {
        *self == PointerState::AWAY
    }

    /// Euclidean distance to a surface-local point.
    pub fn distance_to(&self, (px, py): (f32, f32)) -> f32 {
        let dx = px - self.x;
        let dy = py - self.y;
        sqrtf(dx * dx + dy * dy)
    }
}

impl Default for PointerState {
    fn default() -> Self {
        PointerState::AWAY
    }
}

impl fmt::Display for PointerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_away() {
            write!(f, "(away)")
        } else {
            write!(f, "(x: {:.1}, y: {:.1})", self.x, self.y)
        }
    }
}

/// Converts window pointer coordinates into a surface-local [`PointerState`].
///
/// Until a preset is mounted every call is a no-op.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    config: Option<GridConfig>,
    state: PointerState,
}

impl PointerTracker {
    /// Construct an unmounted tracker.
    pub const fn new() -> Self {
        PointerTracker { config: None, state: PointerState::AWAY }
    }

    /// Attach to a preset; the surface bounds follow its [`GridConfig::surface_size`].
    pub fn mount(&mut self, config: GridConfig) {
        self.config = Some(config);
    }

    /// Detach and forget the pointer.
    pub fn unmount(&mut self) {
        self.config = None;
        self.state = PointerState::AWAY;
    }

    /// The current pointer state.
    pub fn state(&self) -> PointerState {
        self.state
    }

    /// Handle a pointer move.
    ///
    /// # Arguments
    ///
    /// * `client_x`, `client_y`: Pointer position in window coordinates.
    /// * `origin`: Window position of the surface's top-left corner.
    ///
    /// # Returns
    ///
    /// Whether the stored state changed. A move outside the surface is handled
    /// as a pointer-leave.
    pub fn on_move(&mut self, client_x: f32, client_y: f32, origin: (f32, f32)) -> bool {
        let Some(config) = self.config else {
            return false;
        };
        let (w, h) = config.surface_size();
        let x = client_x - origin.0;
        let y = client_y - origin.1;
        let next = if x >= 0.0 && y >= 0.0 && x < w && y < h {
            PointerState::at(x, y)
        } else {
            PointerState::AWAY
        };
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// Handle a pointer leaving the surface. Returns whether the state changed.
    pub fn on_leave(&mut self) -> bool {
        if self.config.is_none() {
            return false;
        }
        let changed = !self.state.is_away();
        self.state = PointerState::AWAY;
        changed
    }
}

/// Render-time appearance of one point.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointVisual {
    /// Multiplier applied to [`DOT_RADIUS`].
    pub scale: f32,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Drawn in the accent color instead of the base color.
    pub emphasized: bool,
}

impl PointVisual {
    /// Appearance of a point that is neither hovered nor pulsing.
    pub const IDLE: PointVisual = PointVisual { scale: 1.0, opacity: IDLE_OPACITY, emphasized: false };
}

impl Default for PointVisual {
    fn default() -> Self {
        PointVisual::IDLE
    }
}

/// Compute the appearance of the point at `(row, col)`.
///
/// Hover wins over pulsing. A hovered point scales from [`HOVER_PEAK_SCALE`] at the
/// pointer down to `1.0` at [`INTERACTION_RADIUS`]; a pulsing point is fixed at
/// [`PULSE_SCALE`].
///
/// # Arguments
///
/// * `index`: Flat index of the point, `row × cols + col`.
/// * `row`, `col`: Lattice coordinates of the point.
/// * `config`: The mounted preset.
/// * `pointer`: Current pointer state.
/// * `pulses`: Currently pulsing indices.
pub fn point_visual(
    index: usize,
    row: u16,
    col: u16,
    config: &GridConfig,
    pointer: &PointerState,
    pulses: &PulseSet,
) -> PointVisual {
    let d = pointer.distance_to(config.center(row, col));
    let hovered = d < INTERACTION_RADIUS;
    let pulsing = pulses.contains(index);

    let (scale, opacity) = if hovered {
        (HOVER_PEAK_SCALE - (d / INTERACTION_RADIUS) * HOVER_FALLOFF, 1.0)
    } else if pulsing {
        (PULSE_SCALE, PULSE_OPACITY)
    } else {
        (1.0, IDLE_OPACITY)
    };

    PointVisual { scale, opacity, emphasized: hovered || pulsing }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn visual_at(config: &GridConfig, row: u16, col: u16, pointer: PointerState, pulses: &PulseSet) -> PointVisual {
        let index = config.index(row, col).unwrap();
        point_visual(index, row, col, config, &pointer, pulses)
    }

    #[test]
    fn test_preset_selection_is_two_valued() {
        for w in [0.0, 320.0, 767.0, 767.99] {
            assert_eq!(GridConfig::for_viewport(w), GridConfig::COMPACT);
        }
        for w in [768.0, 768.01, 1024.0, 3840.0] {
            assert_eq!(GridConfig::for_viewport(w), GridConfig::STANDARD);
        }
    }

    #[test]
    fn test_preset_selection_is_monotonic() {
        let mut seen_standard = false;
        for w in 0..2000 {
            let config = GridConfig::for_viewport(w as f32);
            assert!(config == GridConfig::COMPACT || config == GridConfig::STANDARD);
            if config == GridConfig::STANDARD {
                seen_standard = true;
            } else {
                assert!(!seen_standard, "compact preset selected above the breakpoint at {w}");
            }
        }
    }

    #[test]
    fn test_preset_geometry() {
        assert_eq!(GridConfig::COMPACT.point_count(), 81);
        assert_eq!(GridConfig::STANDARD.point_count(), 144);
        assert_eq!(GridConfig::COMPACT.surface_size(), (216.0, 216.0));
        assert_eq!(GridConfig::STANDARD.surface_size(), (336.0, 336.0));
        assert_eq!(GridConfig::STANDARD.center(0, 0), (14.0, 14.0));
        assert_eq!(GridConfig::STANDARD.center(2, 5), (154.0, 70.0));
    }

    #[test]
    fn test_from_dimensions_accepts_only_presets() {
        assert_eq!(GridConfig::from_dimensions(9, 9, 24.0), Ok(GridConfig::COMPACT));
        assert_eq!(GridConfig::from_dimensions(12, 12, 28.0), Ok(GridConfig::STANDARD));
        assert!(matches!(GridConfig::from_dimensions(20, 20, 5.0), Err(LatticeError::UnknownPreset(_))));
        assert!(GridConfig::from_dimensions(12, 12, 24.0).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_non_preset() {
        let standard = serde_json::to_string(&GridConfig::STANDARD).unwrap();
        assert_eq!(serde_json::from_str::<GridConfig>(&standard).unwrap(), GridConfig::STANDARD);

        let rogue = serde_json::from_str::<GridConfig>(r#"{"rows":20,"cols":20,"spacing":5.0}"#);
        assert!(rogue.is_err());
    }

    #[test]
    fn test_index_and_locate() {
        let config = GridConfig::STANDARD;
        assert_eq!(config.index(1, 3), Ok(15));
        assert_eq!(config.locate(15), Ok((1, 3)));
        assert!(matches!(config.index(12, 0), Err(LatticeError::IndexOutOfBounds(_))));
        assert!(matches!(config.locate(144), Err(LatticeError::IndexOutOfBounds(_))));
        assert_eq!(config.points().count(), 144);
        assert_eq!(config.points().last(), Some((143, 11, 11)));
    }

    #[test]
    fn test_layout_selector_reports_changes_only() {
        let mut selector = LayoutSelector::new();
        assert_eq!(selector.observe(1024.0), Some(GridConfig::STANDARD));
        assert_eq!(selector.observe(1100.0), None);
        assert_eq!(selector.observe(500.0), Some(GridConfig::COMPACT));
        assert_eq!(selector.observe(767.0), None);
        assert_eq!(selector.observe(768.0), Some(GridConfig::STANDARD));
        selector.reset();
        assert_eq!(selector.observe(768.0), Some(GridConfig::STANDARD));
    }

    #[test]
    fn test_visual_at_pointer_center() {
        let config = GridConfig::STANDARD;
        let (cx, cy) = config.center(3, 4);
        let v = visual_at(&config, 3, 4, PointerState::at(cx, cy), &PulseSet::new());
        assert!((v.scale - 1.8).abs() < EPSILON);
        assert!((v.opacity - 1.0).abs() < EPSILON);
        assert!(v.emphasized);
    }

    #[test]
    fn test_hover_radius_boundary_is_strict() {
        let config = GridConfig::STANDARD;
        // Point (0, 0) sits at (14, 14).
        let inside = visual_at(&config, 0, 0, PointerState::at(14.0 + 119.999, 14.0), &PulseSet::new());
        assert!(inside.emphasized);
        assert!((inside.opacity - 1.0).abs() < EPSILON);
        assert!((inside.scale - 1.0).abs() < 1e-3);

        let edge = visual_at(&config, 0, 0, PointerState::at(14.0 + 120.0, 14.0), &PulseSet::new());
        assert_eq!(edge, PointVisual::IDLE);
    }

    #[test]
    fn test_hover_falloff_is_linear() {
        let config = GridConfig::STANDARD;
        let v = visual_at(&config, 0, 0, PointerState::at(14.0 + 60.0, 14.0), &PulseSet::new());
        // 1.8 - 0.5 * 0.8
        assert!((v.scale - 1.4).abs() < EPSILON);
    }

    #[test]
    fn test_pulsing_point_outside_hover() {
        let config = GridConfig::STANDARD;
        let mut pulses = PulseSet::new();
        pulses.insert(config.index(5, 5).unwrap(), config.point_count()).unwrap();
        let v = visual_at(&config, 5, 5, PointerState::AWAY, &pulses);
        assert!((v.scale - 1.5).abs() < EPSILON);
        assert!((v.opacity - 0.8).abs() < EPSILON);
        assert!(v.emphasized);
    }

    #[test]
    fn test_hover_takes_precedence_over_pulse() {
        let config = GridConfig::STANDARD;
        let mut pulses = PulseSet::new();
        pulses.insert(config.index(5, 5).unwrap(), config.point_count()).unwrap();
        let (cx, cy) = config.center(5, 5);
        let v = visual_at(&config, 5, 5, PointerState::at(cx + 30.0, cy), &pulses);
        // 1.8 - 0.25 * 0.8
        assert!((v.scale - 1.6).abs() < EPSILON);
        assert!((v.opacity - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_visual_is_idempotent() {
        let config = GridConfig::COMPACT;
        let mut pulses = PulseSet::new();
        pulses.insert(7, config.point_count()).unwrap();
        let pointer = PointerState::at(40.0, 55.5);
        for (index, row, col) in config.points() {
            let a = point_visual(index, row, col, &config, &pointer, &pulses);
            let b = point_visual(index, row, col, &config, &pointer, &pulses);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_pointer_away_hovers_nothing() {
        for config in [GridConfig::COMPACT, GridConfig::STANDARD] {
            for (index, row, col) in config.points() {
                assert!(PointerState::AWAY.distance_to(config.center(row, col)) > INTERACTION_RADIUS);
                let v = point_visual(index, row, col, &config, &PointerState::AWAY, &PulseSet::new());
                assert_eq!(v, PointVisual::IDLE);
            }
        }
    }

    #[test]
    fn test_tracker_ignores_events_before_mount() {
        let mut tracker = PointerTracker::new();
        assert!(!tracker.on_move(10.0, 10.0, (0.0, 0.0)));
        assert!(!tracker.on_leave());
        assert!(tracker.state().is_away());
    }

    #[test]
    fn test_tracker_local_coordinates_and_leave() {
        let mut tracker = PointerTracker::new();
        tracker.mount(GridConfig::STANDARD);
        let origin = (100.0, 50.0);

        assert!(tracker.on_move(150.0, 80.0, origin));
        assert_eq!(tracker.state(), PointerState::at(50.0, 30.0));
        assert!(!tracker.on_move(150.0, 80.0, origin));

        // Past the right edge: 100 + 336.
        assert!(tracker.on_move(436.0, 80.0, origin));
        assert!(tracker.state().is_away());

        tracker.on_move(120.0, 60.0, origin);
        assert!(tracker.on_leave());
        assert!(tracker.state().is_away());
        assert!(!tracker.on_leave());
    }

    #[test]
    fn test_tracker_unmount_forgets_pointer() {
        let mut tracker = PointerTracker::new();
        tracker.mount(GridConfig::COMPACT);
        tracker.on_move(5.0, 5.0, (0.0, 0.0));
        tracker.unmount();
        assert!(tracker.state().is_away());
        assert!(!tracker.on_move(5.0, 5.0, (0.0, 0.0)));
    }

    #[test]
    fn test_desktop_center_scenario() {
        let mut selector = LayoutSelector::new();
        let config = selector.observe(1024.0).unwrap();
        assert_eq!(config, GridConfig::STANDARD);

        let mut tracker = PointerTracker::new();
        tracker.mount(config);
        let (w, h) = config.surface_size();
        tracker.on_move(w / 2.0, h / 2.0, (0.0, 0.0));
        let pointer = tracker.state();
        let pulses = PulseSet::new();

        for (row, col) in [(5, 5), (5, 6), (6, 5), (6, 6)] {
            let v = visual_at(&config, row, col, pointer, &pulses);
            assert!(v.scale > 1.0);
            assert!((v.opacity - 1.0).abs() < EPSILON);
        }
        for (row, col) in [(0, 0), (0, 11), (11, 0), (11, 11)] {
            let v = visual_at(&config, row, col, pointer, &pulses);
            assert!((v.scale - 1.0).abs() < EPSILON);
            assert!((v.opacity - 0.15).abs() < EPSILON);
        }
    }
}
