use tokio::sync::watch;
use tracing::{debug, info};

use dotgrid_lattice::{AnimatedPoint, FrameCache, GridConfig, LayoutSelector, PointerState, PointerTracker, PulseSet};
use dotgrid_pulse::PulseEvent;

use crate::blackboard::Blackboard;

/// Render-side state of the lattice: preset, pointer, pulses and the eased
/// per-point visuals. Owned by the render loop.
pub struct Surface {
    selector: LayoutSelector,
    tracker: PointerTracker,
    frame: FrameCache,
    pulses: PulseSet,
    points: Vec<AnimatedPoint>,
    layout_tx: watch::Sender<Option<GridConfig>>,
    bb: Blackboard,
}

impl Surface {
    pub fn new(layout_tx: watch::Sender<Option<GridConfig>>, bb: Blackboard) -> Self {
        Surface {
            selector: LayoutSelector::new(),
            tracker: PointerTracker::new(),
            frame: FrameCache::new(),
            pulses: PulseSet::new(),
            points: Vec::new(),
            layout_tx,
            bb,
        }
    }

    pub fn layout(&self) -> Option<GridConfig> {
        self.selector.current()
    }

    pub fn pointer(&self) -> PointerState {
        self.tracker.state()
    }

    pub fn pulses(&self) -> PulseSet {
        self.pulses
    }

    /// Surface-local centers paired with their displayed state.
    pub fn points(&self) -> impl Iterator<Item = ((f32, f32), &AnimatedPoint)> + '_ {
        self.layout()
            .into_iter()
            .flat_map(|layout| layout.points().map(move |(_, row, col)| layout.center(row, col)))
            .zip(self.points.iter())
    }

    /// Window position of the surface's top-left corner, centering it in the window.
    pub fn origin(&self, screen_w: f32, screen_h: f32) -> (f32, f32) {
        match self.layout() {
            Some(layout) => {
                let (w, h) = layout.surface_size();
                ((screen_w - w) / 2.0, (screen_h - h) / 2.0)
            }
            None => (0.0, 0.0),
        }
    }

    /// Re-select the preset for `width`, re-laying out the lattice when it changes.
    /// Returns whether a new preset was mounted.
    pub fn observe_viewport(&mut self, width: f32) -> bool {
        let Some(layout) = self.selector.observe(width) else {
            return false;
        };

        self.tracker.mount(layout);
        self.frame.invalidate();
        self.pulses.clear();
        self.points.clear();
        self.points.resize(layout.point_count(), AnimatedPoint::idle());
        self.layout_tx.send_replace(Some(layout));
        self.bb.write().layout = Some(layout);
        info!(%layout, width, "Lattice laid out");
        true
    }

    /// Feed the window-space cursor position.
    ///
    /// macroquad keeps reporting the last position after the cursor leaves the
    /// window, so a position on or past the window edge counts as a leave.
    pub fn track_pointer(&mut self, client_x: f32, client_y: f32, origin: (f32, f32), window: (f32, f32)) -> bool {
        let inside = client_x > 0.0 && client_y > 0.0 && client_x < window.0 - 1.0 && client_y < window.1 - 1.0;
        let changed = if inside {
            self.tracker.on_move(client_x, client_y, origin)
        } else {
            self.tracker.on_leave()
        };
        if changed {
            self.bb.write().pointer_present = !self.tracker.state().is_away();
        }
        changed
    }

    /// Apply a pulse event. Returns whether the visible pulse set changed.
    ///
    /// A batch drawn against a different preset than the mounted one (a resize
    /// raced the tick) is discarded.
    pub fn apply_pulse_event(&mut self, event: &PulseEvent) -> bool {
        let Some(current) = self.layout() else {
            debug!("Pulse event ignored; surface not mounted.");
            return false;
        };

        match event {
            PulseEvent::Batch { layout, pulses } => {
                if *layout != current || !pulses.fits_within(current.point_count()) {
                    debug!(%layout, %current, "Stale pulse batch discarded.");
                    return false;
                }
                self.pulses = *pulses;
                self.bb.write().pulse_batches += 1;
                true
            }
            PulseEvent::Clear => {
                let had_pulses = !self.pulses.is_empty();
                self.pulses.clear();
                had_pulses
            }
        }
    }

    /// Recompute targets if any input changed, then advance every transition by `dt` seconds.
    pub fn refresh(&mut self, dt: f32) {
        let Some(layout) = self.layout() else {
            return;
        };

        if self.frame.update(layout, self.tracker.state(), self.pulses) {
            for (point, visual) in self.points.iter_mut().zip(self.frame.visuals()) {
                point.retarget(visual);
            }
            self.bb.write().recomputes = self.frame.recomputes();
        }
        for point in &mut self.points {
            point.advance(dt);
        }
    }

    pub fn unmount(&mut self) {
        self.selector.reset();
        self.tracker.unmount();
        self.frame.invalidate();
        self.pulses.clear();
        self.points.clear();
        self.layout_tx.send_replace(None);
        {
            let mut g = self.bb.write();
            g.layout = None;
            g.pointer_present = false;
        }
        info!("Lattice unmounted");
    }
}
