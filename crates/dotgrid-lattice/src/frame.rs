//! Value-keyed cache of per-point visuals.

use crate::pulse_set::CAPACITY;
use crate::{GridConfig, PointVisual, PointerState, PulseSet, point_visual};

type FrameKey = (GridConfig, PointerState, PulseSet);

/// Per-point visuals for the last `(GridConfig, PointerState, PulseSet)` tuple.
///
/// [`FrameCache::update`] recomputes only when the tuple differs by value from
/// the cached one.
#[derive(Debug, Clone)]
pub struct FrameCache {
    key: Option<FrameKey>,
    visuals: [PointVisual; CAPACITY],
    len: usize,
    recomputes: u64,
}

impl FrameCache {
    /// Construct an empty cache.
    pub const fn new() -> Self {
        FrameCache { key: None, visuals: [PointVisual::IDLE; CAPACITY], len: 0, recomputes: 0 }
    }

    /// Bring the cache up to date with the given inputs.
    ///
    /// Returns `true` if the visuals were recomputed.
    pub fn update(&mut self, config: GridConfig, pointer: PointerState, pulses: PulseSet) -> bool {
        let key = (config, pointer, pulses);
        if self.key == Some(key) {
            return false;
        }

        self.len = config.point_count().min(CAPACITY);
        for (index, row, col) in config.points().take(self.len) {
            self.visuals[index] = point_visual(index, row, col, &config, &pointer, &pulses);
        }
        self.key = Some(key);
        self.recomputes += 1;
        true
    }

    /// Visuals of the cached frame, in row-major order.
    pub fn visuals(&self) -> &[PointVisual] {
        &self.visuals[..self.len]
    }

    /// Preset of the cached frame.
    pub fn config(&self) -> Option<GridConfig> {
        self.key.map(|(config, _, _)| config)
    }

    /// Number of recomputes since construction.
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    /// Drop the cached frame; the next update always recomputes.
    pub fn invalidate(&mut self) {
        self.key = None;
        self.len = 0;
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        FrameCache::new()
    }
}
