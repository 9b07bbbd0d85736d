use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use dotgrid_lattice::GridConfig;

#[derive(Clone)]
pub struct SurfaceState {
    pub layout: Option<GridConfig>,
    pub last_frame_ts: Instant,
    pub frames: u64,
    pub recomputes: u64,
    pub pulse_batches: u64,
    pub pointer_present: bool,
    pub faults: Vec<String>,
}

impl Default for SurfaceState {
    fn default() -> Self {
        SurfaceState {
            layout: None,
            last_frame_ts: Instant::now(),
            frames: 0,
            recomputes: 0,
            pulse_batches: 0,
            pointer_present: false,
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<SurfaceState>>;

pub fn snapshot(bb: &Blackboard) -> SurfaceState {
    (*bb.read()).clone()
}

pub fn touch_frame(bb: &Blackboard) {
    let mut g = bb.write();
    g.frames += 1;
    g.last_frame_ts = Instant::now();
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

pub fn clear_fault(bb: &Blackboard, msg: &str) {
    bb.write().faults.retain(|s| s != msg);
}
