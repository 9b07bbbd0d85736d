mod blackboard; // shared surface telemetry
mod bus; // broadcast topics
mod config; // settings file + environment overlay
mod graphics; // macroquad window and render loop
mod surface; // render-side lattice state

use blackboard::{Blackboard, clear_fault, raise_fault, snapshot};
use bus::Topic;
use crate::config::{DEFAULT_CONFIG_PATH, LoadOutcome};
use graphics::window_conf;
use surface::Surface;

use dotgrid_lattice::GridConfig;
use dotgrid_pulse::{PulseEvent, run_pulse_task};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

const STALL_THRESHOLD: Duration = Duration::from_millis(500);
const STALL_FAULT: &str = "render loop stalled";

#[macroquad::main(window_conf)]
async fn main() {
    let settings = crate::config::settings();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.filter)))
        .init();

    match crate::config::load_outcome() {
        LoadOutcome::Loaded => info!("Configuration loaded from {} and the DOTGRID_ environment.", DEFAULT_CONFIG_PATH),
        LoadOutcome::Defaulted(e) => warn!("Configuration could not be loaded ({}); running with defaults.", e),
    }
    info!(?settings, "dotgrid started. Setting up Tokio runtime and spawning pulse generator...");

    let tokio_rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start Tokio runtime: {}", e);
            return;
        }
    };

    let bb: Blackboard = Arc::default();
    let pulse_topic: Topic<PulseEvent> = Topic::new(16);
    let pulse_rx_for_vis = pulse_topic.subscribe();
    let (layout_tx, layout_rx) = watch::channel::<Option<GridConfig>>(None);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let rng = match settings.pulse.seed {
        0 => StdRng::from_os_rng(),
        seed => StdRng::seed_from_u64(seed),
    };

    let pulse_handle = tokio_rt.spawn({
        let pulse_tx = pulse_topic.sender();
        let shutdown_rx = shutdown_rx.clone();
        async move {
            match run_pulse_task(layout_rx, pulse_tx, shutdown_rx, rng).await {
                Ok(()) => info!("Pulse task finished."),
                Err(e) => error!("Pulse task failed: {:?}. Lattice continues without pulses.", e),
            }
        }
    });

    let watchdog_handle = tokio_rt.spawn({
        let bb = Arc::clone(&bb);
        async move {
            if let Err(e) = watchdog(bb, shutdown_rx).await {
                error!("Watchdog failed: {:?}", e);
            }
        }
    });

    let surface = Surface::new(layout_tx, Arc::clone(&bb));
    graphics::run_visualization_loop(surface, pulse_rx_for_vis, Arc::clone(&bb), settings.render.clone()).await;

    info!("Tearing down: stopping timers and tasks.");
    shutdown_tx.send_replace(true);
    if let Err(e) = tokio_rt.block_on(async { tokio::try_join!(pulse_handle, watchdog_handle) }) {
        warn!("Background task ended abnormally: {}", e);
    }
    tokio_rt.shutdown_timeout(Duration::from_millis(250));

    let state = snapshot(&bb);
    info!(frames = state.frames, pulse_batches = state.pulse_batches, faults = ?state.faults, "dotgrid stopped.");
}

/// Flags the render loop when it stops producing frames while mounted.
async fn watchdog(bb: Blackboard, mut shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<()> {
    info!("Watchdog task started.");
    let mut tick = tokio::time::interval(Duration::from_millis(250));
    let mut stalled = false;
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let state = snapshot(&bb);
                if state.layout.is_none() {
                    continue;
                }
                let age = state.last_frame_ts.elapsed();
                if age > STALL_THRESHOLD {
                    if !stalled {
                        warn!(?age, frames = state.frames, "Render loop stalled.");
                        raise_fault(&bb, STALL_FAULT);
                        stalled = true;
                    }
                } else if stalled {
                    info!(?age, "Render loop recovered.");
                    clear_fault(&bb, STALL_FAULT);
                    stalled = false;
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Watchdog stopping.");
                    return Ok(());
                }
            }
        }
    }
}
