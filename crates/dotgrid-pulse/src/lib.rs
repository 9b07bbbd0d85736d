//! Periodic random pulse generator for the dot lattice.
//!
//! Every [`PULSE_INTERVAL`] a batch of one to three random points is published;
//! [`PULSE_VISIBLE`] later a clear follows. A layout change restarts the cycle.

use std::{sync::Arc, time::Duration};

use rand::Rng;
use tokio::sync::{broadcast, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use dotgrid_lattice::{GridConfig, PulseSet};

/// Time between two pulse batches.
pub const PULSE_INTERVAL: Duration = Duration::from_millis(2500);
/// How long a batch stays visible before it is cleared.
pub const PULSE_VISIBLE: Duration = Duration::from_millis(1000);

/// Messages published by [`run_pulse_task`].
#[derive(Debug, Clone, PartialEq)]
pub enum PulseEvent {
    /// A new batch drawn against `layout`. Replaces any previous batch.
    Batch { layout: GridConfig, pulses: PulseSet },
    /// The visible batch expired.
    Clear,
}

fn cycle_ticker() -> Interval {
    let mut ticker = time::interval_at(Instant::now() + PULSE_INTERVAL, PULSE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn publish(pulse_tx: &broadcast::Sender<Arc<PulseEvent>>, event: PulseEvent) {
    if pulse_tx.send(Arc::new(event)).is_err() {
        trace!("No pulse subscribers; event dropped.");
    }
}

/// Pulse generator task.
///
/// Runs until the layout channel closes or `shutdown_rx` turns `true`; both
/// timers die with the task.
///
/// # Arguments
/// * `layout_rx` - Mounted lattice preset, `None` while no surface is mounted. Read afresh on every tick.
/// * `pulse_tx` - A Tokio broadcast sender to publish `Arc<PulseEvent>`s.
/// * `shutdown_rx` - Teardown signal.
/// * `rng` - Source of batch sizes and indices.
pub async fn run_pulse_task<R: Rng + Send>(
    mut layout_rx: watch::Receiver<Option<GridConfig>>,
    pulse_tx: broadcast::Sender<Arc<PulseEvent>>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut rng: R,
) -> anyhow::Result<()> {
    info!("Pulse task started.");
    let mut ticker = cycle_ticker();
    let mut clear_at: Option<Instant> = None;

    loop {
        // Teardown and layout changes win over a timer firing on the same wake-up.
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Shutdown requested; pulse task stopping.");
                    break;
                }
            }
            changed = layout_rx.changed() => {
                if changed.is_err() {
                    info!("Layout channel closed; pulse task stopping.");
                    break;
                }
                let layout = *layout_rx.borrow_and_update();
                if clear_at.take().is_some() {
                    publish(&pulse_tx, PulseEvent::Clear);
                }
                ticker = cycle_ticker();
                match layout {
                    Some(layout) => info!(%layout, "Layout changed; pulse cycle restarted."),
                    None => info!("Surface unmounted; pulses suspended."),
                }
            }
            _ = time::sleep_until(clear_at.unwrap_or_else(Instant::now)), if clear_at.is_some() => {
                clear_at = None;
                debug!("Pulse batch cleared");
                publish(&pulse_tx, PulseEvent::Clear);
            }
            _ = ticker.tick() => {
                // A change not yet seen by its arm restarts the cycle instead.
                if layout_rx.has_changed().unwrap_or(false) {
                    continue;
                }
                let layout = *layout_rx.borrow();
                let Some(layout) = layout else {
                    trace!("Pulse tick skipped; no surface mounted.");
                    continue;
                };
                match PulseSet::random(&mut rng, layout.point_count()) {
                    Ok(pulses) => {
                        debug!(%pulses, %layout, "Pulse batch");
                        publish(&pulse_tx, PulseEvent::Batch { layout, pulses });
                        clear_at = Some(Instant::now() + PULSE_VISIBLE);
                    }
                    Err(e) => warn!("Failed to draw pulse batch: {}", e),
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use tokio::task::JoinHandle;

    struct Harness {
        layout_tx: watch::Sender<Option<GridConfig>>,
        shutdown_tx: watch::Sender<bool>,
        pulse_rx: broadcast::Receiver<Arc<PulseEvent>>,
        task: JoinHandle<anyhow::Result<()>>,
        start: Instant,
    }

    fn spawn(layout: Option<GridConfig>, seed: u64) -> Harness {
        let (layout_tx, layout_rx) = watch::channel(layout);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (pulse_tx, pulse_rx) = broadcast::channel(16);
        let start = Instant::now();
        let task = tokio::spawn(run_pulse_task(layout_rx, pulse_tx, shutdown_rx, SmallRng::seed_from_u64(seed)));
        Harness { layout_tx, shutdown_tx, pulse_rx, task, start }
    }

    // Paused-clock timers fire on millisecond ticks, so allow a few ms of slack.
    fn assert_at(start: Instant, ms: u64) {
        let elapsed = start.elapsed();
        let expected = Duration::from_millis(ms);
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "expected event at {ms}ms, got {elapsed:?}"
        );
    }

    async fn next(h: &mut Harness) -> PulseEvent {
        (*h.pulse_rx.recv().await.unwrap()).clone()
    }

    fn expect_batch(event: PulseEvent, expected_layout: GridConfig) -> PulseSet {
        match event {
            PulseEvent::Batch { layout, pulses } => {
                assert_eq!(layout, expected_layout);
                assert!(!pulses.is_empty());
                assert!(pulses.fits_within(layout.point_count()));
                pulses
            }
            PulseEvent::Clear => panic!("expected a batch, got a clear"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_duty_cycle_one_second_on() {
        let mut h = spawn(Some(GridConfig::STANDARD), 1);

        for cycle in 0..3u64 {
            let base = 2500 * (cycle + 1);
            expect_batch(next(&mut h).await, GridConfig::STANDARD);
            assert_at(h.start, base);
            assert_eq!(next(&mut h).await, PulseEvent::Clear);
            assert_at(h.start, base + 1000);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_batches_while_unmounted() {
        let mut h = spawn(None, 2);
        let quiet = time::timeout(Duration::from_secs(10), h.pulse_rx.recv()).await;
        assert!(quiet.is_err(), "pulse published with no surface mounted");

        h.layout_tx.send_replace(Some(GridConfig::COMPACT));
        expect_batch(next(&mut h).await, GridConfig::COMPACT);
        assert_at(h.start, 12_500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_on_skipped_tick_restarts_cycle() {
        for seed in 0..20 {
            let mut h = spawn(None, seed);
            time::sleep(PULSE_INTERVAL).await;

            h.layout_tx.send_replace(Some(GridConfig::STANDARD));
            expect_batch(next(&mut h).await, GridConfig::STANDARD);
            assert_at(h.start, 5000);
            assert_eq!(next(&mut h).await, PulseEvent::Clear);
            assert_at(h.start, 6000);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_between_ticks() {
        let mut h = spawn(None, 8);
        time::sleep(Duration::from_millis(1200)).await;

        h.layout_tx.send_replace(Some(GridConfig::COMPACT));
        expect_batch(next(&mut h).await, GridConfig::COMPACT);
        assert_at(h.start, 3700);
        assert_eq!(next(&mut h).await, PulseEvent::Clear);
        assert_at(h.start, 4700);
    }

    #[tokio::test(start_paused = true)]
    async fn test_layout_change_restarts_cycle() {
        let mut h = spawn(Some(GridConfig::STANDARD), 3);
        expect_batch(next(&mut h).await, GridConfig::STANDARD);
        assert_at(h.start, 2500);

        h.layout_tx.send_replace(Some(GridConfig::COMPACT));
        assert_eq!(next(&mut h).await, PulseEvent::Clear);
        assert_at(h.start, 2500);

        expect_batch(next(&mut h).await, GridConfig::COMPACT);
        assert_at(h.start, 5000);
        assert_eq!(next(&mut h).await, PulseEvent::Clear);
        assert_at(h.start, 6000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_compact_batches_stay_in_bounds() {
        let mut h = spawn(Some(GridConfig::COMPACT), 4);
        for _ in 0..50 {
            if let PulseEvent::Batch { pulses, .. } = next(&mut h).await {
                assert!(pulses.iter().all(|i| i < 81));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_task() {
        let mut h = spawn(Some(GridConfig::STANDARD), 5);
        expect_batch(next(&mut h).await, GridConfig::STANDARD);

        h.shutdown_tx.send_replace(true);
        h.task.await.unwrap().unwrap();
        assert!(matches!(h.pulse_rx.recv().await, Err(broadcast::error::RecvError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_layout_channel_close_stops_task() {
        let Harness { layout_tx, shutdown_tx: _shutdown_tx, task, .. } = spawn(Some(GridConfig::STANDARD), 6);
        drop(layout_tx);
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_survives_without_subscribers() {
        let Harness { layout_tx: _layout_tx, shutdown_tx, pulse_rx, task, .. } = spawn(Some(GridConfig::STANDARD), 7);
        drop(pulse_rx);
        time::sleep(Duration::from_secs(8)).await;
        assert!(!task.is_finished());

        shutdown_tx.send_replace(true);
        task.await.unwrap().unwrap();
    }
}
