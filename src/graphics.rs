use macroquad::prelude::*;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use dotgrid_lattice::{DOT_RADIUS, GridConfig};
use dotgrid_pulse::PulseEvent;

use crate::blackboard::{Blackboard, touch_frame};
use crate::config::{RenderSettings, settings};
use crate::surface::Surface;

// Function to configure the macroquad window
pub fn window_conf() -> Conf {
    let window = &settings().window;
    Conf {
        window_title: window.title.clone(),
        window_width: window.width as i32,
        window_height: window.height as i32,
        high_dpi: window.high_dpi,
        window_resizable: true,
        ..Default::default()
    }
}

const BACKGROUND: Color = Color::new(0.043, 0.047, 0.055, 1.0);
// #FFFFFF and #4F9CF9
const BASE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
const ACCENT: Color = Color::new(0.310, 0.612, 0.976, 1.0);
const DIVIDER: Color = Color::new(0.35, 0.37, 0.40, 1.0);

const GLOW_RADIUS_FACTOR: f32 = 2.6;
// Halo alpha of a base-colored dot and of a fully emphasized one.
const BASE_GLOW_ALPHA: f32 = 0.06;
const GLOW_ALPHA: f32 = 0.22;
const BRACKET_OFFSET: f32 = 16.0;
const BRACKET_LEN: f32 = 12.0;
const LABEL: &str = "SYS.O1";
const LABEL_FONT_SIZE: u16 = 12;

fn mix(a: Color, b: Color, t: f32) -> Color {
    Color::new(a.r + (b.r - a.r) * t, a.g + (b.g - a.g) * t, a.b + (b.b - a.b) * t, 1.0)
}

/// Halo behind a dot. Every dot glows; emphasis brightens it toward the accent.
fn halo_color(tint: f32, opacity: f32) -> Color {
    let alpha = BASE_GLOW_ALPHA + (GLOW_ALPHA - BASE_GLOW_ALPHA) * tint;
    Color { a: opacity * alpha, ..mix(BASE, ACCENT, tint) }
}

fn draw_lattice(surface: &Surface, origin: (f32, f32), glow: bool) {
    for ((cx, cy), point) in surface.points() {
        let x = origin.0 + cx;
        let y = origin.1 + cy;
        let tint = point.tint();
        let opacity = point.opacity();

        if glow {
            draw_circle(x, y, DOT_RADIUS * point.scale() * GLOW_RADIUS_FACTOR, halo_color(tint, opacity));
        }
        let color = Color { a: opacity, ..mix(BASE, ACCENT, tint) };
        draw_circle(x, y, DOT_RADIUS * point.scale(), color);
    }
}

fn draw_frame_marks(layout: GridConfig, origin: (f32, f32)) {
    let (w, h) = layout.surface_size();
    let (left, top) = (origin.0 - BRACKET_OFFSET, origin.1 - BRACKET_OFFSET);
    let (right, bottom) = (origin.0 + w + BRACKET_OFFSET, origin.1 + h + BRACKET_OFFSET);

    draw_line(left, top, left + BRACKET_LEN, top, 1.0, DIVIDER);
    draw_line(left, top, left, top + BRACKET_LEN, 1.0, DIVIDER);
    draw_line(right, bottom, right - BRACKET_LEN, bottom, 1.0, DIVIDER);
    draw_line(right, bottom, right, bottom - BRACKET_LEN, 1.0, DIVIDER);

    let dims = measure_text(LABEL, None, LABEL_FONT_SIZE, 1.0);
    let label_color = Color { a: 0.5, ..DIVIDER };
    draw_text(LABEL, origin.0 + w - dims.width, origin.1 + dims.offset_y, LABEL_FONT_SIZE as f32, label_color);
}

fn draw_hud(surface: &Surface, bb: &Blackboard) {
    let state = bb.read().clone();
    let layout = surface.layout().map(|l| l.to_string()).unwrap_or_else(|| "unmounted".to_string());
    let lines = [
        format!("Preset: {}  FPS: {}", layout, get_fps()),
        format!("Pointer: {}  present: {}", surface.pointer(), state.pointer_present),
        format!("Pulses: {}  batches: {}", surface.pulses(), state.pulse_batches),
        format!("Frames: {}  recomputes: {}", state.frames, state.recomputes),
        format!("Faults: {:?}", state.faults),
    ];
    for (i, line) in lines.iter().enumerate() {
        draw_text(line, 10.0, 20.0 + i as f32 * 18.0, 18.0, LIGHTGRAY);
    }
}

fn drain_pulses(surface: &mut Surface, pulse_rx: &mut broadcast::Receiver<Arc<PulseEvent>>) -> bool {
    loop {
        match pulse_rx.try_recv() {
            Ok(event) => {
                surface.apply_pulse_event(&event);
            }
            Err(broadcast::error::TryRecvError::Empty) => return true,
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                // Next receive yields the oldest retained event; keep draining to the newest.
                warn!("Visualization pulse receiver lagged by {} events.", n);
            }
            Err(broadcast::error::TryRecvError::Closed) => {
                error!("Pulse channel closed; lattice continues without pulses.");
                return false;
            }
        }
    }
}

pub async fn run_visualization_loop(
    mut surface: Surface,
    mut pulse_rx: broadcast::Receiver<Arc<PulseEvent>>,
    bb: Blackboard,
    render: RenderSettings,
) {
    let mut pulses_open = true;
    prevent_quit();

    info!("Visualization loop starting inside graphics module...");

    loop {
        if is_quit_requested() || is_key_pressed(KeyCode::Escape) {
            info!("Window close requested.");
            break;
        }

        let (sw, sh) = (screen_width(), screen_height());
        surface.observe_viewport(sw);

        if pulses_open {
            pulses_open = drain_pulses(&mut surface, &mut pulse_rx);
        }

        let origin = surface.origin(sw, sh);
        let (mx, my) = mouse_position();
        surface.track_pointer(mx, my, origin, (sw, sh));
        surface.refresh(get_frame_time());

        clear_background(BACKGROUND);
        if let Some(layout) = surface.layout() {
            draw_lattice(&surface, origin, render.glow);
            draw_frame_marks(layout, origin);
        }
        if render.hud {
            draw_hud(&surface, &bb);
        }

        touch_frame(&bb);
        next_frame().await
    }

    surface.unmount();
}
