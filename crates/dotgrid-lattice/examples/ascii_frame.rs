use dotgrid_lattice::{FrameCache, GridConfig, PointerState, PulseSet};

fn main() {
    // Desktop preset, pointer a little up-left of the center, two points pulsing
    let config = GridConfig::for_viewport(1280.0);
    let (w, h) = config.surface_size();
    let pointer = PointerState::at(w * 0.4, h * 0.45);

    let mut pulses = PulseSet::new();
    pulses.insert(config.index(1, 10).unwrap(), config.point_count()).unwrap();
    pulses.insert(config.index(10, 2).unwrap(), config.point_count()).unwrap();

    let mut frame = FrameCache::new();
    frame.update(config, pointer, pulses);

    println!("Preset: {}", config);
    println!("Pointer: {}", pointer);
    println!("Pulsing: {}\n", pulses);

    for row in 0..config.rows() {
        for col in 0..config.cols() {
            let v = frame.visuals()[config.index(row, col).unwrap()];
            let glyph = match (v.emphasized, v.scale) {
                (false, _) => '.',
                (true, s) if s >= 1.6 => '@',
                (true, s) if s >= 1.4 => 'O',
                (true, _) => 'o',
            };
            print!("{} ", glyph);
        }
        println!();
    }
    println!("\n. idle   o/O/@ emphasized, by scale");
}
