//! Sumo Arena headless driver
//!
//! Runs one scripted match on the built-in world and logs what the referee
//! decides. Usage: `sumo-arena [preset | config.json] [max_ticks]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use sumo_arena::sim::{Headless, MatchEvent, MatchSession, MotionPermission, MotionSample, TapZone};
    use sumo_arena::{ArenaPreset, MatchConfig};

    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        None => MatchConfig::default(),
        Some(arg) => match ArenaPreset::from_str(&arg) {
            Some(preset) => MatchConfig::from_preset(preset),
            None => match std::fs::read_to_string(&arg) {
                Ok(json) => match MatchConfig::from_json(&json) {
                    Ok(config) => config,
                    Err(e) => {
                        log::error!("Invalid config {}: {}", arg, e);
                        std::process::exit(2);
                    }
                },
                Err(e) => {
                    log::error!("Cannot read {}: {}", arg, e);
                    std::process::exit(2);
                }
            },
        },
    };
    let max_ticks: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(1200);

    log::info!("Sumo Arena (headless) starting with preset {}", config.preset.as_str());

    let mut session = MatchSession::headless(config);
    if let Err(e) = session.set_motion_permission(MotionPermission::Granted) {
        log::warn!("{}", e);
    }
    session.start();

    // Alternate corners so the competitors get pushed around the ring
    let script = [
        TapZone::TopLeft,
        TapZone::BottomRight,
        TapZone::TopRight,
        TapZone::BottomLeft,
    ];
    let mut taps = script.iter().cycle();

    while session.time_ticks() < max_ticks {
        let t = session.time_ticks();
        if t % 45 == 0 {
            if let Some(&zone) = taps.next() {
                session.tap(zone);
            }
        }
        let phase = t as f32 * 0.1;
        session.motion(MotionSample::new(phase.sin() * 4.0, 9.8, (phase * 0.7).cos() * 4.0));

        for event in session.tick(&mut Headless) {
            match event {
                MatchEvent::StatusChanged { side, status } => {
                    println!("tick {:>5}: {} is {}", t, side.as_str(), status.label());
                }
                MatchEvent::Ended(outcome) => {
                    println!("tick {:>5}: {}", t, outcome.announcement());
                }
                MatchEvent::Started | MatchEvent::Reset => {}
            }
        }

        if session.outcome().is_some() {
            break;
        }
    }

    if session.outcome().is_none() {
        println!("No decision after {} ticks", session.time_ticks());
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Browser builds embed the library; there is no standalone entry point
}
