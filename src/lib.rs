//! Sumo Arena - a two-competitor "push the other off the platform" game core
//!
//! Core modules:
//! - `sim`: Deterministic match core (arena tilt loop, input mapping, referee)
//! - `config`: Data-driven match tuning and presets
//!
//! The rigid-body engine and the renderer are external; the core talks to
//! them only through the traits in [`sim::body`].

pub mod config;
pub mod sim;

pub use config::{ArenaPreset, MatchConfig};

use glam::{Vec2, Vec3};

/// Match configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one step per display refresh)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Tilt magnitude applied per tap (radians)
    pub const TILT_AMOUNT: f32 = 0.1;
    /// Fraction of the remaining tilt error closed each tick
    pub const TILT_LERP_SPEED: f32 = 0.2;
    /// Fraction of the target tilt bled off each tick
    pub const TILT_RESTORE_SPEED: f32 = 0.05;

    /// Round ring radius (world units)
    pub const RING_RADIUS: f32 = 5.0;
    /// Box platform half extents
    pub const PLATFORM_HALF_WIDTH: f32 = 5.0;
    pub const PLATFORM_HALF_DEPTH: f32 = 4.0;

    /// Rotation about a tip-over axis beyond which a competitor is down
    pub const FALL_THRESHOLD: f32 = std::f32::consts::FRAC_PI_4;

    /// Tap impulse
    pub const TAP_STRENGTH: f32 = 8.0;
    pub const TAP_JITTER: f32 = 1.0;
    pub const TAP_LIFT: f32 = 1.5;
    /// Largest tap jitter as a fraction of the tap strength
    pub const MAX_JITTER_FRACTION: f32 = 0.5;

    /// World gravity (y-down)
    pub const GRAVITY: f32 = -9.82;
}

/// Distance from the vertical axis through the arena centre, ignoring height
#[inline]
pub fn horizontal_distance(pos: Vec3) -> f32 {
    Vec2::new(pos.x, pos.z).length()
}
