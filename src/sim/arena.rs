//! Arena controller: platform bounds and the tilt control loop
//!
//! Player input only ever sets a tilt *target*. Each tick the current tilt
//! chases the target while the target itself bleeds back to level, so the
//! platform settles on its own after every tap. The platform body is
//! kinematic: the engine never applies a restoring torque to it.

use std::ops::{Add, Mul, Sub};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::body::{BodyProxy, PhysicsWorld, VisualSink};
use super::referee::MatchPhase;
use crate::consts::*;
use crate::horizontal_distance;

/// Platform tilt in radians about the world X and Z axes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Tilt {
    pub x: f32,
    pub z: f32,
}

impl Tilt {
    pub const ZERO: Self = Self { x: 0.0, z: 0.0 };

    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Orientation for this tilt: X rotation first, then Z, both about world axes
    pub fn rotation(self) -> Quat {
        Quat::from_rotation_z(self.z) * Quat::from_rotation_x(self.x)
    }

    /// True when both components are within `eps` of zero
    pub fn is_level(self, eps: f32) -> bool {
        self.x.abs() <= eps && self.z.abs() <= eps
    }
}

impl Add for Tilt {
    type Output = Tilt;
    fn add(self, rhs: Tilt) -> Tilt {
        Tilt::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl Sub for Tilt {
    type Output = Tilt;
    fn sub(self, rhs: Tilt) -> Tilt {
        Tilt::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl Mul<f32> for Tilt {
    type Output = Tilt;
    fn mul(self, rhs: f32) -> Tilt {
        Tilt::new(self.x * rhs, self.z * rhs)
    }
}

/// Horizontal play area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ArenaBounds {
    /// Round ring centred on the origin
    Circle { radius: f32 },
    /// Rectangular platform centred on the origin
    Rect { half_width: f32, half_depth: f32 },
}

impl ArenaBounds {
    /// Whether a world position lies over the play area (edges count as inside)
    pub fn contains(&self, pos: Vec3) -> bool {
        match *self {
            ArenaBounds::Circle { radius } => horizontal_distance(pos) <= radius,
            ArenaBounds::Rect {
                half_width,
                half_depth,
            } => pos.x.abs() <= half_width && pos.z.abs() <= half_depth,
        }
    }
}

/// Tilt control loop constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltConfig {
    /// Magnitude of the target set by one input (radians)
    pub amount: f32,
    /// Fraction of (target - current) closed per tick, in (0, 1)
    pub lerp_speed: f32,
    /// Fraction of the target removed per tick, in (0, 1)
    pub restore_speed: f32,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            amount: TILT_AMOUNT,
            lerp_speed: TILT_LERP_SPEED,
            restore_speed: TILT_RESTORE_SPEED,
        }
    }
}

/// Static description of the arena
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub bounds: ArenaBounds,
    /// Competitors whose centre drops below this height have fallen through
    #[serde(default)]
    pub floor_y: Option<f32>,
    /// Height of the platform's top surface
    #[serde(default)]
    pub surface_y: f32,
    /// Kinematic platforms follow the tilt loop; static ones stay level
    pub kinematic: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bounds: ArenaBounds::Circle {
                radius: RING_RADIUS,
            },
            floor_y: Some(-5.0),
            surface_y: 0.0,
            kinematic: false,
        }
    }
}

#[inline]
fn direction_sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Owns the platform body and its tilt state
#[derive(Debug, Clone)]
pub struct ArenaController {
    proxy: BodyProxy,
    config: ArenaConfig,
    tilt: TiltConfig,
    current: Tilt,
    target: Tilt,
    base_orientation: Quat,
}

impl ArenaController {
    pub fn new(proxy: BodyProxy, config: ArenaConfig, tilt: TiltConfig, base_orientation: Quat) -> Self {
        Self {
            proxy,
            config,
            tilt,
            current: Tilt::ZERO,
            target: Tilt::ZERO,
            base_orientation,
        }
    }

    pub fn proxy(&self) -> BodyProxy {
        self.proxy
    }

    pub fn bounds(&self) -> ArenaBounds {
        self.config.bounds
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn current_tilt(&self) -> Tilt {
        self.current
    }

    pub fn target_tilt(&self) -> Tilt {
        self.target
    }

    pub fn base_orientation(&self) -> Quat {
        self.base_orientation
    }

    /// Overwrite the tilt target with `±amount` per axis following the signs of
    /// `dx`/`dz`. A zero component targets level on that axis. Never accumulates.
    pub fn set_tilt_target(&mut self, dx: f32, dz: f32) {
        let a = self.tilt.amount;
        self.target = Tilt::new(direction_sign(dx) * a, direction_sign(dz) * a);
        log::debug!("Tilt target -> ({:.3}, {:.3})", self.target.x, self.target.z);
    }

    /// True if a position is off the platform or below the fall-through floor
    pub fn is_out_of_bounds(&self, pos: Vec3) -> bool {
        if !self.config.bounds.contains(pos) {
            return true;
        }
        matches!(self.config.floor_y, Some(floor) if pos.y < floor)
    }

    /// One control-loop step. Does nothing unless the match is being played.
    pub fn tick<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, phase: MatchPhase) {
        if phase != MatchPhase::Playing {
            return;
        }

        // Smooth current toward target
        self.current = self.current + (self.target - self.current) * self.tilt.lerp_speed;
        // Bleed target back toward level
        self.target = self.target * (1.0 - self.tilt.restore_speed);

        if self.config.kinematic {
            self.proxy
                .set_orientation(world, self.current.rotation() * self.base_orientation);
        }
    }

    /// Level the platform and stop it
    pub fn reset<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        self.current = Tilt::ZERO;
        self.target = Tilt::ZERO;
        self.proxy.set_orientation(world, self.base_orientation);
        self.proxy.halt(world);
    }

    pub fn sync<W: PhysicsWorld + ?Sized, V: VisualSink + ?Sized>(&self, world: &W, scene: &mut V) {
        self.proxy.sync(world, scene);
    }
}
