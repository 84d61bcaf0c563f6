//! Input mapping: corner taps and motion samples to physical stimuli
//!
//! Input events arrive asynchronously; the mapper only turns them into
//! [`Stimulus`] values. Nothing here touches the physics world, the session
//! applies stimuli at the next tick boundary.

use std::fmt;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// The four tap zones in the screen corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TapZone {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TapZone {
    pub const ALL: [TapZone; 4] = [
        TapZone::TopLeft,
        TapZone::TopRight,
        TapZone::BottomLeft,
        TapZone::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TapZone::TopLeft => "top-left",
            TapZone::TopRight => "top-right",
            TapZone::BottomLeft => "bottom-left",
            TapZone::BottomRight => "bottom-right",
        }
    }

    /// Parse a zone identifier from the UI. Unknown identifiers yield `None`.
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "top-left" => Some(TapZone::TopLeft),
            "top-right" => Some(TapZone::TopRight),
            "bottom-left" => Some(TapZone::BottomLeft),
            "bottom-right" => Some(TapZone::BottomRight),
            _ => None,
        }
    }

    /// Signs of the tilt target (x, z) in tilt mode
    pub fn tilt_direction(&self) -> (f32, f32) {
        match self {
            TapZone::TopLeft => (-1.0, 1.0),
            TapZone::TopRight => (1.0, 1.0),
            TapZone::BottomLeft => (-1.0, -1.0),
            TapZone::BottomRight => (1.0, -1.0),
        }
    }

    /// Horizontal push direction (x, z) in impulse mode: away from the tapped corner
    pub fn impulse_direction(&self) -> (f32, f32) {
        match self {
            TapZone::TopLeft => (1.0, 1.0),
            TapZone::TopRight => (-1.0, 1.0),
            TapZone::BottomLeft => (1.0, -1.0),
            TapZone::BottomRight => (-1.0, -1.0),
        }
    }
}

/// Which stimulus the deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Taps tilt the arena
    TapTilt,
    /// Taps push the competitors
    #[default]
    TapImpulse,
    /// Device motion shakes the competitors; taps push as in `TapImpulse`
    Motion,
}

/// One accelerometer reading. Missing axes count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl MotionSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(
            self.x.unwrap_or(0.0),
            self.y.unwrap_or(0.0),
            self.z.unwrap_or(0.0),
        )
    }
}

/// Outcome of asking the platform for motion-sensor access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPermission {
    Granted,
    Denied,
    Unavailable,
}

/// Conditions the UI must show; they disable motion input, nothing else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    MotionDenied,
    MotionUnavailable,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::MotionDenied => write!(f, "motion sensor permission was denied"),
            InputError::MotionUnavailable => write!(f, "motion sensor is not available"),
        }
    }
}

impl std::error::Error for InputError {}

/// Tap-to-impulse tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpulseConfig {
    /// Horizontal impulse along the tap direction
    pub strength: f32,
    /// Bound of the random horizontal jitter (uniform in ±jitter), capped
    /// at half the strength
    pub jitter: f32,
    /// Upper bound of the random upward component
    pub lift: f32,
    /// Full range of the random wobble torque per axis
    pub torque_jitter: Vec3,
}

impl Default for ImpulseConfig {
    fn default() -> Self {
        Self {
            strength: TAP_STRENGTH,
            jitter: TAP_JITTER,
            lift: TAP_LIFT,
            torque_jitter: Vec3::new(3.0, 1.0, 3.0),
        }
    }
}

/// Motion-to-force tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Scale applied to the change between consecutive samples
    pub intensity: f32,
    /// Scale applied to the raw sample so a steady tilt still pushes
    pub steady_gain: f32,
    /// Torque per unit of raw acceleration
    pub torque_gain: f32,
    /// Horizontal delta that counts as a shake
    pub shake_threshold: f32,
    /// Impulse delivered by a shake
    pub shake_impulse: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            intensity: 0.5,
            steady_gain: 0.05,
            torque_gain: 0.02,
            shake_threshold: 3.0,
            shake_impulse: 2.0,
        }
    }
}

/// A physical stimulus ready to be applied at the tick boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stimulus {
    /// New tilt target signs for the arena
    Tilt { dx: f32, dz: f32 },
    /// Impulse at each active competitor's centre plus a wobble torque
    Push { impulse: Vec3, torque: Vec3 },
    /// Continuous force and torque, with an extra impulse on a shake
    Shake {
        force: Vec3,
        torque: Vec3,
        impulse: Option<Vec3>,
    },
}

/// Turns discrete taps and motion samples into stimuli
#[derive(Debug, Clone)]
pub struct InputMapper {
    mode: InputMode,
    impulse: ImpulseConfig,
    motion: MotionConfig,
    seed: u64,
    rng: Pcg32,
    permission: Option<MotionPermission>,
    last_sample: Option<Vec3>,
}

impl InputMapper {
    pub fn new(mode: InputMode, impulse: ImpulseConfig, motion: MotionConfig, seed: u64) -> Self {
        Self {
            mode,
            impulse,
            motion,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            permission: None,
            last_sample: None,
        }
    }

    /// Record the sensor permission. Anything but `Granted` is reported back
    /// so the UI can show it; taps keep working either way.
    pub fn set_permission(&mut self, permission: MotionPermission) -> Result<(), InputError> {
        self.permission = Some(permission);
        self.last_sample = None;
        match permission {
            MotionPermission::Granted => Ok(()),
            MotionPermission::Denied => Err(InputError::MotionDenied),
            MotionPermission::Unavailable => Err(InputError::MotionUnavailable),
        }
    }

    /// Whether motion samples are currently turned into stimuli
    pub fn motion_enabled(&self) -> bool {
        self.mode == InputMode::Motion && self.permission == Some(MotionPermission::Granted)
    }

    /// Map a tap. The sign of every primary component is fixed by the zone;
    /// only the bounded jitter comes from the RNG.
    pub fn map_tap(&mut self, zone: TapZone) -> Stimulus {
        match self.mode {
            InputMode::TapTilt => {
                let (dx, dz) = zone.tilt_direction();
                Stimulus::Tilt { dx, dz }
            }
            InputMode::TapImpulse | InputMode::Motion => {
                let (dx, dz) = zone.impulse_direction();
                let cfg = self.impulse;
                let strength = cfg.strength.abs();
                // Jitter never outweighs the push, so the zone alone decides the sign
                let jitter = cfg.jitter.abs().min(strength * MAX_JITTER_FRACTION);
                let impulse = Vec3::new(
                    dx * strength + self.symmetric(jitter),
                    self.rng.random::<f32>() * cfg.lift,
                    dz * strength + self.symmetric(jitter),
                );
                let torque = Vec3::new(
                    self.symmetric(cfg.torque_jitter.x * 0.5),
                    self.symmetric(cfg.torque_jitter.y * 0.5),
                    self.symmetric(cfg.torque_jitter.z * 0.5),
                );
                Stimulus::Push { impulse, torque }
            }
        }
    }

    /// Map a motion sample. Returns `None` when motion input is disabled.
    pub fn map_motion(&mut self, sample: MotionSample) -> Option<Stimulus> {
        if !self.motion_enabled() {
            return None;
        }

        let raw = sample.to_vec3();
        let delta = raw - self.last_sample.unwrap_or(raw);
        self.last_sample = Some(raw);

        let cfg = self.motion;
        let force = delta * cfg.intensity + raw * cfg.steady_gain;

        let axis = Vec3::new(raw.z, 0.0, -raw.x).try_normalize().unwrap_or(Vec3::Y);
        let torque = axis * raw.length() * cfg.torque_gain;

        let shake = delta.x.abs() > cfg.shake_threshold || delta.z.abs() > cfg.shake_threshold;
        let impulse = shake.then(|| Vec3::new(delta.x, 0.0, delta.z).normalize_or_zero() * cfg.shake_impulse);

        Some(Stimulus::Shake {
            force,
            torque,
            impulse,
        })
    }

    /// Forget the previous sample and rewind the jitter RNG to its seed
    pub fn reset(&mut self) {
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.last_sample = None;
    }

    /// Uniform in [-bound, bound)
    fn symmetric(&mut self, bound: f32) -> f32 {
        (self.rng.random::<f32>() - 0.5) * 2.0 * bound
    }
}
