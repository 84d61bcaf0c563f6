//! Match configuration and presets
//!
//! Every tunable of a deployment lives here, so one design covers the round
//! ring, the tilting platform and the motion-controlled variant.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::{
    ArenaBounds, ArenaConfig, FallRule, ImpulseConfig, InputMode, MotionConfig, Side, TiltConfig,
};

/// Arena layouts the game ships with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArenaPreset {
    /// Static round ring, taps push the competitors
    #[default]
    Dohyo,
    /// Rectangular kinematic platform, taps tilt it
    TiltingDohyo,
    /// Static round ring driven by device motion
    ShakeTable,
}

impl ArenaPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArenaPreset::Dohyo => "dohyo",
            ArenaPreset::TiltingDohyo => "tilting_dohyo",
            ArenaPreset::ShakeTable => "shake_table",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "dohyo" | "ring" => Some(ArenaPreset::Dohyo),
            "tilting_dohyo" | "tilt" => Some(ArenaPreset::TiltingDohyo),
            "shake_table" | "motion" => Some(ArenaPreset::ShakeTable),
            _ => None,
        }
    }
}

/// Competitor body parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompetitorConfig {
    pub mass: f32,
    /// Centre-to-feet distance, used for resting on the platform
    pub half_height: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub red_start: Vec3,
    pub blue_start: Vec3,
}

impl CompetitorConfig {
    pub fn start(&self, side: Side) -> Vec3 {
        match side {
            Side::Red => self.red_start,
            Side::Blue => self.blue_start,
        }
    }
}

impl Default for CompetitorConfig {
    fn default() -> Self {
        Self {
            mass: 0.15,
            half_height: 0.9,
            linear_damping: 0.2,
            angular_damping: 0.2,
            red_start: Vec3::new(-2.0, 2.0, 0.0),
            blue_start: Vec3::new(2.0, 2.0, 0.0),
        }
    }
}

/// Complete match configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub preset: ArenaPreset,
    pub arena: ArenaConfig,
    pub tilt: TiltConfig,
    pub fall: FallRule,
    pub input_mode: InputMode,
    pub impulse: ImpulseConfig,
    pub motion: MotionConfig,
    pub competitors: CompetitorConfig,
    /// Seed for the tap jitter RNG
    pub seed: u64,
    /// Fixed physics step (seconds)
    pub dt: f32,
    /// Vertical gravity (negative is down)
    pub gravity: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::from_preset(ArenaPreset::Dohyo)
    }
}

impl MatchConfig {
    /// Create a configuration from a preset (applies preset defaults)
    pub fn from_preset(preset: ArenaPreset) -> Self {
        let base = Self {
            preset,
            arena: ArenaConfig::default(),
            tilt: TiltConfig::default(),
            fall: FallRule::default(),
            input_mode: InputMode::TapImpulse,
            impulse: ImpulseConfig::default(),
            motion: MotionConfig::default(),
            competitors: CompetitorConfig::default(),
            seed: 0,
            dt: SIM_DT,
            gravity: GRAVITY,
        };

        match preset {
            ArenaPreset::Dohyo => base,
            ArenaPreset::TiltingDohyo => Self {
                arena: ArenaConfig {
                    bounds: ArenaBounds::Rect {
                        half_width: PLATFORM_HALF_WIDTH,
                        half_depth: PLATFORM_HALF_DEPTH,
                    },
                    floor_y: Some(-5.0),
                    surface_y: 0.75,
                    kinematic: true,
                },
                input_mode: InputMode::TapTilt,
                competitors: CompetitorConfig {
                    mass: 0.25,
                    half_height: 2.4,
                    linear_damping: 0.3,
                    angular_damping: 0.5,
                    red_start: Vec3::new(-2.0, 3.2, 0.0),
                    blue_start: Vec3::new(2.0, 3.2, 0.0),
                },
                ..base
            },
            ArenaPreset::ShakeTable => Self {
                input_mode: InputMode::Motion,
                ..base
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
