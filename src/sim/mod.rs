//! Deterministic match core
//!
//! All referee and control logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (Red before Blue, though outcomes never depend on it)
//! - No rendering or platform dependencies; engines are reached through traits

pub mod arena;
pub mod body;
pub mod competitor;
pub mod input;
pub mod referee;
pub mod session;
pub mod world;

pub use arena::{ArenaBounds, ArenaConfig, ArenaController, Tilt, TiltConfig};
pub use body::{BodyHandle, BodyProxy, Headless, PhysicsWorld, Pose, VisualHandle, VisualSink};
pub use competitor::{Competitor, Side, Status};
pub use input::{
    ImpulseConfig, InputError, InputMapper, InputMode, MotionConfig, MotionPermission,
    MotionSample, Stimulus, TapZone,
};
pub use referee::{FallRule, MatchEvent, MatchPhase, Outcome, Referee, TipAxes};
pub use session::{FrameClock, MatchSession};
pub use world::{BodyDesc, BodyKind, SimpleWorld, Support};
