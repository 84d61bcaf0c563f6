//! Competitors and their match status

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::body::{BodyProxy, PhysicsWorld, Pose, VisualSink};

/// Which of the two competitors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Red,
    Blue,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Red, Side::Blue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Red => "red",
            Side::Blue => "blue",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "red" => Some(Side::Red),
            "blue" => Some(Side::Blue),
            _ => None,
        }
    }
}

/// Match status of one competitor. `Out` and `Down` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Active,
    /// Left the arena bounds (or fell through the floor)
    Out,
    /// Tipped over past the fall threshold
    Down,
}

impl Status {
    pub fn is_active(&self) -> bool {
        *self == Status::Active
    }

    /// Short text for the status display
    pub fn label(&self) -> &'static str {
        match self {
            Status::Active => "ready",
            Status::Out => "out",
            Status::Down => "down",
        }
    }
}

/// One contestant body plus its status
#[derive(Debug, Clone)]
pub struct Competitor {
    side: Side,
    proxy: BodyProxy,
    start_pose: Pose,
    status: Status,
}

impl Competitor {
    pub fn new(side: Side, proxy: BodyProxy, start_pose: Pose) -> Self {
        Self {
            side,
            proxy,
            start_pose,
            status: Status::Active,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn start_pose(&self) -> Pose {
        self.start_pose
    }

    pub fn proxy(&self) -> BodyProxy {
        self.proxy
    }

    pub fn pose<W: PhysicsWorld + ?Sized>(&self, world: &W) -> Pose {
        self.proxy.pose(world)
    }

    /// Settle an `Active` competitor as `Out` or `Down`. Returns whether the
    /// status changed; a settled competitor keeps its first verdict.
    pub(super) fn settle(&mut self, verdict: Status) -> bool {
        if !self.status.is_active() || verdict.is_active() {
            return false;
        }
        self.status = verdict;
        true
    }

    pub fn apply_impulse<W: PhysicsWorld + ?Sized>(&self, world: &mut W, impulse: Vec3, point: Vec3) {
        if self.is_active() {
            self.proxy.apply_impulse(world, impulse, point);
        }
    }

    pub fn apply_torque<W: PhysicsWorld + ?Sized>(&self, world: &mut W, torque: Vec3) {
        if self.is_active() {
            self.proxy.apply_torque(world, torque);
        }
    }

    pub fn apply_force<W: PhysicsWorld + ?Sized>(&self, world: &mut W, force: Vec3, point: Vec3) {
        if self.is_active() {
            self.proxy.apply_force(world, force, point);
        }
    }

    /// Back to the start pose, at rest, `Active`
    pub fn reset<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        self.proxy.set_pose(world, self.start_pose);
        self.proxy.halt(world);
        self.status = Status::Active;
    }

    pub fn sync<W: PhysicsWorld + ?Sized, V: VisualSink + ?Sized>(&self, world: &W, scene: &mut V) {
        self.proxy.sync(world, scene);
    }
}
