//! Body proxies and the seams to the physics and rendering engines
//!
//! The core never owns rigid-body state. It holds opaque handles and reads or
//! writes poses through [`PhysicsWorld`]; renderable objects are updated once
//! per tick through [`VisualSink`].

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Handle to a rigid body inside a [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Handle to a renderable object owned by the rendering engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualHandle(pub u32);

/// Position plus orientation of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    /// Unit quaternion
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// What the core consumes from the rigid-body engine.
///
/// Calls are assumed to succeed for handles the world handed out.
pub trait PhysicsWorld {
    fn position(&self, body: BodyHandle) -> Vec3;
    fn orientation(&self, body: BodyHandle) -> Quat;
    fn velocity(&self, body: BodyHandle) -> Vec3;
    fn angular_velocity(&self, body: BodyHandle) -> Vec3;

    fn set_position(&mut self, body: BodyHandle, position: Vec3);
    fn set_orientation(&mut self, body: BodyHandle, orientation: Quat);
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3);
    fn set_angular_velocity(&mut self, body: BodyHandle, angular_velocity: Vec3);

    /// Instantaneous change of momentum applied at a world-space point
    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3, point: Vec3);
    /// Torque accumulated until the next [`PhysicsWorld::step`]
    fn apply_torque(&mut self, body: BodyHandle, torque: Vec3);
    /// Force at a world-space point, accumulated until the next step
    fn apply_force(&mut self, body: BodyHandle, force: Vec3, point: Vec3);

    /// Advance the simulation by one fixed step
    fn step(&mut self, dt: f32);

    fn pose(&self, body: BodyHandle) -> Pose {
        Pose::new(self.position(body), self.orientation(body))
    }
}

/// What the core consumes from the rendering engine
pub trait VisualSink {
    fn sync_pose(&mut self, visual: VisualHandle, position: Vec3, orientation: Quat);
}

/// Renderer that draws nothing (headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl VisualSink for Headless {
    fn sync_pose(&mut self, _visual: VisualHandle, _position: Vec3, _orientation: Quat) {}
}

/// One physics body paired with the visual that mirrors it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyProxy {
    pub body: BodyHandle,
    pub visual: VisualHandle,
}

impl BodyProxy {
    pub fn new(body: BodyHandle, visual: VisualHandle) -> Self {
        Self { body, visual }
    }

    pub fn pose<W: PhysicsWorld + ?Sized>(&self, world: &W) -> Pose {
        world.pose(self.body)
    }

    pub fn set_pose<W: PhysicsWorld + ?Sized>(&self, world: &mut W, pose: Pose) {
        world.set_position(self.body, pose.position);
        world.set_orientation(self.body, pose.orientation);
    }

    pub fn set_orientation<W: PhysicsWorld + ?Sized>(&self, world: &mut W, orientation: Quat) {
        world.set_orientation(self.body, orientation);
    }

    /// Zero linear and angular velocity
    pub fn halt<W: PhysicsWorld + ?Sized>(&self, world: &mut W) {
        world.set_velocity(self.body, Vec3::ZERO);
        world.set_angular_velocity(self.body, Vec3::ZERO);
    }

    pub fn apply_impulse<W: PhysicsWorld + ?Sized>(&self, world: &mut W, impulse: Vec3, point: Vec3) {
        world.apply_impulse(self.body, impulse, point);
    }

    pub fn apply_torque<W: PhysicsWorld + ?Sized>(&self, world: &mut W, torque: Vec3) {
        world.apply_torque(self.body, torque);
    }

    pub fn apply_force<W: PhysicsWorld + ?Sized>(&self, world: &mut W, force: Vec3, point: Vec3) {
        world.apply_force(self.body, force, point);
    }

    /// Copy the physics pose onto the visual (once per tick, after the step)
    pub fn sync<W: PhysicsWorld + ?Sized, V: VisualSink + ?Sized>(&self, world: &W, scene: &mut V) {
        let pose = world.pose(self.body);
        scene.sync_pose(self.visual, pose.position, pose.orientation);
    }
}
