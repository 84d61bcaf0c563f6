//! Minimal rigid-body world for headless matches and tests
//!
//! Semi-implicit Euler integration of free bodies with damping. There is no
//! collision detection: the only contact is an optional support plane that
//! holds dynamic bodies on top of the arena while they are inside its
//! footprint. The plane follows the orientation of its platform body, so a
//! tilted platform lets bodies slide downhill. Anything beyond that belongs to
//! a real engine behind [`PhysicsWorld`].

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::arena::ArenaBounds;
use super::body::{BodyHandle, PhysicsWorld};

/// How a body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Moved by forces, impulses and gravity
    Dynamic,
    /// Moved only by its velocity and explicit pose writes
    Kinematic,
    /// Never moves on its own
    Static,
}

/// Construction parameters for a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub mass: f32,
    /// Scalar moment of inertia (bodies are treated as rotationally isotropic)
    pub inertia: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Distance from the body centre down to its resting contact
    pub half_height: f32,
    pub position: Vec3,
    pub orientation: Quat,
}

impl BodyDesc {
    pub fn dynamic(mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            mass,
            inertia: mass,
            linear_damping: 0.0,
            angular_damping: 0.0,
            half_height: 0.0,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }

    pub fn kinematic() -> Self {
        Self {
            kind: BodyKind::Kinematic,
            ..Self::dynamic(0.0)
        }
    }

    pub fn fixed() -> Self {
        Self {
            kind: BodyKind::Static,
            ..Self::dynamic(0.0)
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_inertia(mut self, inertia: f32) -> Self {
        self.inertia = inertia;
        self
    }

    pub fn with_half_height(mut self, half_height: f32) -> Self {
        self.half_height = half_height;
        self
    }
}

#[derive(Debug, Clone)]
struct RigidBody {
    desc: BodyDesc,
    position: Vec3,
    orientation: Quat,
    velocity: Vec3,
    angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,
}

impl RigidBody {
    fn new(desc: BodyDesc) -> Self {
        Self {
            desc,
            position: desc.position,
            orientation: desc.orientation.normalize(),
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        }
    }

    fn is_dynamic(&self) -> bool {
        self.desc.kind == BodyKind::Dynamic && self.desc.mass > 0.0
    }

    fn inv_mass(&self) -> f32 {
        if self.is_dynamic() { 1.0 / self.desc.mass } else { 0.0 }
    }

    fn inv_inertia(&self) -> f32 {
        if self.is_dynamic() && self.desc.inertia > 0.0 {
            1.0 / self.desc.inertia
        } else {
            0.0
        }
    }
}

/// Top surface that dynamic bodies rest on while inside its footprint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Support {
    pub footprint: ArenaBounds,
    /// Height of the top surface above the platform origin
    pub top: f32,
    /// Fraction of horizontal velocity lost per second of contact
    pub friction: f32,
    /// Body whose pose carries the surface; `None` is a level plane at the origin
    #[serde(default)]
    pub platform: Option<BodyHandle>,
}

/// Support plane resolved against the platform pose for one step
#[derive(Debug, Clone, Copy)]
struct Surface {
    support: Support,
    pivot: Vec3,
    normal: Vec3,
}

impl Surface {
    /// Surface height under `position`
    fn height_at(&self, position: Vec3) -> f32 {
        let n = self.normal;
        let run = (n.x * (position.x - self.pivot.x) + n.z * (position.z - self.pivot.z)) / n.y;
        self.pivot.y + self.support.top - run
    }

    /// Gravity component along the surface plane
    fn slope(&self, gravity: Vec3) -> Vec3 {
        gravity - self.normal * gravity.dot(self.normal)
    }
}

/// Stand-in rigid-body world
#[derive(Debug, Clone)]
pub struct SimpleWorld {
    gravity: Vec3,
    bodies: Vec<RigidBody>,
    support: Option<Support>,
}

impl SimpleWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            bodies: Vec::new(),
            support: None,
        }
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(RigidBody::new(desc));
        handle
    }

    pub fn set_support(&mut self, support: Option<Support>) {
        self.support = support;
    }

    fn surface(&self) -> Option<Surface> {
        let support = self.support?;
        let (pivot, orientation) = support
            .platform
            .and_then(|handle| self.get(handle))
            .map(|p| (p.position, p.orientation))
            .unwrap_or((Vec3::ZERO, Quat::IDENTITY));
        let normal = orientation * Vec3::Y;
        // A platform tipped past vertical has no top to stand on
        (normal.y > MIN_SUPPORT_NORMAL_Y).then_some(Surface {
            support,
            pivot,
            normal,
        })
    }

    fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        let body = self.bodies.get(handle.0 as usize);
        if body.is_none() {
            log::warn!("Unknown body handle {:?}", handle);
        }
        body
    }

    fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let body = self.bodies.get_mut(handle.0 as usize);
        if body.is_none() {
            log::warn!("Unknown body handle {:?}", handle);
        }
        body
    }
}

const MIN_SUPPORT_NORMAL_Y: f32 = 0.1;

/// Exponential damping over `dt`, matching `v *= (1 - d)^dt`
#[inline]
fn damping_factor(damping: f32, dt: f32) -> f32 {
    (1.0 - damping.clamp(0.0, 1.0)).powf(dt)
}

impl PhysicsWorld for SimpleWorld {
    fn position(&self, body: BodyHandle) -> Vec3 {
        self.get(body).map(|b| b.position).unwrap_or(Vec3::ZERO)
    }

    fn orientation(&self, body: BodyHandle) -> Quat {
        self.get(body).map(|b| b.orientation).unwrap_or(Quat::IDENTITY)
    }

    fn velocity(&self, body: BodyHandle) -> Vec3 {
        self.get(body).map(|b| b.velocity).unwrap_or(Vec3::ZERO)
    }

    fn angular_velocity(&self, body: BodyHandle) -> Vec3 {
        self.get(body).map(|b| b.angular_velocity).unwrap_or(Vec3::ZERO)
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec3) {
        if let Some(b) = self.get_mut(body) {
            b.position = position;
        }
    }

    fn set_orientation(&mut self, body: BodyHandle, orientation: Quat) {
        if let Some(b) = self.get_mut(body) {
            b.orientation = orientation.normalize();
        }
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.get_mut(body) {
            b.velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, angular_velocity: Vec3) {
        if let Some(b) = self.get_mut(body) {
            b.angular_velocity = angular_velocity;
        }
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3, point: Vec3) {
        if let Some(b) = self.get_mut(body) {
            let arm = point - b.position;
            b.velocity += impulse * b.inv_mass();
            b.angular_velocity += arm.cross(impulse) * b.inv_inertia();
        }
    }

    fn apply_torque(&mut self, body: BodyHandle, torque: Vec3) {
        if let Some(b) = self.get_mut(body) {
            b.torque += torque;
        }
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec3, point: Vec3) {
        if let Some(b) = self.get_mut(body) {
            let arm = point - b.position;
            b.force += force;
            b.torque += arm.cross(force);
        }
    }

    fn step(&mut self, dt: f32) {
        let gravity = self.gravity;
        let surface = self.surface();

        for body in &mut self.bodies {
            match body.desc.kind {
                BodyKind::Static => {}
                BodyKind::Kinematic => {
                    body.position += body.velocity * dt;
                    body.orientation =
                        (Quat::from_scaled_axis(body.angular_velocity * dt) * body.orientation)
                            .normalize();
                }
                BodyKind::Dynamic => {
                    if body.is_dynamic() {
                        body.velocity += (gravity + body.force * body.inv_mass()) * dt;
                        body.angular_velocity += body.torque * body.inv_inertia() * dt;
                    }
                    body.velocity *= damping_factor(body.desc.linear_damping, dt);
                    body.angular_velocity *= damping_factor(body.desc.angular_damping, dt);

                    body.position += body.velocity * dt;
                    body.orientation =
                        (Quat::from_scaled_axis(body.angular_velocity * dt) * body.orientation)
                            .normalize();

                    if let Some(surface) = surface {
                        let rest = surface.height_at(body.position) + body.desc.half_height;
                        let inside = surface.support.footprint.contains(body.position - surface.pivot);
                        if inside && body.position.y < rest {
                            body.position.y = rest;
                            if body.velocity.y < 0.0 {
                                body.velocity.y = 0.0;
                            }
                            let keep = (1.0 - surface.support.friction * dt).max(0.0);
                            let slope = surface.slope(gravity);
                            body.velocity.x = (body.velocity.x + slope.x * dt) * keep;
                            body.velocity.z = (body.velocity.z + slope.z * dt) * keep;
                        }
                    }
                }
            }

            body.force = Vec3::ZERO;
            body.torque = Vec3::ZERO;
        }
    }
}
