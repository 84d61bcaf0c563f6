//! Referee: match lifecycle and win conditions
//!
//! WAITING -> (start) -> PLAYING -> (0 or 1 active left) -> ENDED -> (reset) -> PLAYING
//!
//! Each competitor is judged from its own pose only, so evaluation order never
//! changes the outcome. Out of bounds is checked before tipping over; whichever
//! verdict lands first is final for the rest of the match.

use glam::{EulerRot, Quat};
use serde::{Deserialize, Serialize};

use super::arena::ArenaController;
use super::body::{PhysicsWorld, Pose};
use super::competitor::{Competitor, Side, Status};
use crate::consts::FALL_THRESHOLD;

/// Match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Set up, waiting for the start action
    #[default]
    Waiting,
    /// Bouts in progress, referee judging every tick
    Playing,
    /// Decided; only a reset leaves this phase
    Ended,
}

/// How an ended match was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Winner(Side),
    Draw,
}

impl Outcome {
    pub fn winner(&self) -> Option<Side> {
        match self {
            Outcome::Winner(side) => Some(*side),
            Outcome::Draw => None,
        }
    }

    /// Result line for the UI
    pub fn announcement(&self) -> &'static str {
        match self {
            Outcome::Winner(Side::Red) => "Red wins!",
            Outcome::Winner(Side::Blue) => "Blue wins!",
            Outcome::Draw => "Draw!",
        }
    }
}

/// Notifications for the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchEvent {
    Started,
    Reset,
    StatusChanged { side: Side, status: Status },
    Ended(Outcome),
}

/// Euler axes (YZX decomposition) that count toward tipping over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipAxes {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl TipAxes {
    /// Upright on a horizontal platform: pitching or rolling tips over
    pub const HORIZONTAL: Self = Self {
        x: true,
        y: false,
        z: true,
    };
    /// Standing against a vertical wall facing +Z: rolling about Z or spinning about Y
    pub const WALL: Self = Self {
        x: false,
        y: true,
        z: true,
    };
}

impl Default for TipAxes {
    fn default() -> Self {
        Self::HORIZONTAL
    }
}

/// When a competitor counts as down
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallRule {
    pub axes: TipAxes,
    /// Radians of rotation about any selected axis
    pub threshold: f32,
}

impl Default for FallRule {
    fn default() -> Self {
        Self {
            axes: TipAxes::HORIZONTAL,
            threshold: FALL_THRESHOLD,
        }
    }
}

impl FallRule {
    pub fn is_down(&self, orientation: Quat) -> bool {
        let (y, z, x) = orientation.to_euler(EulerRot::YZX);
        (self.axes.x && x.abs() > self.threshold)
            || (self.axes.y && y.abs() > self.threshold)
            || (self.axes.z && z.abs() > self.threshold)
    }
}

/// Match state machine and adjudicator
#[derive(Debug, Clone)]
pub struct Referee {
    phase: MatchPhase,
    outcome: Option<Outcome>,
    fall: FallRule,
}

impl Referee {
    pub fn new(fall: FallRule) -> Self {
        Self {
            phase: MatchPhase::Waiting,
            outcome: None,
            fall,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Set once the match has ended
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// WAITING -> PLAYING. Returns false (and changes nothing) from any other phase.
    pub fn start(&mut self) -> bool {
        if self.phase != MatchPhase::Waiting {
            log::warn!("Start ignored in phase {:?}", self.phase);
            return false;
        }
        self.phase = MatchPhase::Playing;
        true
    }

    /// Back to PLAYING from any phase with the result cleared
    pub fn restart(&mut self) {
        self.phase = MatchPhase::Playing;
        self.outcome = None;
    }

    /// Verdict for a single pose; out of bounds takes precedence over down
    pub fn judge(&self, arena: &ArenaController, pose: Pose) -> Status {
        if arena.is_out_of_bounds(pose.position) {
            Status::Out
        } else if self.fall.is_down(pose.orientation) {
            Status::Down
        } else {
            Status::Active
        }
    }

    /// One adjudication pass. Only runs while PLAYING.
    pub fn evaluate<W: PhysicsWorld + ?Sized>(
        &mut self,
        arena: &ArenaController,
        competitors: &mut [Competitor],
        world: &W,
    ) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        if self.phase != MatchPhase::Playing {
            return events;
        }

        let mut active = 0;
        let mut candidate = None;

        for competitor in competitors.iter_mut() {
            if competitor.is_active() {
                let verdict = self.judge(arena, competitor.pose(world));
                if competitor.settle(verdict) {
                    log::info!("{} is {}", competitor.side().as_str(), verdict.label());
                    events.push(MatchEvent::StatusChanged {
                        side: competitor.side(),
                        status: verdict,
                    });
                }
            }

            if competitor.is_active() {
                active += 1;
                candidate = Some(competitor.side());
            }
        }

        let outcome = match (active, candidate) {
            (1, Some(side)) => Some(Outcome::Winner(side)),
            (0, _) => Some(Outcome::Draw),
            _ => None,
        };

        if let Some(outcome) = outcome {
            log::info!("Match over: {}", outcome.announcement());
            self.phase = MatchPhase::Ended;
            self.outcome = Some(outcome);
            events.push(MatchEvent::Ended(outcome));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::arena::{ArenaBounds, ArenaConfig, TiltConfig};
    use crate::sim::body::{BodyProxy, VisualHandle};
    use crate::sim::world::{BodyDesc, SimpleWorld};
    use glam::Vec3;
    use proptest::prelude::*;

    struct Ring {
        world: SimpleWorld,
        arena: ArenaController,
        competitors: Vec<Competitor>,
    }

    fn ring(red: Pose, blue: Pose) -> Ring {
        let mut world = SimpleWorld::new(Vec3::ZERO);
        let platform = world.add_body(BodyDesc::kinematic());
        let arena = ArenaController::new(
            BodyProxy::new(platform, VisualHandle(0)),
            ArenaConfig {
                bounds: ArenaBounds::Circle { radius: 5.0 },
                floor_y: Some(-5.0),
                surface_y: 0.0,
                kinematic: false,
            },
            TiltConfig::default(),
            Quat::IDENTITY,
        );
        let mut competitors = Vec::new();
        for (i, (side, pose)) in [(Side::Red, red), (Side::Blue, blue)].into_iter().enumerate() {
            let body = world.add_body(BodyDesc::dynamic(0.15).at(pose.position));
            world.set_orientation(body, pose.orientation);
            competitors.push(Competitor::new(
                side,
                BodyProxy::new(body, VisualHandle(i as u32 + 1)),
                pose,
            ));
        }
        Ring {
            world,
            arena,
            competitors,
        }
    }

    fn playing() -> Referee {
        let mut referee = Referee::new(FallRule::default());
        assert!(referee.start());
        referee
    }

    #[test]
    fn test_lifecycle() {
        let mut referee = Referee::new(FallRule::default());
        assert_eq!(referee.phase(), MatchPhase::Waiting);
        assert!(referee.start());
        assert_eq!(referee.phase(), MatchPhase::Playing);
        assert!(!referee.start());
        referee.restart();
        assert_eq!(referee.phase(), MatchPhase::Playing);
        assert_eq!(referee.outcome(), None);
    }

    #[test]
    fn test_no_judging_while_waiting() {
        let mut r = ring(Pose::at(Vec3::new(10.0, 2.0, 0.0)), Pose::at(Vec3::new(2.0, 2.0, 0.0)));
        let mut referee = Referee::new(FallRule::default());
        let events = referee.evaluate(&r.arena, &mut r.competitors, &r.world);
        assert!(events.is_empty());
        assert!(r.competitors.iter().all(|c| c.is_active()));
    }

    #[test]
    fn test_both_inside_keeps_playing() {
        let mut r = ring(Pose::at(Vec3::new(-2.0, 2.0, 0.0)), Pose::at(Vec3::new(2.0, 2.0, 0.0)));
        let mut referee = playing();
        let events = referee.evaluate(&r.arena, &mut r.competitors, &r.world);
        assert!(events.is_empty());
        assert_eq!(referee.phase(), MatchPhase::Playing);
        assert!(r.competitors.iter().all(|c| c.status() == Status::Active));
    }

    #[test]
    fn test_tipped_competitor_is_down() {
        let tipped = Pose::new(Vec3::new(-2.0, 2.0, 0.0), Quat::from_rotation_z(1.2));
        let mut r = ring(tipped, Pose::at(Vec3::new(2.0, 2.0, 0.0)));
        let mut referee = playing();
        let events = referee.evaluate(&r.arena, &mut r.competitors, &r.world);
        assert_eq!(r.competitors[0].status(), Status::Down);
        assert_eq!(
            events,
            vec![
                MatchEvent::StatusChanged {
                    side: Side::Red,
                    status: Status::Down
                },
                MatchEvent::Ended(Outcome::Winner(Side::Blue)),
            ]
        );
    }

    #[test]
    fn test_out_beats_down_in_same_tick() {
        let both = Pose::new(Vec3::new(9.0, 2.0, 0.0), Quat::from_rotation_x(1.5));
        let mut r = ring(both, Pose::at(Vec3::new(2.0, 2.0, 0.0)));
        let mut referee = playing();
        referee.evaluate(&r.arena, &mut r.competitors, &r.world);
        assert_eq!(r.competitors[0].status(), Status::Out);
    }

    #[test]
    fn test_spin_about_vertical_is_not_a_fall() {
        let rule = FallRule::default();
        assert!(!rule.is_down(Quat::from_rotation_y(2.5)));
        assert!(!rule.is_down(Quat::from_rotation_x(0.7)));
        assert!(rule.is_down(Quat::from_rotation_x(0.9)));
        assert!(rule.is_down(Quat::from_rotation_z(-0.9)));

        let wall = FallRule {
            axes: TipAxes::WALL,
            threshold: std::f32::consts::FRAC_PI_2,
        };
        assert!(!wall.is_down(Quat::from_rotation_x(1.2)));
        assert!(wall.is_down(Quat::from_rotation_y(2.0)));
    }

    #[test]
    fn test_fell_through_floor() {
        let mut r = ring(Pose::at(Vec3::new(0.0, -8.0, 0.0)), Pose::at(Vec3::new(2.0, 2.0, 0.0)));
        let mut referee = playing();
        referee.evaluate(&r.arena, &mut r.competitors, &r.world);
        assert_eq!(r.competitors[0].status(), Status::Out);
        assert_eq!(referee.outcome(), Some(Outcome::Winner(Side::Blue)));
    }

    #[test]
    fn test_ended_match_is_frozen() {
        let mut r = ring(Pose::at(Vec3::new(10.0, 2.0, 0.0)), Pose::at(Vec3::new(2.0, 2.0, 0.0)));
        let mut referee = playing();
        referee.evaluate(&r.arena, &mut r.competitors, &r.world);
        assert_eq!(referee.phase(), MatchPhase::Ended);

        let blue = r.competitors[1].proxy().body;
        r.world.set_position(blue, Vec3::new(20.0, 2.0, 0.0));
        let events = referee.evaluate(&r.arena, &mut r.competitors, &r.world);
        assert!(events.is_empty());
        assert_eq!(r.competitors[1].status(), Status::Active);
        assert_eq!(referee.outcome(), Some(Outcome::Winner(Side::Blue)));
    }

    fn pose_strategy() -> impl Strategy<Value = Pose> {
        (-8.0f32..8.0, -8.0f32..4.0, -8.0f32..8.0, -3.0f32..3.0, -3.0f32..3.0, -3.0f32..3.0)
            .prop_map(|(x, y, z, rx, ry, rz)| {
                let orientation = Quat::from_euler(EulerRot::YZX, ry, rz, rx);
                Pose::new(Vec3::new(x, y, z), orientation)
            })
    }

    proptest! {
        #[test]
        fn prop_order_does_not_matter(red in pose_strategy(), blue in pose_strategy()) {
            let mut forward = ring(red, blue);
            let mut backward = ring(red, blue);
            backward.competitors.reverse();

            let mut ref_fwd = playing();
            let mut ref_bwd = playing();
            ref_fwd.evaluate(&forward.arena, &mut forward.competitors, &forward.world);
            ref_bwd.evaluate(&backward.arena, &mut backward.competitors, &backward.world);

            backward.competitors.reverse();
            for (a, b) in forward.competitors.iter().zip(&backward.competitors) {
                prop_assert_eq!(a.side(), b.side());
                prop_assert_eq!(a.status(), b.status());
            }
            prop_assert_eq!(ref_fwd.phase(), ref_bwd.phase());
            prop_assert_eq!(ref_fwd.outcome(), ref_bwd.outcome());
        }

        #[test]
        fn prop_status_is_absorbing(poses in proptest::collection::vec(pose_strategy(), 1..12)) {
            let mut r = ring(Pose::at(Vec3::new(-2.0, 2.0, 0.0)), Pose::at(Vec3::new(2.0, 2.0, 0.0)));
            let mut referee = playing();
            let red = r.competitors[0].proxy().body;
            let mut settled: Option<Status> = None;

            for pose in poses {
                r.world.set_position(red, pose.position);
                r.world.set_orientation(red, pose.orientation);
                referee.evaluate(&r.arena, &mut r.competitors, &r.world);
                // Keep judging after the match ends to exercise the frozen path too
                if referee.phase() == MatchPhase::Ended {
                    referee.restart();
                }

                let now = r.competitors[0].status();
                match settled {
                    Some(first) => {
                        prop_assert_eq!(now, first);
                    }
                    None if now != Status::Active => settled = Some(now),
                    None => {}
                }
            }
        }
    }
}
