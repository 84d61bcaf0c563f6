//! Match session and the fixed-step match loop
//!
//! A [`MatchSession`] owns everything one match needs: the physics world,
//! arena, both competitors, the input mapper and the referee. The driver
//! calls [`MatchSession::tick`] once per fixed step; UI events go through
//! the input methods, which only buffer work for the next tick.

use glam::Vec3;

use super::arena::ArenaController;
use super::body::{BodyProxy, PhysicsWorld, Pose, VisualHandle, VisualSink};
use super::competitor::{Competitor, Side, Status};
use super::input::{InputError, InputMapper, MotionPermission, MotionSample, Stimulus, TapZone};
use super::referee::{MatchEvent, MatchPhase, Outcome, Referee};
use super::world::{BodyDesc, SimpleWorld, Support};
use crate::config::MatchConfig;
use crate::consts::MAX_SUBSTEPS;

/// Friction of the headless support surface (fraction of horizontal speed lost per second)
const HEADLESS_FRICTION: f32 = 1.0;

/// One match: world, arena, two competitors, input and referee
#[derive(Debug)]
pub struct MatchSession<W: PhysicsWorld> {
    config: MatchConfig,
    world: W,
    arena: ArenaController,
    /// Red first, then Blue
    competitors: Vec<Competitor>,
    mapper: InputMapper,
    referee: Referee,
    /// Stimuli waiting for the next tick boundary
    pending: Vec<Stimulus>,
    time_ticks: u64,
}

impl<W: PhysicsWorld> MatchSession<W> {
    /// Wrap bodies already registered with `world`. Competitors are placed at
    /// their configured start poses and the arena is levelled.
    pub fn new(config: MatchConfig, mut world: W, platform: BodyProxy, red: BodyProxy, blue: BodyProxy) -> Self {
        let mut arena = ArenaController::new(
            platform,
            config.arena,
            config.tilt,
            world.orientation(platform.body),
        );
        let mut competitors = vec![
            Competitor::new(Side::Red, red, Pose::at(config.competitors.start(Side::Red))),
            Competitor::new(Side::Blue, blue, Pose::at(config.competitors.start(Side::Blue))),
        ];
        let mapper = InputMapper::new(config.input_mode, config.impulse, config.motion, config.seed);
        let referee = Referee::new(config.fall);

        arena.reset(&mut world);
        for competitor in &mut competitors {
            competitor.reset(&mut world);
        }

        log::info!(
            "Match session ready: preset={}, input={:?}, seed={}",
            config.preset.as_str(),
            config.input_mode,
            config.seed
        );

        Self {
            config,
            world,
            arena,
            competitors,
            mapper,
            referee,
            pending: Vec::new(),
            time_ticks: 0,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.referee.phase()
    }

    /// Winner or draw once the match has ended
    pub fn outcome(&self) -> Option<Outcome> {
        self.referee.outcome()
    }

    pub fn status(&self, side: Side) -> Status {
        self.competitor(side).map(|c| c.status()).unwrap_or_default()
    }

    pub fn competitor(&self, side: Side) -> Option<&Competitor> {
        self.competitors.iter().find(|c| c.side() == side)
    }

    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    pub fn arena(&self) -> &ArenaController {
        &self.arena
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Direct world access for the engine owner (debug placement, scripted tests)
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    /// Start action: WAITING -> PLAYING
    pub fn start(&mut self) -> Vec<MatchEvent> {
        if self.referee.start() {
            log::info!("Match started");
            vec![MatchEvent::Started]
        } else {
            Vec::new()
        }
    }

    /// Reset action: both competitors and the arena back to their initial
    /// state and the match straight into PLAYING, whatever phase it was in.
    pub fn reset(&mut self) -> Vec<MatchEvent> {
        self.arena.reset(&mut self.world);
        for competitor in &mut self.competitors {
            competitor.reset(&mut self.world);
        }
        self.mapper.reset();
        self.pending.clear();
        self.referee.restart();
        log::info!("Match reset");
        vec![MatchEvent::Reset]
    }

    /// Report the motion-sensor permission. Errors are for the UI to show;
    /// tap input keeps working regardless.
    pub fn set_motion_permission(&mut self, permission: MotionPermission) -> Result<(), InputError> {
        let result = self.mapper.set_permission(permission);
        if let Err(e) = &result {
            log::warn!("Motion input disabled: {}", e);
        }
        result
    }

    /// Tap by zone identifier as delivered by the UI. Unknown ids are ignored.
    pub fn tap_id(&mut self, id: &str) {
        match TapZone::from_id(id) {
            Some(zone) => self.tap(zone),
            None => log::warn!("Ignoring tap on unknown zone {:?}", id),
        }
    }

    pub fn tap(&mut self, zone: TapZone) {
        if self.phase() != MatchPhase::Playing {
            log::debug!("Tap {} ignored outside play", zone.as_str());
            return;
        }
        match self.mapper.map_tap(zone) {
            // The tilt target is buffered state the arena consumes on its next tick
            Stimulus::Tilt { dx, dz } => self.arena.set_tilt_target(dx, dz),
            stimulus => {
                log::debug!("Tap {} -> {:?}", zone.as_str(), stimulus);
                self.pending.push(stimulus);
            }
        }
    }

    pub fn motion(&mut self, sample: MotionSample) {
        if self.phase() != MatchPhase::Playing {
            return;
        }
        if let Some(stimulus) = self.mapper.map_motion(sample) {
            self.pending.push(stimulus);
        }
    }

    /// One fixed step: buffered stimuli, arena control loop, physics step,
    /// referee, then visual sync.
    pub fn tick<V: VisualSink + ?Sized>(&mut self, scene: &mut V) -> Vec<MatchEvent> {
        let phase = self.phase();

        let pending = std::mem::take(&mut self.pending);
        if phase == MatchPhase::Playing {
            for stimulus in pending {
                self.apply(stimulus);
            }
        }

        self.arena.tick(&mut self.world, phase);
        self.world.step(self.config.dt);
        let events = self
            .referee
            .evaluate(&self.arena, &mut self.competitors, &self.world);

        self.arena.sync(&self.world, scene);
        for competitor in &self.competitors {
            competitor.sync(&self.world, scene);
        }

        self.time_ticks += 1;
        events
    }

    /// Run as many fixed steps as `frame_dt` allows, carrying the remainder
    pub fn advance<V: VisualSink + ?Sized>(
        &mut self,
        clock: &mut FrameClock,
        frame_dt: f32,
        scene: &mut V,
    ) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        for _ in 0..clock.steps(frame_dt, self.config.dt) {
            events.extend(self.tick(scene));
        }
        events
    }

    fn apply(&mut self, stimulus: Stimulus) {
        let world = &mut self.world;
        match stimulus {
            Stimulus::Tilt { dx, dz } => self.arena.set_tilt_target(dx, dz),
            Stimulus::Push { impulse, torque } => {
                for competitor in self.competitors.iter().filter(|c| c.is_active()) {
                    let centre = competitor.pose(&*world).position;
                    competitor.apply_impulse(world, impulse, centre);
                    competitor.apply_torque(world, torque);
                }
            }
            Stimulus::Shake {
                force,
                torque,
                impulse,
            } => {
                for competitor in self.competitors.iter().filter(|c| c.is_active()) {
                    let centre = competitor.pose(&*world).position;
                    competitor.apply_force(world, force, centre);
                    competitor.apply_torque(world, torque);
                    if let Some(impulse) = impulse {
                        competitor.apply_impulse(world, impulse, centre);
                    }
                }
            }
        }
    }
}

impl MatchSession<SimpleWorld> {
    /// Session on the built-in stand-in world, for headless runs and tests
    pub fn headless(config: MatchConfig) -> Self {
        let mut world = SimpleWorld::new(Vec3::new(0.0, config.gravity, 0.0));
        let platform = world.add_body(if config.arena.kinematic {
            BodyDesc::kinematic()
        } else {
            BodyDesc::fixed()
        });
        world.set_support(Some(Support {
            footprint: config.arena.bounds,
            top: config.arena.surface_y,
            friction: HEADLESS_FRICTION,
            platform: Some(platform),
        }));

        let c = config.competitors;
        let mut body = |side: Side| {
            world.add_body(
                BodyDesc::dynamic(c.mass)
                    .with_damping(c.linear_damping, c.angular_damping)
                    .with_half_height(c.half_height)
                    .at(c.start(side)),
            )
        };
        let red = body(Side::Red);
        let blue = body(Side::Blue);

        Self::new(
            config,
            world,
            BodyProxy::new(platform, VisualHandle(0)),
            BodyProxy::new(red, VisualHandle(1)),
            BodyProxy::new(blue, VisualHandle(2)),
        )
    }
}

/// Fixed-timestep accumulator for a variable-rate frame driver
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    accumulator: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fixed steps due this frame (capped to avoid a spiral of death)
    pub fn steps(&mut self, frame_dt: f32, dt: f32) -> u32 {
        if dt <= 0.0 || !dt.is_finite() {
            return 0;
        }
        // A broken frame timestamp counts as no time passing
        let frame_dt = if frame_dt.is_finite() { frame_dt } else { 0.0 };
        self.accumulator += frame_dt.clamp(0.0, 0.1);

        let mut steps = 0;
        while self.accumulator >= dt && steps < MAX_SUBSTEPS {
            self.accumulator -= dt;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(dt);
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaPreset;
    use crate::consts::RING_RADIUS;
    use crate::sim::arena::Tilt;
    use crate::sim::body::Headless;
    use glam::Quat;

    fn playing(preset: ArenaPreset) -> MatchSession<SimpleWorld> {
        let mut session = MatchSession::headless(MatchConfig::from_preset(preset));
        assert_eq!(session.start(), vec![MatchEvent::Started]);
        session
    }

    fn body(session: &MatchSession<SimpleWorld>, side: Side) -> crate::sim::BodyHandle {
        session.competitor(side).map(|c| c.proxy().body).unwrap()
    }

    struct Recorder(Vec<VisualHandle>);

    impl VisualSink for Recorder {
        fn sync_pose(&mut self, visual: VisualHandle, _position: Vec3, _orientation: Quat) {
            self.0.push(visual);
        }
    }

    #[test]
    fn test_waits_for_start() {
        let mut session = MatchSession::headless(MatchConfig::default());
        assert_eq!(session.phase(), MatchPhase::Waiting);
        session.tick(&mut Headless);
        assert_eq!(session.phase(), MatchPhase::Waiting);
        assert!(session.start().len() == 1);
        assert!(session.start().is_empty());
        assert_eq!(session.phase(), MatchPhase::Playing);
    }

    #[test]
    fn test_both_inside_and_upright_keeps_playing() {
        let mut session = playing(ArenaPreset::Dohyo);
        for _ in 0..10 {
            assert!(session.tick(&mut Headless).is_empty());
        }
        assert_eq!(session.phase(), MatchPhase::Playing);
        assert_eq!(session.status(Side::Red), Status::Active);
        assert_eq!(session.status(Side::Blue), Status::Active);
        assert_eq!(session.outcome(), None);
    }

    #[test]
    fn test_ring_out_gives_opponent_the_win() {
        let mut session = playing(ArenaPreset::Dohyo);
        let red = body(&session, Side::Red);
        session
            .world_mut()
            .set_position(red, Vec3::new(RING_RADIUS * 2.0, 2.0, 0.0));

        let events = session.tick(&mut Headless);

        assert_eq!(session.status(Side::Red), Status::Out);
        assert_eq!(session.status(Side::Blue), Status::Active);
        assert_eq!(session.phase(), MatchPhase::Ended);
        assert_eq!(session.outcome(), Some(Outcome::Winner(Side::Blue)));
        assert!(events.contains(&MatchEvent::Ended(Outcome::Winner(Side::Blue))));
    }

    #[test]
    fn test_double_ring_out_is_a_draw() {
        let mut session = playing(ArenaPreset::Dohyo);
        let red = body(&session, Side::Red);
        let blue = body(&session, Side::Blue);
        session.world_mut().set_position(red, Vec3::new(-10.0, 2.0, 0.0));
        session.world_mut().set_position(blue, Vec3::new(0.0, 2.0, 10.0));

        session.tick(&mut Headless);

        assert_eq!(session.phase(), MatchPhase::Ended);
        assert_eq!(session.outcome(), Some(Outcome::Draw));
        assert_eq!(session.outcome().and_then(|o| o.winner()), None);
    }

    #[test]
    fn test_tilt_tap_sets_target_before_any_tick() {
        let mut session = playing(ArenaPreset::TiltingDohyo);
        assert_eq!(session.config().tilt.amount, 0.1);

        session.tap(TapZone::TopLeft);

        assert_eq!(session.arena().target_tilt(), Tilt::new(-0.1, 0.1));
        assert_eq!(session.arena().current_tilt(), Tilt::ZERO);
    }

    #[test]
    fn test_tilt_tap_tilts_platform_on_tick() {
        let mut session = playing(ArenaPreset::TiltingDohyo);
        let platform = session.arena().proxy().body;
        session.tap(TapZone::BottomRight);
        session.tick(&mut Headless);

        let tilt = session.arena().current_tilt();
        assert!(tilt.x > 0.0 && tilt.z < 0.0);
        assert!(
            session
                .world()
                .orientation(platform)
                .abs_diff_eq(tilt.rotation(), 1e-5)
        );
    }

    #[test]
    fn test_impulse_tap_applies_on_next_tick() {
        let mut session = playing(ArenaPreset::Dohyo);
        let red = body(&session, Side::Red);
        let blue = body(&session, Side::Blue);

        session.tap(TapZone::TopLeft);
        // Buffered until the tick boundary
        assert_eq!(session.world().velocity(red), Vec3::ZERO);

        session.tick(&mut Headless);
        for handle in [red, blue] {
            let v = session.world().velocity(handle);
            assert!(v.x > 0.0 && v.z > 0.0, "velocity {v:?}");
        }
    }

    #[test]
    fn test_taps_ignored_outside_play() {
        let mut session = MatchSession::headless(MatchConfig::from_preset(ArenaPreset::TiltingDohyo));
        session.tap(TapZone::TopRight);
        assert_eq!(session.arena().target_tilt(), Tilt::ZERO);

        let mut session = MatchSession::headless(MatchConfig::default());
        session.tap(TapZone::TopRight);
        session.start();
        session.tick(&mut Headless);
        let red = body(&session, Side::Red);
        assert_eq!(session.world().velocity(red).x, 0.0);
    }

    #[test]
    fn test_unknown_zone_is_noop() {
        let mut session = playing(ArenaPreset::TiltingDohyo);
        session.tap_id("center");
        session.tap_id("");
        assert_eq!(session.arena().target_tilt(), Tilt::ZERO);
        session.tap_id("top-right");
        assert_eq!(session.arena().target_tilt(), Tilt::new(0.1, 0.1));
    }

    #[test]
    fn test_reset_restores_initial_conditions() {
        let mut session = playing(ArenaPreset::TiltingDohyo);
        session.tap(TapZone::TopLeft);
        for _ in 0..5 {
            session.tick(&mut Headless);
        }
        let red = body(&session, Side::Red);
        session.world_mut().set_position(red, Vec3::new(20.0, 0.0, 0.0));
        session.world_mut().set_velocity(red, Vec3::new(3.0, -1.0, 0.0));
        session.tick(&mut Headless);
        assert_eq!(session.phase(), MatchPhase::Ended);

        assert_eq!(session.reset(), vec![MatchEvent::Reset]);

        assert_eq!(session.phase(), MatchPhase::Playing);
        assert_eq!(session.outcome(), None);
        assert_eq!(session.arena().current_tilt(), Tilt::ZERO);
        assert_eq!(session.arena().target_tilt(), Tilt::ZERO);
        let platform = session.arena().proxy().body;
        assert!(session.world().orientation(platform).abs_diff_eq(Quat::IDENTITY, 1e-6));
        for competitor in session.competitors() {
            let handle = competitor.proxy().body;
            assert_eq!(competitor.status(), Status::Active);
            assert_eq!(session.world().position(handle), competitor.start_pose().position);
            assert_eq!(session.world().velocity(handle), Vec3::ZERO);
            assert_eq!(session.world().angular_velocity(handle), Vec3::ZERO);
        }
    }

    #[test]
    fn test_reset_from_waiting_starts_play() {
        let mut session = MatchSession::headless(MatchConfig::default());
        session.reset();
        assert_eq!(session.phase(), MatchPhase::Playing);
    }

    #[test]
    fn test_motion_permission_denied_keeps_taps() {
        let mut session = playing(ArenaPreset::ShakeTable);
        assert_eq!(
            session.set_motion_permission(MotionPermission::Denied),
            Err(InputError::MotionDenied)
        );
        let red = body(&session, Side::Red);

        session.motion(MotionSample::new(0.0, 0.0, 50.0));
        session.tick(&mut Headless);
        assert_eq!(session.world().velocity(red).z, 0.0);

        session.tap(TapZone::BottomLeft);
        session.tick(&mut Headless);
        assert!(session.world().velocity(red).x > 0.0);
    }

    #[test]
    fn test_motion_sample_pushes_competitors() {
        let mut session = playing(ArenaPreset::ShakeTable);
        assert!(session.set_motion_permission(MotionPermission::Granted).is_ok());
        let red = body(&session, Side::Red);

        session.motion(MotionSample::new(0.0, 0.0, 0.0));
        session.motion(MotionSample::new(0.0, 0.0, 10.0));
        session.tick(&mut Headless);

        assert!(session.world().velocity(red).z > 0.0);
    }

    #[test]
    fn test_visuals_synced_once_per_tick() {
        let mut session = playing(ArenaPreset::Dohyo);
        let mut scene = Recorder(Vec::new());
        session.tick(&mut scene);
        assert_eq!(scene.0, vec![VisualHandle(0), VisualHandle(1), VisualHandle(2)]);
        session.tick(&mut scene);
        assert_eq!(scene.0.len(), 6);
    }

    #[test]
    fn test_determinism() {
        // Two sessions with the same seed and inputs stay identical
        let mut a = playing(ArenaPreset::Dohyo);
        let mut b = playing(ArenaPreset::Dohyo);
        let taps = [TapZone::TopLeft, TapZone::BottomRight, TapZone::TopRight];

        for zone in taps {
            a.tap(zone);
            b.tap(zone);
            for _ in 0..3 {
                a.tick(&mut Headless);
                b.tick(&mut Headless);
            }
        }

        assert_eq!(a.time_ticks(), b.time_ticks());
        for side in Side::ALL {
            assert_eq!(
                a.world().pose(body(&a, side)),
                b.world().pose(body(&b, side))
            );
            assert_eq!(a.status(side), b.status(side));
        }
    }

    #[test]
    fn test_frame_clock_caps_substeps() {
        let mut clock = FrameClock::new();
        let dt = 1.0 / 60.0;
        assert_eq!(clock.steps(dt * 0.5, dt), 0);
        assert_eq!(clock.steps(dt * 0.6, dt), 1);
        assert!(clock.steps(10.0, dt) <= MAX_SUBSTEPS);
    }

    #[test]
    fn test_frame_clock_survives_bad_timestamps() {
        let mut clock = FrameClock::new();
        let dt = 1.0 / 60.0;
        assert_eq!(clock.steps(f32::NAN, dt), 0);
        assert_eq!(clock.steps(f32::INFINITY, dt), 0);
        assert_eq!(clock.steps(2.5 * dt, dt), 2);
    }

    #[test]
    fn test_tilt_taps_slide_competitors_out() {
        let mut session = playing(ArenaPreset::TiltingDohyo);
        let red = body(&session, Side::Red);
        let start = session.world().position(red);

        for t in 0..3000 {
            if t % 5 == 0 {
                session.tap(TapZone::TopLeft);
            }
            session.tick(&mut Headless);
            if session.outcome().is_some() {
                break;
            }
        }

        // Top-left is -X/-Z: Red starts nearer the -X edge and goes out first
        let end = session.world().position(red);
        assert!(end.x < start.x && end.z < start.z, "start {start:?} end {end:?}");
        assert_eq!(session.status(Side::Red), Status::Out);
        assert_eq!(session.outcome(), Some(Outcome::Winner(Side::Blue)));
    }

    #[test]
    fn test_level_ring_holds_competitors_still() {
        let mut session = playing(ArenaPreset::Dohyo);
        let red = body(&session, Side::Red);
        for _ in 0..120 {
            session.tick(&mut Headless);
        }
        let p = session.world().position(red);
        assert!((p.x + 2.0).abs() < 1e-4 && p.z.abs() < 1e-4, "drifted to {p:?}");
    }

    #[test]
    fn test_advance_runs_whole_steps() {
        let mut session = playing(ArenaPreset::Dohyo);
        let mut clock = FrameClock::new();
        session.advance(&mut clock, 3.5 / 60.0, &mut Headless);
        assert_eq!(session.time_ticks(), 3);
    }
}
