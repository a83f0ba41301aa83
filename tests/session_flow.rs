use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use signpose::config::Profile;
use signpose::detector::HandSide;
use signpose::error::InjectionError;
use signpose::hold::HoldState;
use signpose::injector::PoseBinding;
use signpose::learn::LearnMode;
use signpose::pipeline::build_detectors;
use signpose::session::GestureSessionController;
use signpose::sim::HandWorld;

const PROFILE: &str = r#"
[timing]
dwell_ms = 800

[[detectors]]
name = "LeftHand_Gesture"
storage = "slot"
reinit = "both"

[[detectors]]
name = "RightHand_Gesture"
storage = "legacy_slot"
reinit = "initialize"

[[detectors]]
name = "OrphanGesture"
storage = "none"
reinit = "none"

[[poses]]
name = "A"
hand_shape = "fist"

[[poses]]
name = "B"
hand_shape = "flat"

[[poses]]
name = "L"
hand_shape = "l"
"#;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

struct Rig {
    world: HandWorld,
    ctl: GestureSessionController,
    t0: Instant,
}

impl Rig {
    fn new() -> (Self, Profile) {
        let profile = Profile::parse(PROFILE).expect("profile is valid");
        let world = HandWorld::default();
        let ctl = GestureSessionController::new(build_detectors(&profile, &world), profile.dwell());
        let rig = Self {
            world,
            ctl,
            t0: Instant::now(),
        };
        (rig, profile)
    }

    /// Poll detectors and tick at `t` ms; returns how many matches fired.
    fn frame(&mut self, t: u64) -> usize {
        let now = self.t0 + ms(t);
        let mut n = self.ctl.poll_detectors(now).len();
        n += usize::from(self.ctl.tick(now).is_some());
        n
    }

    fn run_until(&mut self, from: u64, to: u64) -> usize {
        (from..=to).step_by(10).map(|t| self.frame(t)).sum()
    }
}

#[test]
fn detectors_bind_through_the_fallback_chain() {
    let (rig, _) = Rig::new();
    let handles = rig.ctl.handles();
    assert_eq!(handles[0].binding(), Some(PoseBinding::Slot("hand_shape_or_pose")));
    assert_eq!(handles[1].binding(), Some(PoseBinding::Slot("hand_pose")));
    assert_eq!(handles[2].binding(), None);
    assert_eq!(handles[2].hand_side(), HandSide::Right, "unnamed side defaults to right");
}

#[test]
fn one_inert_detector_does_not_block_the_session() {
    let (mut rig, profile) = Rig::new();
    let library = profile.library();
    let start = rig
        .ctl
        .set_entry(Some(library.get(0).expect("in range").clone()));
    assert_eq!(start.injected, 2);
    assert_eq!(
        start.failures,
        vec![InjectionError::NoWritableSlot {
            detector: "OrphanGesture".into()
        }]
    );

    rig.world.show(HandSide::Left, "fist");
    assert_eq!(rig.run_until(0, 790), 0);
    assert_eq!(rig.frame(800), 1);
    assert_eq!(rig.run_until(810, 3000), 0, "held pose fires once");
}

#[test]
fn scenario_cross_hand_hold() {
    let (mut rig, profile) = Rig::new();
    let library = profile.library();
    rig.ctl
        .set_entry(Some(library.get(0).expect("in range").clone()));

    rig.world.show(HandSide::Left, "fist");
    assert_eq!(rig.frame(0), 0);
    rig.world.show(HandSide::Right, "fist");
    assert_eq!(rig.run_until(10, 200), 0);
    rig.world.lower(HandSide::Left);
    assert_eq!(rig.run_until(210, 500), 0);
    assert!(rig.ctl.is_holding());
    assert_eq!(rig.run_until(510, 790), 0);
    assert_eq!(rig.frame(800), 1, "fires at the first arm + dwell");
    assert_eq!(rig.ctl.hold_state(), HoldState::Fired);
}

#[test]
fn scenario_short_hold_never_fires() {
    let (mut rig, profile) = Rig::new();
    let library = profile.library();
    rig.ctl
        .set_entry(Some(library.get(1).expect("in range").clone()));

    rig.world.show(HandSide::Right, "flat");
    assert_eq!(rig.run_until(0, 490), 0);
    rig.world.lower(HandSide::Right);
    assert_eq!(rig.run_until(500, 3000), 0);
    assert_eq!(rig.ctl.hold_state(), HoldState::Idle);
}

#[test]
fn learn_mode_walks_the_library() {
    let (mut rig, profile) = Rig::new();
    let library = profile.library();
    let mut learn = LearnMode::new(StdRng::seed_from_u64(42));
    learn.toggle_mode();
    learn
        .select_next(&library, &mut rig.ctl)
        .expect("library is not empty");

    // show whatever is asked for with the left hand, then drop the hand
    let mut t = 0;
    for _ in 0..5 {
        let shape = rig
            .ctl
            .session()
            .current_definition()
            .map(|p| p.hand_shape().to_string())
            .expect("a pose is selected");
        rig.world.show(HandSide::Left, shape);
        let fired = rig.run_until(t, t + 800);
        assert_eq!(fired, 1, "pose matched after one dwell");
        learn
            .on_pose_matched(&library, &mut rig.ctl)
            .expect("library is not empty");
        rig.world.lower(HandSide::Left);
        t += 1000;
        rig.run_until(t - 190, t - 10);
    }
    assert_eq!(learn.score(), 5);
    assert_eq!(rig.ctl.session().id(), 6);
}
