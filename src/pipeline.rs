use anyhow::Result;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::{
    cell::RefCell,
    rc::Rc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use crate::config::Profile;
use crate::detector::{Detector, EntryPoint};
use crate::injector::{PoseBinding, PoseInjector};
use crate::learn::{LearnMode, Mode};
use crate::library::{PoseLibrary, PoseSelector};
use crate::pose::PoseEntry;
use crate::session::{EntryView, GestureSessionController};
use crate::sim::{HandWorld, Script, SimDetector, StepAction};

/// How the next pose is chosen after a match.
#[derive(Debug, Clone, Copy)]
pub enum Selection {
    /// Random non-repeating poses; optionally starts in quiz mode.
    Learn { quiz: bool, seed: Option<u64> },
    /// Hold one library index for the whole run.
    Fixed(usize),
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub script: Script,
    pub selection: Selection,
    /// Pace frames against the wall clock instead of replaying instantly.
    pub realtime: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub at_ms: u64,
    pub session: u64,
    pub pose: Option<String>,
    pub held_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub profile: Option<String>,
    pub frames: u64,
    pub elapsed_ms: u64,
    pub sessions: u64,
    pub mode: Option<Mode>,
    pub score: Option<u32>,
    pub injection_failures: usize,
    pub matches: Vec<MatchRecord>,
}

/// Logs what a UI would display.
struct LogView;

impl EntryView for LogView {
    fn show_entry(&mut self, entry: Option<&PoseEntry>) {
        match entry {
            Some(e) => info!("[ui] {}: {}", e.name, e.description),
            None => info!("[ui] No pose selected"),
        }
    }

    fn show_holding(&mut self, holding: bool) {
        info!("[ui] border {}", if holding { "glowing" } else { "normal" });
    }
}

pub fn build_detectors(profile: &Profile, world: &HandWorld) -> Vec<Box<dyn Detector>> {
    profile
        .detectors
        .iter()
        .map(|d| {
            Box::new(SimDetector::new(d.name.clone(), d.storage, d.reinit, world.clone()))
                as Box<dyn Detector>
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectorReport {
    pub name: String,
    pub hand_side: &'static str,
    pub binding: Option<PoseBinding>,
    pub reinit: Option<EntryPoint>,
}

/// Resolve storage and re-init shapes of the profile's detectors.
pub fn probe_detectors(profile: &Profile) -> Vec<DetectorReport> {
    let ctl = GestureSessionController::with_injector(
        build_detectors(profile, &HandWorld::default()),
        profile.dwell(),
        PoseInjector::default(),
    );
    ctl.handles()
        .iter()
        .map(|h| DetectorReport {
            name: h.name().to_string(),
            hand_side: h.hand_side().as_str(),
            binding: h.binding(),
            reinit: h.reinit(),
        })
        .collect()
}

/// Replay `opts.script` through the profile's detectors frame by frame.
pub fn run(profile: &Profile, opts: RunOptions, stop: &AtomicBool) -> Result<RunSummary> {
    let world = HandWorld::default();
    let library = profile.library();
    let mut ctl = GestureSessionController::new(build_detectors(profile, &world), profile.dwell());
    ctl.set_view(Box::new(LogView));

    let start = Instant::now();
    let matches = Rc::new(RefCell::new(Vec::new()));
    let sink = matches.clone();
    let _sub = ctl.subscribe(move |m| {
        sink.borrow_mut().push(MatchRecord {
            at_ms: m.at.saturating_duration_since(start).as_millis() as u64,
            session: m.session,
            pose: m.pose.as_ref().map(|p| p.name().to_string()),
            held_ms: m.held_for.as_millis() as u64,
        });
    });

    let mut failures = 0;
    let mut learn = match opts.selection {
        Selection::Learn { quiz, seed } => {
            let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            let mut lm = LearnMode::new(rng);
            if quiz {
                lm.toggle_mode();
            }
            failures += start_next(&mut lm, &library, &mut ctl, false);
            Some(lm)
        }
        Selection::Fixed(index) => {
            if let Ok(start) = PoseSelector::default().select(index, &library, &mut ctl) {
                failures += start.failures.len();
            }
            None
        }
    };

    let frame_ms = profile.timing.frame_ms.max(1);
    let end_ms = opts
        .script
        .duration_ms()
        .saturating_add(profile.timing.dwell_ms.saturating_mul(2));
    let mut steps = opts.script.steps.iter().peekable();
    let mut frames = 0u64;
    let mut t_ms = 0u64;

    while t_ms <= end_ms {
        if stop.load(Ordering::Relaxed) {
            info!("stop requested; ending replay at {t_ms} ms");
            break;
        }
        let Some(now) = start.checked_add(Duration::from_millis(t_ms)) else {
            warn!("clock overflow at {t_ms} ms; ending replay");
            break;
        };

        while let Some(step) = steps.next_if(|s| s.at_ms <= t_ms) {
            match &step.action {
                StepAction::Show { hand, shape } => world.show(*hand, shape.clone()),
                StepAction::Lower { hand } => world.lower(*hand),
                StepAction::Skip => match learn.as_mut() {
                    Some(lm) => failures += start_next(lm, &library, &mut ctl, true),
                    None => warn!("skip ignored: a fixed pose is selected"),
                },
                StepAction::ToggleMode => match learn.as_mut() {
                    Some(lm) => {
                        lm.toggle_mode();
                    }
                    None => warn!("toggle_mode ignored: a fixed pose is selected"),
                },
            }
        }

        let mut fired = ctl.poll_detectors(now);
        fired.extend(ctl.tick(now));
        for _ in fired {
            if let Some(lm) = learn.as_mut() {
                if let Ok(picked) = lm.on_pose_matched(&library, &mut ctl) {
                    failures += picked.start.failures.len();
                }
            }
        }

        frames += 1;
        if opts.realtime {
            thread::sleep(Duration::from_millis(frame_ms));
        }
        match t_ms.checked_add(frame_ms) {
            Some(t) => t_ms = t,
            None => break,
        }
    }

    let summary = RunSummary {
        profile: profile.meta.name.clone(),
        frames,
        elapsed_ms: frames.saturating_mul(frame_ms),
        sessions: ctl.session().id(),
        mode: learn.as_ref().map(|lm| lm.mode()),
        score: learn.as_ref().map(|lm| lm.score()),
        injection_failures: failures,
        matches: matches.borrow().clone(),
    };
    Ok(summary)
}

fn start_next(
    lm: &mut LearnMode,
    library: &PoseLibrary,
    ctl: &mut GestureSessionController,
    skip: bool,
) -> usize {
    let picked = if skip {
        lm.skip(library, ctl)
    } else {
        lm.select_next(library, ctl)
    };
    match picked {
        Ok(p) => p.start.failures.len(),
        Err(e) => {
            warn!("no pose selected: {e}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
        [timing]
        dwell_ms = 800
        frame_ms = 10

        [[detectors]]
        name = "LeftHand"
        storage = "accessor"
        reinit = "initialize"

        [[detectors]]
        name = "RightHand"
        storage = "legacy_slot"
        reinit = "enable"

        [[detectors]]
        name = "Broken"
        storage = "none"

        [[poses]]
        name = "A"
        hand_shape = "fist"

        [[poses]]
        name = "B"
        hand_shape = "flat"
    "#;

    fn profile() -> Profile {
        Profile::parse(PROFILE).expect("test profile is valid")
    }

    #[test]
    fn probe_reports_each_shape() {
        let report = probe_detectors(&profile());
        assert_eq!(report.len(), 3);
        assert_eq!(report[0].binding, Some(PoseBinding::Accessor));
        assert_eq!(report[1].binding, Some(PoseBinding::Slot("hand_pose")));
        assert_eq!(report[1].reinit, Some(EntryPoint::Enable));
        assert_eq!(report[2].binding, None);
        assert_eq!(report[2].hand_side, "right");
    }

    #[test]
    fn fixed_pose_matches_once_per_hold() {
        let script = Script::parse(
            r#"
            [[step]]
            at_ms = 0
            kind = "show"
            hand = "left"
            shape = "fist"

            [[step]]
            at_ms = 1500
            kind = "lower"
            hand = "left"

            [[step]]
            at_ms = 1600
            kind = "show"
            hand = "right"
            shape = "fist"

            [[step]]
            at_ms = 2000
            kind = "lower"
            hand = "right"
            "#,
        )
        .expect("valid script");
        let opts = RunOptions {
            script,
            selection: Selection::Fixed(0),
            realtime: false,
        };
        let summary = run(&profile(), opts, &AtomicBool::new(false)).expect("run completes");

        assert_eq!(summary.matches.len(), 1, "{:?}", summary.matches);
        assert_eq!(summary.matches[0].at_ms, 800);
        assert_eq!(summary.matches[0].pose.as_deref(), Some("A"));
        assert_eq!(summary.injection_failures, 1, "the storage-less detector");
        assert_eq!(summary.sessions, 1);
        assert!(summary.mode.is_none());
    }

    #[test]
    fn learn_mode_advances_after_each_match() {
        let script = Script::parse(
            r#"
            [[step]]
            at_ms = 0
            kind = "show"
            hand = "left"
            shape = "fist"

            [[step]]
            at_ms = 0
            kind = "show"
            hand = "right"
            shape = "flat"

            [[step]]
            at_ms = 2000
            kind = "lower"
            hand = "left"

            [[step]]
            at_ms = 2000
            kind = "lower"
            hand = "right"
            "#,
        )
        .expect("valid script");
        let opts = RunOptions {
            script,
            selection: Selection::Learn {
                quiz: true,
                seed: Some(5),
            },
            realtime: false,
        };
        let summary = run(&profile(), opts, &AtomicBool::new(false)).expect("run completes");

        // each hand shows one of the two poses, so every new pose is already
        // held by the other hand and confirms one dwell after it is set;
        // the third hold is cut short when both hands drop at 2000 ms
        assert_eq!(summary.matches.len(), 2, "{:?}", summary.matches);
        assert_eq!(summary.score, Some(2));
        assert_eq!(summary.mode, Some(Mode::Quiz));
        assert_eq!(summary.sessions, 3);
        assert_ne!(summary.matches[0].pose, summary.matches[1].pose);
    }

    #[test]
    fn huge_timings_do_not_overflow() {
        let mut p = profile();
        p.timing.dwell_ms = u64::MAX;
        p.timing.frame_ms = u64::MAX;
        let opts = || RunOptions {
            script: Script::demo().expect("demo script"),
            selection: Selection::Fixed(0),
            realtime: false,
        };

        let summary = run(&p, opts(), &AtomicBool::new(true)).expect("run completes");
        assert_eq!(summary.frames, 0);

        let summary = run(&p, opts(), &AtomicBool::new(false)).expect("run completes");
        assert!(summary.frames <= 2, "{}", summary.frames);
    }

    #[test]
    fn stop_flag_ends_replay() {
        let opts = RunOptions {
            script: Script::demo().expect("demo script"),
            selection: Selection::Learn {
                quiz: false,
                seed: Some(1),
            },
            realtime: false,
        };
        let summary = run(&profile(), opts, &AtomicBool::new(true)).expect("run completes");
        assert_eq!(summary.frames, 0);
        assert!(summary.matches.is_empty());
    }
}
