//! Session orchestration: pose injection, hand aggregation and hold confirmation.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::counter::HandSideCounter;
use crate::detector::{Activation, Detector, DetectorHandle, DetectorId};
use crate::error::InjectionError;
use crate::hold::{HoldConfirmationTimer, HoldState};
use crate::injector::PoseInjector;
use crate::pose::{PoseDefinition, PoseEntry};
use crate::signal::{Signal, Subscription};

/// Raised once per confirmed hold.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseMatched {
    pub session: u64,
    pub pose: Option<PoseDefinition>,
    pub held_for: Duration,
    pub at: Instant,
}

/// UI collaborator told about entry changes and the hold highlight.
pub trait EntryView {
    fn show_entry(&mut self, entry: Option<&PoseEntry>);

    fn show_holding(&mut self, _holding: bool) {}
}

/// Period between two `set_entry` calls.
#[derive(Debug, Default, Clone)]
pub struct GestureSession {
    id: u64,
    entry: Option<PoseEntry>,
    triggered: bool,
}

impl GestureSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn entry(&self) -> Option<&PoseEntry> {
        self.entry.as_ref()
    }

    pub fn current_definition(&self) -> Option<&PoseDefinition> {
        self.entry.as_ref().map(|e| &e.pose)
    }

    /// Has this session already confirmed the current hold?
    pub fn triggered(&self) -> bool {
        self.triggered
    }
}

/// Result of starting a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStart {
    pub session: u64,
    pub injected: usize,
    pub failures: Vec<InjectionError>,
}

pub struct GestureSessionController {
    handles: Vec<DetectorHandle>,
    injector: PoseInjector,
    counter: HandSideCounter,
    timer: HoldConfirmationTimer,
    session: GestureSession,
    matched: Signal<PoseMatched>,
    view: Option<Box<dyn EntryView>>,
    highlighted: bool,
}

impl GestureSessionController {
    /// Take ownership of the detector set. Detectors are fixed for the
    /// controller's lifetime; storage and re-init shapes are probed here.
    pub fn new(detectors: Vec<Box<dyn Detector>>, dwell: Duration) -> Self {
        Self::with_injector(detectors, dwell, PoseInjector::default())
    }

    pub fn with_injector(
        detectors: Vec<Box<dyn Detector>>,
        dwell: Duration,
        injector: PoseInjector,
    ) -> Self {
        let handles: Vec<DetectorHandle> = detectors
            .into_iter()
            .enumerate()
            .map(|(i, d)| DetectorHandle::new(DetectorId(i), d, &injector))
            .collect();
        for h in &handles {
            debug!(
                "detector '{}': {} hand, binding {:?}, reinit {:?}",
                h.name(),
                h.hand_side().as_str(),
                h.binding(),
                h.reinit()
            );
        }
        Self {
            handles,
            injector,
            counter: HandSideCounter::default(),
            timer: HoldConfirmationTimer::new(dwell),
            session: GestureSession::default(),
            matched: Signal::default(),
            view: None,
            highlighted: false,
        }
    }

    pub fn set_view(&mut self, view: Box<dyn EntryView>) {
        self.view = Some(view);
    }

    /// Listen for confirmed holds until the returned guard is dropped.
    pub fn subscribe(&self, f: impl FnMut(&PoseMatched) + 'static) -> Subscription {
        self.matched.subscribe(f)
    }

    /// Start a new session. Any in-flight hold is cancelled before the new
    /// pose is pushed into the detectors, so a stale countdown can never
    /// confirm against the new pose.
    pub fn set_entry(&mut self, entry: Option<PoseEntry>) -> SessionStart {
        self.timer.cancel();
        self.counter.reset();
        self.session = GestureSession {
            id: self.session.id + 1,
            entry,
            triggered: false,
        };
        self.set_highlight(false);

        let mut injected = 0;
        let mut failures = Vec::new();
        if let Some(pose) = self.session.current_definition().cloned() {
            for h in &mut self.handles {
                match self.injector.inject(h, &pose) {
                    Ok(_) => injected += 1,
                    Err(e) => failures.push(e),
                }
            }
        }

        match self.session.entry() {
            Some(e) => info!(
                "session {}: '{}' ({injected}/{} detectors)",
                self.session.id,
                e.name,
                self.handles.len()
            ),
            None => info!("session {}: no pose selected", self.session.id),
        }
        if let Some(view) = self.view.as_mut() {
            view.show_entry(self.session.entry.as_ref());
        }

        SessionStart {
            session: self.session.id,
            injected,
            failures,
        }
    }

    pub fn on_detector_activated(&mut self, id: DetectorId, now: Instant) -> Option<PoseMatched> {
        self.on_signal(id, Activation::Activated, now)
    }

    pub fn on_detector_deactivated(
        &mut self,
        id: DetectorId,
        now: Instant,
    ) -> Option<PoseMatched> {
        self.on_signal(id, Activation::Deactivated, now)
    }

    /// Apply one detector signal. A hold that came due before `now` is
    /// confirmed first, so late delivery never loses a match.
    pub fn on_signal(
        &mut self,
        id: DetectorId,
        signal: Activation,
        now: Instant,
    ) -> Option<PoseMatched> {
        let fired = self.tick(now);

        let Some(h) = self.handles.get_mut(id.0) else {
            warn!("signal {signal:?} from unknown detector {id:?}");
            return fired;
        };
        let side = h.hand_side();
        match signal {
            Activation::Activated => {
                h.is_active = true;
                info!("pose performed on '{}'", h.name());
                self.counter.on_activated(side);
            }
            Activation::Deactivated => {
                h.is_active = false;
                info!("pose ended on '{}'", h.name());
                self.counter.on_deactivated(side);
            }
        }

        if self.counter.is_any_active() {
            self.set_highlight(true);
            // a session without a pose never confirms
            let armable = !self.session.triggered && self.session.current_definition().is_some();
            if armable && self.timer.arm(now) {
                debug!("hold armed (dwell {:?})", self.timer.dwell());
            }
        } else {
            if matches!(self.timer.state(), HoldState::Armed { .. }) {
                debug!("hold released early; countdown cancelled");
            }
            self.timer.cancel();
            self.session.triggered = false;
            self.set_highlight(false);
        }
        fired
    }

    /// Drain pending signals from every detector.
    pub fn poll_detectors(&mut self, now: Instant) -> Vec<PoseMatched> {
        let mut fired = Vec::new();
        for i in 0..self.handles.len() {
            loop {
                let Some(signal) = self.handles[i].detector.poll_signal() else {
                    break;
                };
                fired.extend(self.on_signal(DetectorId(i), signal, now));
            }
        }
        fired
    }

    /// Advance time. Confirms the hold if it has been armed for the dwell
    /// interval and a hand is still showing the pose.
    pub fn tick(&mut self, now: Instant) -> Option<PoseMatched> {
        if !self.timer.is_due(now) {
            return None;
        }
        if !self.counter.is_any_active() || self.session.triggered {
            self.timer.cancel();
            return None;
        }
        let held_for = self.timer.fire(now)?;
        self.session.triggered = true;

        let m = PoseMatched {
            session: self.session.id,
            pose: self.session.current_definition().cloned(),
            held_for,
            at: now,
        };
        info!(
            "pose matched: '{}' held for {held_for:?}",
            m.pose.as_ref().map_or("<none>", |p| p.name())
        );
        self.matched.emit(&m);
        Some(m)
    }

    /// Is a hand currently showing the target pose?
    pub fn is_holding(&self) -> bool {
        self.counter.is_any_active()
    }

    pub fn hold_state(&self) -> HoldState {
        self.timer.state()
    }

    pub fn counter(&self) -> HandSideCounter {
        self.counter
    }

    pub fn session(&self) -> &GestureSession {
        &self.session
    }

    pub fn handles(&self) -> &[DetectorHandle] {
        &self.handles
    }

    pub fn handle(&self, id: DetectorId) -> Option<&DetectorHandle> {
        self.handles.get(id.0)
    }

    fn set_highlight(&mut self, on: bool) {
        if self.highlighted == on {
            return;
        }
        self.highlighted = on;
        if let Some(view) = self.view.as_mut() {
            view.show_holding(on);
        }
    }
}
