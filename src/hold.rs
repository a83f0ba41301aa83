//! Cancellable dwell timer that confirms a held pose.

use std::time::{Duration, Instant};

/// Time a pose must be held continuously before it counts as matched.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldState {
    Idle,
    Armed { since: Instant },
    Fired,
}

/// At most one armed countdown exists at a time. Cancelling discards the
/// start instant, so a later hold must sit through the whole dwell again.
#[derive(Debug, Clone)]
pub struct HoldConfirmationTimer {
    state: HoldState,
    dwell: Duration,
}

impl Default for HoldConfirmationTimer {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL)
    }
}

impl HoldConfirmationTimer {
    pub fn new(dwell: Duration) -> Self {
        Self {
            state: HoldState::Idle,
            dwell,
        }
    }

    pub fn state(&self) -> HoldState {
        self.state
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Idle -> Armed. Returns false (and changes nothing) from any other state.
    pub fn arm(&mut self, now: Instant) -> bool {
        if self.state != HoldState::Idle {
            return false;
        }
        self.state = HoldState::Armed { since: now };
        true
    }

    /// Back to Idle from Armed or Fired.
    pub fn cancel(&mut self) {
        self.state = HoldState::Idle;
    }

    /// Armed long enough to fire at `now`?
    pub fn is_due(&self, now: Instant) -> bool {
        match self.state {
            HoldState::Armed { since } => now.saturating_duration_since(since) >= self.dwell,
            _ => false,
        }
    }

    /// Armed -> Fired, returning how long the hold lasted.
    pub fn fire(&mut self, now: Instant) -> Option<Duration> {
        let HoldState::Armed { since } = self.state else {
            return None;
        };
        self.state = HoldState::Fired;
        Some(now.saturating_duration_since(since))
    }
}
