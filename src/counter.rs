//! Per-hand aggregation of detector activations.

use crate::detector::HandSide;

/// Active-detector counts per hand.
///
/// Deactivations saturate at zero: a detector may report `Deactivated`
/// without a matching `Activated` in the current session (for example when
/// the pose was swapped mid-gesture).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HandSideCounter {
    left: u32,
    right: u32,
}

impl HandSideCounter {
    pub fn on_activated(&mut self, side: HandSide) {
        let c = self.count_mut(side);
        *c = c.saturating_add(1);
    }

    pub fn on_deactivated(&mut self, side: HandSide) {
        let c = self.count_mut(side);
        *c = c.saturating_sub(1);
    }

    /// Is either hand currently showing the target pose?
    pub fn is_any_active(&self) -> bool {
        self.left > 0 || self.right > 0
    }

    pub fn count(&self, side: HandSide) -> u32 {
        match side {
            HandSide::Left => self.left,
            HandSide::Right => self.right,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn count_mut(&mut self, side: HandSide) -> &mut u32 {
        match side {
            HandSide::Left => &mut self.left,
            HandSide::Right => &mut self.right,
        }
    }
}
