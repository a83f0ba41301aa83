//! Simulated detectors and a scripted hand-observation timeline.
//!
//! `SimDetector` reproduces each storage shape a third-party detector can
//! have, so the injection fallbacks run end to end without hardware.
//! Detection itself is a plain shape-key comparison against the tracked hand.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::detector::{Activation, Detector, EntryPoint, HandSide};
use crate::injector::POSE_SLOTS;
use crate::pose::PoseDefinition;

/// Where a simulated detector keeps its current pose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    #[default]
    Accessor,
    Slot,
    LegacySlot,
    None,
}

/// Which re-initialisation entry points a simulated detector exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reinit {
    #[default]
    Initialize,
    Enable,
    Both,
    None,
}

/// Hand shapes currently seen by the tracker, shared by all detectors.
#[derive(Debug, Clone, Default)]
pub struct HandWorld {
    shapes: Rc<RefCell<HashMap<HandSide, String>>>,
}

impl HandWorld {
    pub fn show(&self, hand: HandSide, shape: impl Into<String>) {
        self.shapes.borrow_mut().insert(hand, shape.into());
    }

    /// Hand leaves tracking.
    pub fn lower(&self, hand: HandSide) {
        self.shapes.borrow_mut().remove(&hand);
    }

    pub fn observed(&self, hand: HandSide) -> Option<String> {
        self.shapes.borrow().get(&hand).cloned()
    }
}

pub struct SimDetector {
    name: String,
    hand: HandSide,
    storage: Storage,
    reinit: Reinit,
    world: HandWorld,
    stored: Option<PoseDefinition>,
    adopted: Option<PoseDefinition>,
    active: bool,
}

impl SimDetector {
    pub fn new(name: impl Into<String>, storage: Storage, reinit: Reinit, world: HandWorld) -> Self {
        let name = name.into();
        let hand = HandSide::from_detector_name(&name).unwrap_or(HandSide::Right);
        Self {
            name,
            hand,
            storage,
            reinit,
            world,
            stored: None,
            adopted: None,
            active: false,
        }
    }

    fn store(&mut self, pose: &PoseDefinition) {
        self.stored = Some(pose.clone());
    }
}

impl Detector for SimDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_pose_accessor(&self) -> bool {
        self.storage == Storage::Accessor
    }

    fn set_pose(&mut self, pose: &PoseDefinition) {
        if self.has_pose_accessor() {
            self.store(pose);
        }
    }

    fn has_slot(&self, slot: &str) -> bool {
        match self.storage {
            Storage::Slot => slot == POSE_SLOTS[0],
            Storage::LegacySlot => slot == POSE_SLOTS[1],
            Storage::Accessor | Storage::None => false,
        }
    }

    fn write_slot(&mut self, slot: &str, pose: &PoseDefinition) -> bool {
        if !self.has_slot(slot) {
            return false;
        }
        self.store(pose);
        true
    }

    fn has_entry_point(&self, entry: EntryPoint) -> bool {
        matches!(
            (self.reinit, entry),
            (Reinit::Both, _)
                | (Reinit::Initialize, EntryPoint::Initialize)
                | (Reinit::Enable, EntryPoint::Enable)
        )
    }

    fn invoke(&mut self, entry: EntryPoint) {
        if self.has_entry_point(entry) {
            self.adopted = self.stored.clone();
        }
    }

    fn poll_signal(&mut self) -> Option<Activation> {
        let observed = self.world.observed(self.hand);
        // without a re-init hook the new pose is picked up on the next
        // tracking loss, like a component being re-enabled
        if observed.is_none() && self.reinit == Reinit::None {
            self.adopted = self.stored.clone();
        }
        let now_active = match (&observed, &self.adopted) {
            (Some(shape), Some(pose)) => shape == pose.hand_shape(),
            _ => false,
        };
        if now_active == self.active {
            return None;
        }
        self.active = now_active;
        Some(if now_active {
            Activation::Activated
        } else {
            Activation::Deactivated
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    Show { hand: HandSide, shape: String },
    Lower { hand: HandSide },
    Skip,
    ToggleMode,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: StepAction,
}

/// Timeline of hand observations and button presses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

fn demo_script_text() -> &'static str {
    include_str!("../scripts/demo.toml")
}

impl Script {
    pub fn parse(txt: &str) -> Result<Self> {
        let mut script: Script =
            toml::from_str(txt).map_err(|e| anyhow!("failed to parse script: {e}"))?;
        script.steps.sort_by_key(|s| s.at_ms);
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        Self::parse(&txt).map_err(|e| anyhow!("{}: {e}", path.display()))
    }

    pub fn demo() -> Result<Self> {
        Self::parse(demo_script_text())
    }

    /// Time of the last step.
    pub fn duration_ms(&self) -> u64 {
        self.steps.last().map_or(0, |s| s.at_ms)
    }
}
