//! Detector capabilities and the handle the session keeps for each one.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::HandSideError;
use crate::injector::{PoseBinding, PoseInjector};
use crate::pose::PoseDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    /// Classify a detector by its name: anything containing "left"
    /// (case-insensitive) is left, anything containing "right" is right.
    pub fn from_detector_name(name: &str) -> Result<Self, HandSideError> {
        let lower = name.to_ascii_lowercase();
        if lower.contains("left") {
            Ok(Self::Left)
        } else if lower.contains("right") {
            Ok(Self::Right)
        } else {
            Err(HandSideError::Ambiguous {
                detector: name.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// State change reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Activated,
    Deactivated,
}

/// Re-initialisation entry points a detector may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Initialize,
    Enable,
}

/// What the session needs from a third-party pose detector.
///
/// Detectors differ in how they store the current pose across versions, so
/// every storage capability is optional and probed by the
/// [`PoseInjector`] when the handle is built.
pub trait Detector {
    fn name(&self) -> &str;

    /// Whether a writable "current pose" accessor exists.
    fn has_pose_accessor(&self) -> bool {
        false
    }

    fn set_pose(&mut self, _pose: &PoseDefinition) {}

    /// Whether an internal storage slot with this name exists.
    fn has_slot(&self, _slot: &str) -> bool {
        false
    }

    /// Write `pose` into the named slot. Returns false if the slot is gone.
    fn write_slot(&mut self, _slot: &str, _pose: &PoseDefinition) -> bool {
        false
    }

    fn has_entry_point(&self, _entry: EntryPoint) -> bool {
        false
    }

    fn invoke(&mut self, _entry: EntryPoint) {}

    /// Next pending activation change, if the detector produced one.
    fn poll_signal(&mut self) -> Option<Activation> {
        None
    }
}

/// Index of a handle inside its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectorId(pub usize);

/// One detector plus everything resolved about it at discovery time.
pub struct DetectorHandle {
    id: DetectorId,
    hand_side: HandSide,
    pub(crate) is_active: bool,
    pub(crate) binding: Option<PoseBinding>,
    pub(crate) reinit: Option<EntryPoint>,
    pub(crate) detector: Box<dyn Detector>,
}

impl DetectorHandle {
    pub fn new(id: DetectorId, detector: Box<dyn Detector>, injector: &PoseInjector) -> Self {
        let hand_side = HandSide::from_detector_name(detector.name()).unwrap_or_else(|e| {
            warn!("{e}; treating it as right");
            HandSide::Right
        });
        let binding = injector.probe(detector.as_ref()).ok();
        let reinit = PoseInjector::reinit_entry(detector.as_ref());
        Self {
            id,
            hand_side,
            is_active: false,
            binding,
            reinit,
            detector,
        }
    }

    pub fn id(&self) -> DetectorId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.detector.name()
    }

    pub fn hand_side(&self) -> HandSide {
        self.hand_side
    }

    /// Last state this detector reported.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn binding(&self) -> Option<PoseBinding> {
        self.binding
    }

    pub fn reinit(&self) -> Option<EntryPoint> {
        self.reinit
    }
}

impl std::fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorHandle")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("hand_side", &self.hand_side)
            .field("is_active", &self.is_active)
            .field("binding", &self.binding)
            .field("reinit", &self.reinit)
            .finish()
    }
}
