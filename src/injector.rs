//! Pushes a pose definition into detectors whose storage shape varies.

use log::{debug, error};
use serde::Serialize;

use crate::detector::{Detector, DetectorHandle, EntryPoint};
use crate::error::InjectionError;
use crate::pose::PoseDefinition;

/// Storage slot names in probe order: current name first, then the legacy alias.
pub const POSE_SLOTS: [&str; 2] = ["hand_shape_or_pose", "hand_pose"];

/// Where a detector's current pose gets written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "slot")]
pub enum PoseBinding {
    Accessor,
    Slot(&'static str),
}

/// Outcome of a successful injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injected {
    pub binding: PoseBinding,
    /// Entry point that was invoked afterwards, if the detector had one.
    pub reinit: Option<EntryPoint>,
}

#[derive(Debug, Clone)]
pub struct PoseInjector {
    slots: &'static [&'static str],
}

impl Default for PoseInjector {
    fn default() -> Self {
        Self { slots: &POSE_SLOTS }
    }
}

impl PoseInjector {
    pub fn with_slots(slots: &'static [&'static str]) -> Self {
        Self { slots }
    }

    /// Walk the fallback chain: accessor, then each known slot in order.
    pub fn probe(&self, detector: &dyn Detector) -> Result<PoseBinding, InjectionError> {
        if detector.has_pose_accessor() {
            return Ok(PoseBinding::Accessor);
        }
        self.slots
            .iter()
            .copied()
            .find(|slot| detector.has_slot(slot))
            .map(PoseBinding::Slot)
            .ok_or_else(|| InjectionError::NoWritableSlot {
                detector: detector.name().to_string(),
            })
    }

    /// Preferred re-initialisation entry point: `Initialize`, else `Enable`.
    pub fn reinit_entry(detector: &dyn Detector) -> Option<EntryPoint> {
        [EntryPoint::Initialize, EntryPoint::Enable]
            .into_iter()
            .find(|e| detector.has_entry_point(*e))
    }

    /// Write `pose` through the handle's binding and re-run the detector's
    /// initialisation. A binding that no longer writes is re-probed once.
    pub fn inject(
        &self,
        handle: &mut DetectorHandle,
        pose: &PoseDefinition,
    ) -> Result<Injected, InjectionError> {
        let current = handle.binding;
        let binding = match current {
            Some(b) if write(handle.detector.as_mut(), b, pose) => b,
            _ => {
                let b = self.probe(handle.detector.as_ref()).inspect_err(|e| {
                    handle.binding = None;
                    error!("{e}");
                })?;
                if !write(handle.detector.as_mut(), b, pose) {
                    handle.binding = None;
                    let e = InjectionError::NoWritableSlot {
                        detector: handle.name().to_string(),
                    };
                    error!("{e}");
                    return Err(e);
                }
                handle.binding = Some(b);
                b
            }
        };

        if let Some(entry) = handle.reinit {
            handle.detector.invoke(entry);
        }
        debug!(
            "injected '{}' into '{}' via {:?} (reinit {:?})",
            pose.name(),
            handle.name(),
            binding,
            handle.reinit
        );
        Ok(Injected {
            binding,
            reinit: handle.reinit,
        })
    }
}

fn write(detector: &mut dyn Detector, binding: PoseBinding, pose: &PoseDefinition) -> bool {
    match binding {
        PoseBinding::Accessor => {
            if !detector.has_pose_accessor() {
                return false;
            }
            detector.set_pose(pose);
            true
        }
        PoseBinding::Slot(slot) => detector.write_slot(slot, pose),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectorId;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Probe {
        accessor: bool,
        slots: Vec<&'static str>,
        entries: Vec<EntryPoint>,
    }

    impl Detector for Probe {
        fn name(&self) -> &str {
            "RightHand_Probe"
        }
        fn has_pose_accessor(&self) -> bool {
            self.accessor
        }
        fn has_slot(&self, slot: &str) -> bool {
            self.slots.contains(&slot)
        }
        fn write_slot(&mut self, slot: &str, _pose: &PoseDefinition) -> bool {
            self.has_slot(slot)
        }
        fn has_entry_point(&self, entry: EntryPoint) -> bool {
            self.entries.contains(&entry)
        }
    }

    fn handle(p: Probe) -> DetectorHandle {
        handle_of(Box::new(p))
    }

    fn handle_of(d: Box<dyn Detector>) -> DetectorHandle {
        DetectorHandle::new(DetectorId(0), d, &PoseInjector::default())
    }

    #[test]
    fn accessor_beats_slots() {
        let p = Probe {
            accessor: true,
            slots: vec!["hand_shape_or_pose", "hand_pose"],
            ..Default::default()
        };
        let inj = PoseInjector::default();
        assert_eq!(inj.probe(&p), Ok(PoseBinding::Accessor));
    }

    #[test]
    fn primary_slot_before_legacy() {
        let p = Probe {
            slots: vec!["hand_pose", "hand_shape_or_pose"],
            ..Default::default()
        };
        assert_eq!(
            PoseInjector::default().probe(&p),
            Ok(PoseBinding::Slot("hand_shape_or_pose"))
        );
    }

    #[test]
    fn legacy_slot_only_still_injects() {
        let mut h = handle(Probe {
            slots: vec!["hand_pose"],
            ..Default::default()
        });
        let pose = PoseDefinition::new("B", "flat");
        let got = PoseInjector::default().inject(&mut h, &pose);
        assert_eq!(
            got,
            Ok(Injected {
                binding: PoseBinding::Slot("hand_pose"),
                reinit: None,
            })
        );
    }

    #[test]
    fn no_storage_is_no_writable_slot() {
        let mut h = handle(Probe::default());
        let err = PoseInjector::default()
            .inject(&mut h, &PoseDefinition::new("C", "curve"))
            .unwrap_err();
        assert_eq!(
            err,
            InjectionError::NoWritableSlot {
                detector: "RightHand_Probe".into()
            }
        );
    }

    #[test]
    fn initialize_preferred_over_enable() {
        let p = Probe {
            entries: vec![EntryPoint::Enable, EntryPoint::Initialize],
            ..Default::default()
        };
        assert_eq!(PoseInjector::reinit_entry(&p), Some(EntryPoint::Initialize));

        let p = Probe {
            entries: vec![EntryPoint::Enable],
            ..Default::default()
        };
        assert_eq!(PoseInjector::reinit_entry(&p), Some(EntryPoint::Enable));
    }

    #[test]
    fn missing_reinit_is_not_an_error() {
        let mut h = handle(Probe {
            accessor: true,
            ..Default::default()
        });
        let got = PoseInjector::default()
            .inject(&mut h, &PoseDefinition::new("D", "d"))
            .expect("accessor write succeeds");
        assert_eq!(got.reinit, None);
    }

    #[test]
    fn reinit_runs_after_write() {
        let mut h = handle(Probe {
            accessor: true,
            entries: vec![EntryPoint::Enable],
            ..Default::default()
        });
        let got = PoseInjector::default()
            .inject(&mut h, &PoseDefinition::new("E", "e"))
            .expect("accessor write succeeds");
        assert_eq!(got.reinit, Some(EntryPoint::Enable));
    }

    #[test]
    fn custom_slot_list_is_respected() {
        static ONLY: [&str; 1] = ["pose"];
        let p = Probe {
            slots: vec!["hand_pose", "pose"],
            ..Default::default()
        };
        assert_eq!(
            PoseInjector::with_slots(&ONLY).probe(&p),
            Ok(PoseBinding::Slot("pose"))
        );
    }

    /// Slots can vanish after the handle was built.
    struct Drifting {
        slots: Rc<RefCell<Vec<&'static str>>>,
        writes: Rc<RefCell<Vec<String>>>,
    }

    impl Detector for Drifting {
        fn name(&self) -> &str {
            "LeftHand_Drifting"
        }
        fn has_slot(&self, slot: &str) -> bool {
            self.slots.borrow().contains(&slot)
        }
        fn write_slot(&mut self, slot: &str, _pose: &PoseDefinition) -> bool {
            if !self.has_slot(slot) {
                return false;
            }
            self.writes.borrow_mut().push(slot.to_string());
            true
        }
    }

    #[test]
    fn vanished_slot_rebinds_to_legacy() {
        let slots = Rc::new(RefCell::new(vec!["hand_shape_or_pose", "hand_pose"]));
        let writes = Rc::new(RefCell::new(Vec::new()));
        let mut h = DetectorHandle::new(
            DetectorId(0),
            Box::new(Drifting {
                slots: slots.clone(),
                writes: writes.clone(),
            }),
            &PoseInjector::default(),
        );
        assert_eq!(h.binding(), Some(PoseBinding::Slot("hand_shape_or_pose")));

        slots.borrow_mut().retain(|s| *s != "hand_shape_or_pose");
        let inj = PoseInjector::default();
        let got = inj
            .inject(&mut h, &PoseDefinition::new("A", "fist"))
            .expect("legacy slot still writable");
        assert_eq!(got.binding, PoseBinding::Slot("hand_pose"));
        assert_eq!(h.binding(), Some(PoseBinding::Slot("hand_pose")));

        inj.inject(&mut h, &PoseDefinition::new("B", "flat"))
            .expect("cached legacy binding");
        assert_eq!(*writes.borrow(), vec!["hand_pose", "hand_pose"]);
    }

    /// Reports a slot but never accepts the write.
    struct ReadOnly;

    impl Detector for ReadOnly {
        fn name(&self) -> &str {
            "RightHand_ReadOnly"
        }
        fn has_slot(&self, slot: &str) -> bool {
            slot == "hand_shape_or_pose"
        }
        fn write_slot(&mut self, _slot: &str, _pose: &PoseDefinition) -> bool {
            false
        }
        fn has_entry_point(&self, entry: EntryPoint) -> bool {
            entry == EntryPoint::Initialize
        }
    }

    #[test]
    fn rejected_write_clears_binding() {
        let mut h = handle_of(Box::new(ReadOnly));
        assert_eq!(h.binding(), Some(PoseBinding::Slot("hand_shape_or_pose")));

        let err = PoseInjector::default()
            .inject(&mut h, &PoseDefinition::new("A", "fist"))
            .unwrap_err();
        assert_eq!(
            err,
            InjectionError::NoWritableSlot {
                detector: "RightHand_ReadOnly".into()
            }
        );
        assert_eq!(h.binding(), None);
    }
}
