//! Pose definitions and the library entries that carry them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
struct PoseShape {
    name: String,
    hand_shape: String,
}

/// Opaque handle to what a detector should match against.
///
/// Clones share one allocation and equality is identity: two definitions
/// built separately from the same data are different poses.
#[derive(Clone)]
pub struct PoseDefinition(Arc<PoseShape>);

impl PoseDefinition {
    pub fn new(name: impl Into<String>, hand_shape: impl Into<String>) -> Self {
        Self(Arc::new(PoseShape {
            name: name.into(),
            hand_shape: hand_shape.into(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Shape key interpreted by detectors; the session layer never reads it.
    pub fn hand_shape(&self) -> &str {
        &self.0.hand_shape
    }
}

impl PartialEq for PoseDefinition {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for PoseDefinition {}

impl fmt::Debug for PoseDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoseDefinition({})", self.0.name)
    }
}

/// One library entry: the definition plus what the UI shows for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEntry {
    pub name: String,
    pub description: String,
    pub preview: Option<PathBuf>,
    pub pose: PoseDefinition,
}

impl PoseEntry {
    pub fn new(name: impl Into<String>, pose: PoseDefinition) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            preview: None,
            pose,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_preview(mut self, preview: impl Into<PathBuf>) -> Self {
        self.preview = Some(preview.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_compare_by_identity() {
        let a = PoseDefinition::new("A", "fist");
        let a2 = a.clone();
        let other = PoseDefinition::new("A", "fist");
        assert_eq!(a, a2);
        assert_ne!(a, other, "same data, different pose");
    }
}
