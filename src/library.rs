//! Ordered pose collection and index-based selection.

use log::{error, info};

use crate::error::LibraryError;
use crate::pose::PoseEntry;
use crate::session::{GestureSessionController, SessionStart};

#[derive(Debug, Clone, Default)]
pub struct PoseLibrary {
    entries: Vec<PoseEntry>,
}

impl PoseLibrary {
    pub fn new(entries: Vec<PoseEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&PoseEntry, LibraryError> {
        self.entries.get(index).ok_or(LibraryError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    pub fn entries(&self) -> &[PoseEntry] {
        &self.entries
    }
}

impl FromIterator<PoseEntry> for PoseLibrary {
    fn from_iter<I: IntoIterator<Item = PoseEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Picks library entries by index.
///
/// Callers that own the index should use [`PoseSelector::select`]. Callers
/// that can only mutate a number use [`PoseSelector::request`] and let the
/// host call [`PoseSelector::sync`] once per scheduling pass; a request made
/// between two syncs is only seen at the next one.
#[derive(Debug, Default, Clone)]
pub struct PoseSelector {
    requested: usize,
    applied: Option<usize>,
}

impl PoseSelector {
    /// Start a session for `index`. Out-of-range indices are logged and
    /// leave the current session untouched.
    pub fn select(
        &mut self,
        index: usize,
        library: &PoseLibrary,
        controller: &mut GestureSessionController,
    ) -> Result<SessionStart, LibraryError> {
        self.requested = index;
        self.applied = Some(index);
        let entry = library.get(index).inspect_err(|e| error!("{e}"))?;
        info!(
            "selecting pose '{}' (preview: {})",
            entry.name,
            entry
                .preview
                .as_ref()
                .map_or("none".to_string(), |p| p.display().to_string())
        );
        Ok(controller.set_entry(Some(entry.clone())))
    }

    pub fn request(&mut self, index: usize) {
        self.requested = index;
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Apply the requested index if it differs from the last applied one.
    /// Returns true when a selection was attempted.
    pub fn sync(
        &mut self,
        library: &PoseLibrary,
        controller: &mut GestureSessionController,
    ) -> bool {
        if self.applied == Some(self.requested) {
            return false;
        }
        let _ = self.select(self.requested, library, controller);
        true
    }

    pub fn current<'a>(&self, library: &'a PoseLibrary) -> Option<&'a PoseEntry> {
        self.applied.and_then(|i| library.get(i).ok())
    }
}
