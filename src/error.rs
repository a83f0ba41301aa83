//! Typed failures of the pose pipeline. None of them are fatal: callers log
//! and carry on with the rest of the detector set.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectionError {
    /// Detector exposes neither a pose accessor nor a known storage slot.
    #[error("couldn't find a writable pose slot on detector '{detector}'")]
    NoWritableSlot { detector: String },
}

/// Default side is applied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandSideError {
    #[error("can't tell hand side of detector '{detector}'")]
    Ambiguous { detector: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LibraryError {
    #[error("pose index {index} is out of range 0..{len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("pose library is empty")]
    Empty,
}
