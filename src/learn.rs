//! Learn/quiz collaborator: picks the next pose and keeps the quiz score.

use log::info;
use rand::Rng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::error::LibraryError;
use crate::library::PoseLibrary;
use crate::session::{GestureSessionController, SessionStart};

/// Outcome of picking a pose: its library index and the session it started.
#[derive(Debug, Clone, PartialEq)]
pub struct Picked {
    pub index: usize,
    pub start: SessionStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Learn,
    Quiz,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Learn => "Learn Mode",
            Self::Quiz => "Quiz Mode",
        }
    }
}

pub struct LearnMode<R = StdRng> {
    mode: Mode,
    score: u32,
    last_index: Option<usize>,
    rng: R,
}

impl<R: Rng> LearnMode<R> {
    pub fn new(rng: R) -> Self {
        Self {
            mode: Mode::Learn,
            score: 0,
            last_index: None,
            rng,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    /// Entering quiz mode starts a fresh score.
    pub fn toggle_mode(&mut self) -> Mode {
        self.mode = match self.mode {
            Mode::Learn => Mode::Quiz,
            Mode::Quiz => Mode::Learn,
        };
        if self.mode == Mode::Quiz {
            self.score = 0;
        }
        info!("{}", self.mode.label());
        self.mode
    }

    /// Preview image and tips are hidden while quizzing.
    pub fn shows_preview(&self) -> bool {
        self.mode == Mode::Learn
    }

    /// Random index that differs from the previous pick when there is a choice.
    pub fn next_index(&mut self, len: usize) -> Result<usize, LibraryError> {
        if len == 0 {
            return Err(LibraryError::Empty);
        }
        let idx = match self.last_index {
            Some(last) if len > 1 && last < len => {
                let i = self.rng.gen_range(0..len - 1);
                if i >= last { i + 1 } else { i }
            }
            _ => self.rng.gen_range(0..len),
        };
        Ok(idx)
    }

    pub fn select_next(
        &mut self,
        library: &PoseLibrary,
        controller: &mut GestureSessionController,
    ) -> Result<Picked, LibraryError> {
        let index = self.next_index(library.len())?;
        let entry = library.get(index)?;
        self.last_index = Some(index);
        let start = controller.set_entry(Some(entry.clone()));
        Ok(Picked { index, start })
    }

    /// Skip button: advance without scoring.
    pub fn skip(
        &mut self,
        library: &PoseLibrary,
        controller: &mut GestureSessionController,
    ) -> Result<Picked, LibraryError> {
        info!("skipping pose");
        self.select_next(library, controller)
    }

    /// Score in quiz mode, then move on.
    pub fn on_pose_matched(
        &mut self,
        library: &PoseLibrary,
        controller: &mut GestureSessionController,
    ) -> Result<Picked, LibraryError> {
        if self.mode == Mode::Quiz {
            self.score += 1;
            info!("Score: {}", self.score);
        }
        self.select_next(library, controller)
    }
}
