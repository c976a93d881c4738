use std::fmt;

use serde::{Deserialize, Serialize};

/// Three-level cursor into the gender-filtered question lists.
///
/// Indices always address the filtered, non-empty parts and sections of an
/// [`EffectiveSequence`](crate::index::EffectiveSequence), never the raw
/// definition, so a stored position is only meaningful for the gender it was
/// produced under.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    #[serde(rename = "part_index")]
    pub part: usize,
    #[serde(rename = "section_index")]
    pub section: usize,
    #[serde(rename = "question_index")]
    pub question: usize,
}

impl Position {
    pub const fn new(part: usize, section: usize, question: usize) -> Self {
        Self {
            part,
            section,
            question,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.part, self.section, self.question)
    }
}

/// Result of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    At(Position),
    /// Before the first question; "previous" is unavailable.
    Start,
    /// Past the last question; the questionnaire is finished.
    End,
}

impl Step {
    pub fn position(self) -> Option<Position> {
        match self {
            Step::At(position) => Some(position),
            Step::Start | Step::End => None,
        }
    }
}
