//! Questionnaire model for participant intake: definition, gender-filtered
//! indexing, cursor navigation, answer snapshots and progress aggregation.
//!
//! Everything here is synchronous and free of I/O; persistence and session
//! orchestration live in `intake-store` and `intake-session`.

pub mod answers;
pub mod definition;
pub mod error;
pub mod index;
pub mod navigator;
pub mod position;
pub mod progress;
pub mod session;
pub mod validate;

pub use answers::{Answer, AnswerInput, AnswerMap, AnswerValue, build_answer};
pub use definition::{
    Gender, GenderScope, Language, LocalizedText, Part, Question, QuestionKind, Questionnaire,
    Section,
};
pub use error::{AnswerError, DefinitionError, DefinitionIssue};
pub use index::{EffectiveSequence, Location, PartSummary, QuestionView, Resume, SectionSummary};
pub use navigator::Shape;
pub use position::{Position, Step};
pub use progress::{
    OverallProgress, PartProgress, SectionProgress, overall_progress, per_part_progress,
    per_section_progress,
};
pub use session::{ParticipantId, ProgressSession, SessionKey};
pub use validate::validate;
