use intake_spec::{AnswerError, DefinitionError, Position};
use intake_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Fatal configuration problem; the session cannot start.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// Rejected submission; prompt the participant again.
    #[error(transparent)]
    Answer(#[from] AnswerError),
    /// The store did not confirm the write. Local state is unchanged; retry the step.
    #[error("progress could not be saved: {0}")]
    Store(#[from] StoreError),
    #[error("the questionnaire has already been completed")]
    AlreadyComplete,
    #[error("`{operation}` is not available while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
    #[error("question {number} must be answered before moving on")]
    Unanswered { question_id: String, number: String },
    #[error("{0} is not the start of a section")]
    NotASectionStart(Position),
    #[error("the restart confirmation no longer matches the stored session")]
    StaleConfirmation,
    #[error("cursor {0} does not resolve to a question")]
    CursorLost(Position),
}

impl SessionError {
    /// Transient persistence failures can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Store(err) if err.is_transient())
    }

    /// Participant-facing validation problems, shown inline.
    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::Answer(_) | SessionError::Unanswered { .. })
    }
}
