use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::answers::{Answer, AnswerMap};
use crate::definition::{Gender, Language};
use crate::position::Position;

/// Opaque participant identifier supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One session exists per participant and gender.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub participant_id: ParticipantId,
    pub gender: Gender,
}

impl SessionKey {
    pub fn new(participant_id: ParticipantId, gender: Gender) -> Self {
        Self {
            participant_id,
            gender,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.participant_id, self.gender)
    }
}

/// Persisted record of one participant's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSession {
    pub participant_id: ParticipantId,
    pub gender: Gender,
    pub language: Language,
    pub current_position: Position,
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub is_complete: bool,
}

impl ProgressSession {
    /// Fresh session at `first` with no answers.
    pub fn new(key: SessionKey, language: Language, first: Position, now: OffsetDateTime) -> Self {
        Self {
            participant_id: key.participant_id,
            gender: key.gender,
            language,
            current_position: first,
            answers: AnswerMap::new(),
            started_at: now,
            last_updated_at: now,
            completed_at: None,
            is_complete: false,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.participant_id.clone(), self.gender)
    }

    pub fn apply_answer(&mut self, answer: Answer) {
        self.last_updated_at = self.last_updated_at.max(answer.answered_at);
        self.answers.upsert(answer);
    }

    pub fn apply_position(&mut self, position: Position, at: OffsetDateTime) {
        self.current_position = position;
        self.last_updated_at = at;
    }

    pub fn apply_completion(&mut self, at: OffsetDateTime) {
        self.is_complete = true;
        self.completed_at = Some(at);
        self.last_updated_at = at;
    }
}
