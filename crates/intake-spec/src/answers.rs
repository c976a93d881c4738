use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AnswerError;
use crate::index::EffectiveSequence;
use crate::position::Position;

/// Raw value reported by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    /// Ordered set of selected option labels.
    Choices(Vec<String>),
}

impl AnswerValue {
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::Choices(choices) => choices.iter().all(|choice| choice.trim().is_empty()),
        }
    }

    /// Flattened display form, one line.
    pub fn display(&self) -> String {
        match self {
            AnswerValue::Text(text) => text.clone(),
            AnswerValue::Choices(choices) => choices.join(", "),
        }
    }
}

/// Stored answer with the question's number and text snapshotted at answer time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub part_id: String,
    pub section_id: String,
    pub question_number: String,
    pub question_text: String,
    pub value: AnswerValue,
    #[serde(with = "time::serde::rfc3339")]
    pub answered_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

/// Answers keyed by question id. Writing an id twice replaces the earlier answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<String, Answer>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces by `question_id`, returning the replaced answer.
    pub fn upsert(&mut self, answer: Answer) -> Option<Answer> {
        self.0.insert(answer.question_id.clone(), answer)
    }

    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.0.get(question_id)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.0.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &Answer> {
        self.0.values()
    }
}

impl FromIterator<Answer> for AnswerMap {
    fn from_iter<T: IntoIterator<Item = Answer>>(iter: T) -> Self {
        let mut map = AnswerMap::new();
        for answer in iter {
            map.upsert(answer);
        }
        map
    }
}

/// Submission from the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerInput {
    pub value: AnswerValue,
    pub follow_up: Option<String>,
}

impl AnswerInput {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: AnswerValue::Text(value.into()),
            follow_up: None,
        }
    }

    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value: AnswerValue::Choices(values.into_iter().map(Into::into).collect()),
            follow_up: None,
        }
    }

    pub fn with_follow_up(mut self, follow_up: impl Into<String>) -> Self {
        self.follow_up = Some(follow_up.into());
        self
    }
}

/// Validates `input` against the question at `position` and snapshots it.
pub fn build_answer(
    sequence: &EffectiveSequence,
    position: Position,
    input: AnswerInput,
    answered_at: OffsetDateTime,
) -> Result<Answer, AnswerError> {
    let location = sequence
        .locate(position)
        .ok_or(AnswerError::NoQuestionAt(position))?;
    let view = sequence
        .view(position)
        .ok_or(AnswerError::NoQuestionAt(position))?;
    let question = location.question;
    let id = || question.id.clone();
    let number = || question.number.clone();

    if input.value.is_blank() {
        return Err(AnswerError::Empty {
            question_id: id(),
            number: number(),
        });
    }

    let value = if question.is_choice() {
        let selected = match input.value {
            AnswerValue::Text(text) => vec![text],
            AnswerValue::Choices(choices) => choices,
        };
        let mut picked = Vec::new();
        for raw in selected.iter().filter(|choice| !choice.trim().is_empty()) {
            let index = view
                .options
                .iter()
                .position(|option| option.trim() == raw.trim())
                .ok_or_else(|| AnswerError::NotAnOption {
                    question_id: id(),
                    number: number(),
                    value: raw.clone(),
                })?;
            if !picked.contains(&index) {
                picked.push(index);
            }
        }
        if question.allow_multiple {
            picked.sort_unstable();
            AnswerValue::Choices(picked.iter().map(|idx| view.options[*idx].clone()).collect())
        } else if picked.len() == 1 {
            AnswerValue::Text(view.options[picked[0]].clone())
        } else {
            return Err(AnswerError::MultipleNotAllowed {
                question_id: id(),
                number: number(),
            });
        }
    } else {
        match input.value {
            AnswerValue::Text(text) => AnswerValue::Text(text),
            AnswerValue::Choices(_) => {
                return Err(AnswerError::ExpectedText {
                    question_id: id(),
                    number: number(),
                });
            }
        }
    };

    let follow_up = input.follow_up.filter(|text| !text.trim().is_empty());
    if follow_up.is_some() && question.follow_up.is_none() {
        return Err(AnswerError::FollowUpNotOffered {
            question_id: id(),
            number: number(),
        });
    }

    Ok(Answer {
        question_id: id(),
        part_id: location.part.id.clone(),
        section_id: location.section.id.clone(),
        question_number: view.number,
        question_text: view.text,
        value,
        answered_at,
        follow_up,
    })
}
