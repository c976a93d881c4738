use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::answers::AnswerMap;
use crate::definition::{Gender, Language, Part, Question, QuestionKind, Questionnaire, Section};
use crate::error::{DefinitionError, DefinitionIssue};
use crate::navigator::{self, Shape};
use crate::position::Position;

#[derive(Debug, Clone)]
struct SectionSlot {
    raw: usize,
    /// Flat index of the first question in this section.
    offset: usize,
    questions: Vec<usize>,
}

#[derive(Debug, Clone)]
struct PartSlot {
    raw: usize,
    sections: Vec<SectionSlot>,
}

/// Gender-filtered, flattened ordering of a questionnaire for one language.
///
/// Sections (and parts) left without questions after filtering are dropped,
/// so every [`Position`] inside the shape resolves to exactly one question.
/// Building twice from the same inputs yields identical addressing.
#[derive(Debug, Clone)]
pub struct EffectiveSequence {
    definition: Arc<Questionnaire>,
    language: Language,
    fallback: Language,
    gender: Gender,
    parts: Vec<PartSlot>,
    lookup: BTreeMap<String, Position>,
    total: usize,
}

/// A resolved question together with its enclosing part and section.
#[derive(Debug, Clone, Copy)]
pub struct Location<'a> {
    pub position: Position,
    pub part: &'a Part,
    pub section: &'a Section,
    pub question: &'a Question,
}

/// Per-section entry for the overview and "jump to section".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub part_id: String,
    pub section_id: String,
    pub part_title: String,
    pub title: String,
    pub question_count: usize,
    pub first: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartSummary {
    pub part_id: String,
    pub title: String,
    pub section_count: usize,
    pub question_count: usize,
    pub first: Position,
}

/// Question text resolved for the session language, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub number: String,
    pub text: String,
    pub kind: QuestionKind,
    pub allow_multiple: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    pub part_title: String,
    pub section_title: String,
    pub position: Position,
    /// 1-based index within the whole sequence.
    pub ordinal: usize,
    pub total: usize,
}

/// Where a resumed session continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Intact(Position),
    /// The stored cursor no longer resolves (the definition changed).
    Relocated { stored: Position, resumed_at: Position },
}

impl Resume {
    pub fn position(self) -> Position {
        match self {
            Resume::Intact(position) => position,
            Resume::Relocated { resumed_at, .. } => resumed_at,
        }
    }
}

impl EffectiveSequence {
    pub fn build(
        definition: Arc<Questionnaire>,
        language: &Language,
        gender: Gender,
    ) -> Result<Self, DefinitionError> {
        let language = definition.resolve_language(language)?;
        let fallback = definition.default_language()?;

        let mut parts = Vec::new();
        let mut lookup = BTreeMap::new();
        let mut total = 0;

        for (raw_part, part) in definition.parts.iter().enumerate() {
            let mut sections = Vec::new();
            for (raw_section, section) in part.sections.iter().enumerate() {
                let questions = section
                    .questions
                    .iter()
                    .enumerate()
                    .filter(|(_, question)| question.gender_scope.includes(gender))
                    .map(|(idx, _)| idx)
                    .collect::<Vec<_>>();
                if questions.is_empty() {
                    continue;
                }

                let part_idx = parts.len();
                let section_idx = sections.len();
                for (question_idx, raw_question) in questions.iter().enumerate() {
                    let id = &section.questions[*raw_question].id;
                    let position = Position::new(part_idx, section_idx, question_idx);
                    // Answers are keyed by question id, so ids must be unique.
                    if lookup.insert(id.clone(), position).is_some() {
                        return Err(DefinitionError::Invalid(vec![
                            DefinitionIssue::DuplicateQuestionId(id.clone()),
                        ]));
                    }
                }
                let offset = total;
                total += questions.len();
                sections.push(SectionSlot {
                    raw: raw_section,
                    offset,
                    questions,
                });
            }
            if !sections.is_empty() {
                parts.push(PartSlot {
                    raw: raw_part,
                    sections,
                });
            }
        }

        if total == 0 {
            return Err(DefinitionError::EmptySequence(gender));
        }

        tracing::debug!(
            questionnaire = %definition.id,
            language = %language,
            gender = %gender,
            total,
            "effective sequence built"
        );

        Ok(Self {
            definition,
            language,
            fallback,
            gender,
            parts,
            lookup,
            total,
        })
    }

    pub fn definition(&self) -> &Arc<Questionnaire> {
        &self.definition
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn total_question_count(&self) -> usize {
        self.total
    }

    pub fn position_to_question(&self, position: Position) -> Option<&Question> {
        self.locate(position).map(|location| location.question)
    }

    pub fn locate(&self, position: Position) -> Option<Location<'_>> {
        let part_slot = self.parts.get(position.part)?;
        let section_slot = part_slot.sections.get(position.section)?;
        let raw_question = *section_slot.questions.get(position.question)?;
        let part = &self.definition.parts[part_slot.raw];
        let section = &part.sections[section_slot.raw];
        Some(Location {
            position,
            part,
            section,
            question: &section.questions[raw_question],
        })
    }

    pub fn position_of(&self, question_id: &str) -> Option<Position> {
        self.lookup.get(question_id).copied()
    }

    pub fn contains_question(&self, question_id: &str) -> bool {
        self.lookup.contains_key(question_id)
    }

    /// Sequence start. Always present: empty sequences are rejected at build time.
    pub fn first(&self) -> Position {
        navigator::first(self).unwrap_or_default()
    }

    pub fn last(&self) -> Position {
        navigator::last(self).unwrap_or_default()
    }

    /// 1-based index of `position` in the flattened sequence.
    pub fn ordinal(&self, position: Position) -> Option<usize> {
        let section = self
            .parts
            .get(position.part)?
            .sections
            .get(position.section)?;
        (position.question < section.questions.len())
            .then_some(section.offset + position.question + 1)
    }

    /// Every question in order with its position.
    pub fn entries(&self) -> impl Iterator<Item = (Position, &Question)> + '_ {
        self.parts.iter().enumerate().flat_map(move |(part_idx, part_slot)| {
            let part = &self.definition.parts[part_slot.raw];
            part_slot
                .sections
                .iter()
                .enumerate()
                .flat_map(move |(section_idx, section_slot)| {
                    let section = &part.sections[section_slot.raw];
                    section_slot
                        .questions
                        .iter()
                        .enumerate()
                        .map(move |(question_idx, raw)| {
                            (
                                Position::new(part_idx, section_idx, question_idx),
                                &section.questions[*raw],
                            )
                        })
                })
        })
    }

    pub fn section_summaries(&self) -> Vec<SectionSummary> {
        let mut summaries = Vec::new();
        for (part_idx, part_slot) in self.parts.iter().enumerate() {
            let part = &self.definition.parts[part_slot.raw];
            let part_title = self.text(&part.title);
            for (section_idx, section_slot) in part_slot.sections.iter().enumerate() {
                let section = &part.sections[section_slot.raw];
                summaries.push(SectionSummary {
                    part_id: part.id.clone(),
                    section_id: section.id.clone(),
                    part_title: part_title.clone(),
                    title: self.text(&section.title),
                    question_count: section_slot.questions.len(),
                    first: Position::new(part_idx, section_idx, 0),
                });
            }
        }
        summaries
    }

    pub fn part_summaries(&self) -> Vec<PartSummary> {
        self.parts
            .iter()
            .enumerate()
            .map(|(part_idx, part_slot)| {
                let part = &self.definition.parts[part_slot.raw];
                PartSummary {
                    part_id: part.id.clone(),
                    title: self.text(&part.title),
                    section_count: part_slot.sections.len(),
                    question_count: part_slot
                        .sections
                        .iter()
                        .map(|section| section.questions.len())
                        .sum(),
                    first: Position::new(part_idx, 0, 0),
                }
            })
            .collect()
    }

    /// Whether `position` is the first question of some section.
    pub fn is_section_start(&self, position: Position) -> bool {
        position.question == 0 && self.contains(position)
    }

    pub fn view(&self, position: Position) -> Option<QuestionView> {
        let location = self.locate(position)?;
        let question = location.question;
        Some(QuestionView {
            id: question.id.clone(),
            number: question.number.clone(),
            text: self.text(&question.text),
            kind: question.kind,
            allow_multiple: question.allow_multiple,
            options: question.options.iter().map(|option| self.text(option)).collect(),
            follow_up: question.follow_up.as_ref().map(|prompt| self.text(prompt)),
            part_title: self.text(&location.part.title),
            section_title: self.text(&location.section.title),
            position,
            ordinal: self.ordinal(position)?,
            total: self.total,
        })
    }

    /// Validates a stored cursor, clamping it when it no longer resolves.
    ///
    /// A drifted cursor moves to the start of the first section that still has
    /// unanswered questions, or to the last question when everything is answered.
    pub fn resume_position(&self, stored: Position, answers: &AnswerMap) -> Resume {
        if self.contains(stored) {
            return Resume::Intact(stored);
        }

        let resumed_at = self
            .parts
            .iter()
            .enumerate()
            .flat_map(|(part_idx, part_slot)| {
                part_slot
                    .sections
                    .iter()
                    .enumerate()
                    .map(move |(section_idx, _)| Position::new(part_idx, section_idx, 0))
            })
            .find(|start| {
                self.section_questions(*start)
                    .any(|question| !answers.contains(&question.id))
            })
            .unwrap_or_else(|| self.last());

        tracing::warn!(
            stored = %stored,
            resumed_at = %resumed_at,
            "stored position does not resolve; relocating"
        );
        Resume::Relocated { stored, resumed_at }
    }

    /// Questions of the section containing `position`.
    pub(crate) fn section_questions(&self, position: Position) -> impl Iterator<Item = &Question> {
        let slot = self
            .parts
            .get(position.part)
            .and_then(|part| part.sections.get(position.section).map(|s| (part.raw, s)));
        slot.into_iter().flat_map(move |(raw_part, section_slot)| {
            let section = &self.definition.parts[raw_part].sections[section_slot.raw];
            section_slot
                .questions
                .iter()
                .map(move |raw| &section.questions[*raw])
        })
    }

    fn text(&self, text: &crate::definition::LocalizedText) -> String {
        text.resolve(&self.language, &self.fallback).to_string()
    }
}

impl Shape for EffectiveSequence {
    fn part_count(&self) -> usize {
        self.parts.len()
    }

    fn section_count(&self, part: usize) -> usize {
        self.parts.get(part).map_or(0, |slot| slot.sections.len())
    }

    fn question_count(&self, part: usize, section: usize) -> usize {
        self.parts
            .get(part)
            .and_then(|slot| slot.sections.get(section))
            .map_or(0, |slot| slot.questions.len())
    }
}
