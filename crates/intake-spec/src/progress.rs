use serde::Serialize;

use crate::answers::AnswerMap;
use crate::index::EffectiveSequence;
use crate::navigator::Shape;
use crate::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverallProgress {
    pub answered: usize,
    pub total: usize,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionProgress {
    pub part_id: String,
    pub section_id: String,
    pub title: String,
    pub answered: usize,
    pub total: usize,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartProgress {
    pub part_id: String,
    pub title: String,
    pub answered: usize,
    pub total: usize,
    pub is_complete: bool,
}

/// Rounded percentage; an empty total reports zero.
pub fn percent(answered: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let answered = answered.min(total);
    ((answered * 200 + total) / (total * 2)) as u8
}

/// Answers that still address a question of this sequence.
pub fn overall_progress(sequence: &EffectiveSequence, answers: &AnswerMap) -> OverallProgress {
    let total = sequence.total_question_count();
    let answered = answers
        .values()
        .filter(|answer| sequence.contains_question(&answer.question_id))
        .count();
    OverallProgress {
        answered,
        total,
        percent: percent(answered, total),
    }
}

/// Per-section counts in sequence order.
pub fn per_section_progress(
    sequence: &EffectiveSequence,
    answers: &AnswerMap,
) -> Vec<SectionProgress> {
    sequence
        .section_summaries()
        .into_iter()
        .map(|summary| {
            let answered = answered_in_section(sequence, answers, summary.first, |answer| {
                answer.part_id == summary.part_id && answer.section_id == summary.section_id
            });
            SectionProgress {
                is_complete: answered == summary.question_count,
                part_id: summary.part_id,
                section_id: summary.section_id,
                title: summary.title,
                answered,
                total: summary.question_count,
            }
        })
        .collect()
}

pub fn per_part_progress(sequence: &EffectiveSequence, answers: &AnswerMap) -> Vec<PartProgress> {
    sequence
        .part_summaries()
        .into_iter()
        .enumerate()
        .map(|(part_idx, summary)| {
            let answered = (0..sequence.section_count(part_idx))
                .map(|section_idx| {
                    answered_in_section(
                        sequence,
                        answers,
                        Position::new(part_idx, section_idx, 0),
                        |answer| answer.part_id == summary.part_id,
                    )
                })
                .sum();
            PartProgress {
                is_complete: answered == summary.question_count,
                part_id: summary.part_id,
                title: summary.title,
                answered,
                total: summary.question_count,
            }
        })
        .collect()
}

fn answered_in_section(
    sequence: &EffectiveSequence,
    answers: &AnswerMap,
    section_start: Position,
    belongs: impl Fn(&crate::answers::Answer) -> bool,
) -> usize {
    sequence
        .section_questions(section_start)
        .filter(|question| answers.get(&question.id).is_some_and(&belongs))
        .count()
}
