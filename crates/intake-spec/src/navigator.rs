//! Sequential cursor movement across section and part boundaries.
//!
//! Both operations are pure functions of the sequence shape and a position.
//! Empty sections and parts never exist in a shape produced by the indexer,
//! so crossing a boundary always lands on a real question.

use crate::position::{Position, Step};

/// Layout of a filtered sequence: parts, their sections, their question counts.
pub trait Shape {
    fn part_count(&self) -> usize;
    fn section_count(&self, part: usize) -> usize;
    fn question_count(&self, part: usize, section: usize) -> usize;

    fn contains(&self, position: Position) -> bool {
        position.part < self.part_count()
            && position.section < self.section_count(position.part)
            && position.question < self.question_count(position.part, position.section)
    }
}

/// Plain nested counts; `shape[part][section]` is the number of questions.
impl Shape for [Vec<usize>] {
    fn part_count(&self) -> usize {
        self.len()
    }

    fn section_count(&self, part: usize) -> usize {
        self.get(part).map_or(0, Vec::len)
    }

    fn question_count(&self, part: usize, section: usize) -> usize {
        self.get(part)
            .and_then(|sections| sections.get(section))
            .copied()
            .unwrap_or(0)
    }
}

impl Shape for Vec<Vec<usize>> {
    fn part_count(&self) -> usize {
        self.as_slice().part_count()
    }

    fn section_count(&self, part: usize) -> usize {
        self.as_slice().section_count(part)
    }

    fn question_count(&self, part: usize, section: usize) -> usize {
        self.as_slice().question_count(part, section)
    }
}

/// Next position, or [`Step::End`] after the last question.
///
/// Returns `None` when `position` is not part of `shape`.
pub fn next<S: Shape + ?Sized>(shape: &S, position: Position) -> Option<Step> {
    if !shape.contains(position) {
        return None;
    }
    let Position {
        part,
        section,
        question,
    } = position;

    if question + 1 < shape.question_count(part, section) {
        return Some(Step::At(Position::new(part, section, question + 1)));
    }
    if let Some(start) = first_from(shape, part, section + 1) {
        return Some(Step::At(start));
    }
    for next_part in part + 1..shape.part_count() {
        if let Some(start) = first_from(shape, next_part, 0) {
            return Some(Step::At(start));
        }
    }
    Some(Step::End)
}

/// Previous position, or [`Step::Start`] at the very first question.
///
/// Returns `None` when `position` is not part of `shape`.
pub fn previous<S: Shape + ?Sized>(shape: &S, position: Position) -> Option<Step> {
    if !shape.contains(position) {
        return None;
    }
    let Position {
        part,
        section,
        question,
    } = position;

    if question > 0 {
        return Some(Step::At(Position::new(part, section, question - 1)));
    }
    if let Some(end) = last_before(shape, part, section) {
        return Some(Step::At(end));
    }
    for prior_part in (0..part).rev() {
        if let Some(end) = last_before(shape, prior_part, shape.section_count(prior_part)) {
            return Some(Step::At(end));
        }
    }
    Some(Step::Start)
}

/// First question of the sequence.
pub fn first<S: Shape + ?Sized>(shape: &S) -> Option<Position> {
    (0..shape.part_count()).find_map(|part| first_from(shape, part, 0))
}

/// Last question of the sequence.
pub fn last<S: Shape + ?Sized>(shape: &S) -> Option<Position> {
    (0..shape.part_count())
        .rev()
        .find_map(|part| last_before(shape, part, shape.section_count(part)))
}

fn first_from<S: Shape + ?Sized>(shape: &S, part: usize, from_section: usize) -> Option<Position> {
    (from_section..shape.section_count(part))
        .find(|section| shape.question_count(part, *section) > 0)
        .map(|section| Position::new(part, section, 0))
}

fn last_before<S: Shape + ?Sized>(shape: &S, part: usize, before_section: usize) -> Option<Position> {
    (0..before_section.min(shape.section_count(part)))
        .rev()
        .find_map(|section| {
            shape
                .question_count(part, section)
                .checked_sub(1)
                .map(|question| Position::new(part, section, question))
        })
}
