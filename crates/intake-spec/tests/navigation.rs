mod fixtures;

use intake_spec::navigator::{self, Shape};
use intake_spec::{Gender, Position, Step};
use proptest::prelude::*;

fn shapes() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(1usize..5, 1..4), 1..5)
}

fn all_positions(shape: &Vec<Vec<usize>>) -> Vec<Position> {
    let mut positions = Vec::new();
    for (part, sections) in shape.iter().enumerate() {
        for (section, count) in sections.iter().enumerate() {
            for question in 0..*count {
                positions.push(Position::new(part, section, question));
            }
        }
    }
    positions
}

proptest! {
    #[test]
    fn next_then_previous_is_identity(shape in shapes()) {
        for position in all_positions(&shape) {
            match navigator::next(&shape, position) {
                Some(Step::At(after)) => {
                    prop_assert!(Shape::contains(&shape, after));
                    prop_assert_eq!(navigator::previous(&shape, after), Some(Step::At(position)));
                }
                Some(Step::End) => prop_assert_eq!(Some(position), navigator::last(&shape)),
                other => prop_assert!(false, "unexpected step {:?}", other),
            }
        }
    }

    #[test]
    fn previous_then_next_is_identity(shape in shapes()) {
        for position in all_positions(&shape) {
            match navigator::previous(&shape, position) {
                Some(Step::At(before)) => {
                    prop_assert!(Shape::contains(&shape, before));
                    prop_assert_eq!(navigator::next(&shape, before), Some(Step::At(position)));
                }
                Some(Step::Start) => prop_assert_eq!(Some(position), navigator::first(&shape)),
                other => prop_assert!(false, "unexpected step {:?}", other),
            }
        }
    }

    #[test]
    fn forward_walk_visits_every_position_once(shape in shapes()) {
        let expected = all_positions(&shape);
        let mut visited = Vec::new();
        let mut cursor = navigator::first(&shape);
        while let Some(position) = cursor {
            visited.push(position);
            cursor = navigator::next(&shape, position).and_then(Step::position);
        }
        prop_assert_eq!(visited, expected);
    }
}

#[test]
fn every_step_over_a_real_sequence_resolves_to_a_question() {
    let definition = fixtures::branching();
    for gender in Gender::ALL {
        let sequence = fixtures::sequence(&definition, &fixtures::en(), gender);
        let mut forward = Vec::new();
        let mut cursor = Step::At(sequence.first());
        while let Step::At(position) = cursor {
            assert!(sequence.position_to_question(position).is_some());
            forward.push(position);
            cursor = navigator::next(&sequence, position).expect("position in shape");
        }
        assert_eq!(cursor, Step::End);
        assert_eq!(forward.len(), sequence.total_question_count());

        let mut backward = Vec::new();
        let mut cursor = Step::At(sequence.last());
        while let Step::At(position) = cursor {
            assert!(sequence.position_to_question(position).is_some());
            backward.push(position);
            cursor = navigator::previous(&sequence, position).expect("position in shape");
        }
        assert_eq!(cursor, Step::Start);
        backward.reverse();
        assert_eq!(forward, backward);
    }
}

#[test]
fn crossing_from_part_a_lands_on_first_question_of_next_surviving_part() {
    let definition = fixtures::branching();
    let male = fixtures::sequence(&definition, &fixtures::en(), Gender::Male);
    // Part "g" is female-only, so part A's last section leads straight into part B.
    let step = navigator::next(&male, Position::new(0, 1, 0)).unwrap();
    assert_eq!(step, Step::At(Position::new(1, 0, 0)));
    assert_eq!(
        male.position_to_question(Position::new(1, 0, 0)).map(|q| q.id.as_str()),
        Some("b1q1")
    );
}
