mod fixtures;

use std::sync::Arc;

use intake_spec::{
    Answer, AnswerMap, AnswerValue, DefinitionError, DefinitionIssue, EffectiveSequence, Gender,
    GenderScope, Position, QuestionKind, Questionnaire, Resume,
};
use insta::assert_json_snapshot;
use time::macros::datetime;

#[test]
fn male_sequence_skips_female_only_question() {
    let definition = fixtures::two_part();
    let sequence = fixtures::sequence(&definition, &fixtures::en(), Gender::Male);

    assert_eq!(sequence.total_question_count(), 4);
    let first = sequence
        .position_to_question(Position::new(0, 0, 0))
        .expect("first question");
    assert_eq!(first.id, "a1q1");
    assert_eq!(
        sequence.position_to_question(Position::new(0, 0, 1)).map(|q| q.id.as_str()),
        Some("a1q3")
    );
    assert!(sequence.position_to_question(Position::new(0, 0, 2)).is_none());
    assert!(!sequence.contains_question("a1q2"));
}

#[test]
fn duplicate_ids_are_rejected_even_without_load_validation() {
    let mut value = fixtures::two_part_value();
    value["parts"][0]["sections"][0]["questions"][0]["id"] = "b1q1".into();
    let definition: Questionnaire = serde_json::from_value(value).expect("deserializes");

    let err = EffectiveSequence::build(Arc::new(definition), &fixtures::en(), Gender::Male)
        .expect_err("duplicate id");
    match err {
        DefinitionError::Invalid(issues) => assert_eq!(
            issues,
            vec![DefinitionIssue::DuplicateQuestionId("b1q1".into())]
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn female_sequence_keeps_female_questions() {
    let definition = fixtures::two_part();
    let sequence = fixtures::sequence(&definition, &fixtures::en(), Gender::Female);
    assert_eq!(sequence.total_question_count(), 5);
    assert_eq!(sequence.position_of("a1q2"), Some(Position::new(0, 0, 1)));
}

#[test]
fn gender_filtering_never_leaks_across_genders() {
    let definition = fixtures::branching();
    for gender in Gender::ALL {
        let sequence = fixtures::sequence(&definition, &fixtures::en(), gender);
        for (_, question) in sequence.entries() {
            assert!(
                question.gender_scope.includes(gender),
                "{} leaked into {gender} sequence",
                question.id
            );
        }
        let any_count = definition
            .parts
            .iter()
            .flat_map(|part| &part.sections)
            .flat_map(|section| &section.questions)
            .filter(|question| question.gender_scope == GenderScope::Any)
            .filter(|question| sequence.contains_question(&question.id))
            .count();
        assert_eq!(any_count, 4);
    }
}

#[test]
fn sections_and_parts_emptied_by_filtering_are_dropped() {
    let definition = fixtures::branching();

    let male = fixtures::sequence(&definition, &fixtures::en(), Gender::Male);
    let male_sections = male
        .section_summaries()
        .into_iter()
        .map(|summary| summary.section_id)
        .collect::<Vec<_>>();
    assert_eq!(male_sections, ["a1", "a2", "b1"]);
    assert_eq!(male.part_summaries().len(), 2);

    let female = fixtures::sequence(&definition, &fixtures::en(), Gender::Female);
    let female_sections = female
        .section_summaries()
        .into_iter()
        .map(|summary| summary.section_id)
        .collect::<Vec<_>>();
    assert_eq!(female_sections, ["a1", "g1", "b1"]);
    assert_eq!(female.position_of("g1q1"), Some(Position::new(1, 0, 0)));
}

#[test]
fn rebuilding_is_deterministic() {
    let definition = fixtures::branching();
    for gender in Gender::ALL {
        let first = fixtures::sequence(&definition, &fixtures::pt(), gender);
        let second = fixtures::sequence(&definition, &fixtures::pt(), gender);
        let order = |seq: &intake_spec::EffectiveSequence| {
            seq.entries()
                .map(|(position, question)| (position, question.id.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(order(&first), order(&second));
        assert_eq!(first.section_summaries(), second.section_summaries());
    }
}

#[test]
fn section_summaries_use_the_session_language() {
    let definition = fixtures::branching();
    let sequence = fixtures::sequence(&definition, &fixtures::pt(), Gender::Female);
    assert_json_snapshot!(sequence.section_summaries(), @r#"
    [
      {
        "part_id": "a",
        "section_id": "a1",
        "part_title": "Parte A",
        "title": "Histórico",
        "question_count": 3,
        "first": {
          "part_index": 0,
          "section_index": 0,
          "question_index": 0
        }
      },
      {
        "part_id": "g",
        "section_id": "g1",
        "part_title": "Ginecologia",
        "title": "Ciclo",
        "question_count": 2,
        "first": {
          "part_index": 1,
          "section_index": 0,
          "question_index": 0
        }
      },
      {
        "part_id": "b",
        "section_id": "b1",
        "part_title": "Parte B",
        "title": "Estilo de vida",
        "question_count": 2,
        "first": {
          "part_index": 2,
          "section_index": 0,
          "question_index": 0
        }
      }
    ]
    "#);
}

#[test]
fn question_view_resolves_localized_text() {
    let definition = fixtures::two_part();
    let sequence = fixtures::sequence(&definition, &fixtures::pt(), Gender::Male);
    let view = sequence.view(Position::new(0, 0, 1)).expect("view");
    assert_eq!(view.id, "a1q3");
    assert_eq!(view.text, "Fumante?");
    assert_eq!(view.kind, QuestionKind::SingleChoice);
    assert_eq!(view.options, ["Sim", "Não"]);
    assert_eq!(view.follow_up.as_deref(), Some("Quantos por dia?"));
    assert_eq!((view.ordinal, view.total), (2, 4));
    assert_eq!(sequence.first(), Position::new(0, 0, 0));
    assert_eq!(sequence.last(), Position::new(1, 0, 1));
}

fn answer(question_id: &str, part_id: &str, section_id: &str) -> Answer {
    Answer {
        question_id: question_id.into(),
        part_id: part_id.into(),
        section_id: section_id.into(),
        question_number: "0".into(),
        question_text: "snapshot".into(),
        value: AnswerValue::Text("x".into()),
        answered_at: datetime!(2026-01-05 10:00 UTC),
        follow_up: None,
    }
}

#[test]
fn drifted_position_is_clamped_to_first_incomplete_section() {
    let definition = fixtures::branching();
    let sequence = fixtures::sequence(&definition, &fixtures::en(), Gender::Male);

    let valid = Position::new(0, 1, 0);
    assert_eq!(
        sequence.resume_position(valid, &AnswerMap::new()),
        Resume::Intact(valid)
    );

    let answers: AnswerMap = [answer("a1q1", "a", "a1"), answer("a1q3", "a", "a1")]
        .into_iter()
        .collect();
    let stale = Position::new(0, 5, 3);
    assert_eq!(
        sequence.resume_position(stale, &answers),
        Resume::Relocated {
            stored: stale,
            resumed_at: Position::new(0, 1, 0)
        }
    );
}

#[test]
fn drift_with_everything_answered_resumes_at_last_question() {
    let definition = fixtures::two_part();
    let sequence = fixtures::sequence(&definition, &fixtures::en(), Gender::Male);
    let answers: AnswerMap = sequence
        .entries()
        .map(|(position, question)| {
            let location = sequence.locate(position).unwrap();
            answer(&question.id, &location.part.id, &location.section.id)
        })
        .collect();
    let resume = sequence.resume_position(Position::new(9, 9, 9), &answers);
    assert_eq!(resume.position(), sequence.last());
}
