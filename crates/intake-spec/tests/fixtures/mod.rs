#![allow(dead_code)]

use std::sync::Arc;

use intake_spec::{EffectiveSequence, Gender, Language, Questionnaire};
use serde_json::{Value, json};

fn text(en: &str, pt: &str) -> Value {
    json!({ "en": en, "pt": pt })
}

/// Two parts with one section each; part A carries a female-only question.
pub fn two_part_value() -> Value {
    json!({
        "id": "intake",
        "version": "1",
        "languages": ["en", "pt"],
        "default_language": "en",
        "parts": [
            {
                "id": "a",
                "title": text("Part A", "Parte A"),
                "sections": [
                    {
                        "id": "a1",
                        "title": text("History", "Histórico"),
                        "questions": [
                            { "id": "a1q1", "number": "1", "text": text("Age?", "Idade?"), "type": "free_text" },
                            { "id": "a1q2", "number": "2", "text": text("Cycle length?", "Duração do ciclo?"), "type": "free_text", "gender": "female" },
                            { "id": "a1q3", "number": "3", "text": text("Smoker?", "Fumante?"), "type": "single_choice",
                              "options": [text("Yes", "Sim"), text("No", "Não")],
                              "follow_up": text("How many per day?", "Quantos por dia?") }
                        ]
                    }
                ]
            },
            {
                "id": "b",
                "title": text("Part B", "Parte B"),
                "sections": [
                    {
                        "id": "b1",
                        "title": text("Lifestyle", "Estilo de vida"),
                        "questions": [
                            { "id": "b1q1", "number": "4", "text": text("Exercise?", "Exercício?"), "type": "single_choice",
                              "allow_multiple": true,
                              "options": [text("Walking", "Caminhada"), text("Running", "Corrida"), text("Swimming", "Natação")] },
                            { "id": "b1q2", "number": "5", "text": text("Diet notes", "Notas de dieta"), "type": "free_text" }
                        ]
                    }
                ]
            }
        ]
    })
}

/// Adds a male-only section between a1 and the end of part A, and a
/// female-only part between A and B.
pub fn branching_value() -> Value {
    let mut value = two_part_value();
    value["parts"][0]["sections"]
        .as_array_mut()
        .expect("sections array")
        .push(json!({
            "id": "a2",
            "title": text("Andrology", "Andrologia"),
            "questions": [
                { "id": "a2q1", "number": "6", "text": text("Prior semen analysis?", "Espermograma prévio?"),
                  "type": "single_choice", "gender": "male", "options": [text("Yes", "Sim"), text("No", "Não")] }
            ]
        }));
    value["parts"]
        .as_array_mut()
        .expect("parts array")
        .insert(1, json!({
            "id": "g",
            "title": text("Gynecology", "Ginecologia"),
            "sections": [
                {
                    "id": "g1",
                    "title": text("Cycle", "Ciclo"),
                    "questions": [
                        { "id": "g1q1", "number": "7", "text": text("Last period?", "Última menstruação?"), "type": "free_text", "gender": "female" },
                        { "id": "g1q2", "number": "8", "text": text("Regular?", "Regular?"), "type": "single_choice", "gender": "female",
                          "options": [text("Yes", "Sim"), text("No", "Não")] }
                    ]
                }
            ]
        }));
    value
}

pub fn two_part() -> Arc<Questionnaire> {
    Arc::new(Questionnaire::from_value(two_part_value()).expect("fixture definition is valid"))
}

pub fn branching() -> Arc<Questionnaire> {
    Arc::new(Questionnaire::from_value(branching_value()).expect("fixture definition is valid"))
}

pub fn en() -> Language {
    Language::parse("en").expect("en")
}

pub fn pt() -> Language {
    Language::parse("pt").expect("pt")
}

pub fn sequence(definition: &Arc<Questionnaire>, language: &Language, gender: Gender) -> EffectiveSequence {
    EffectiveSequence::build(Arc::clone(definition), language, gender).expect("sequence builds")
}
