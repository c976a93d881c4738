use std::collections::BTreeSet;

use crate::definition::text::normalize_tag;
use crate::definition::{Gender, LocalizedText, Question, QuestionKind, Questionnaire};
use crate::error::DefinitionIssue;

/// Checks authoring invariants. An empty result means the definition is usable.
pub fn validate(definition: &Questionnaire) -> Vec<DefinitionIssue> {
    let mut issues = Vec::new();
    let languages = check_languages(definition, &mut issues);

    if definition.parts.is_empty() {
        issues.push(DefinitionIssue::NoParts);
    }

    let mut part_ids = BTreeSet::new();
    let mut question_ids = BTreeSet::new();

    for part in &definition.parts {
        let part_field = format!("part '{}'", part.id);
        check_id(&part.id, "part id", &mut issues);
        if !part_ids.insert(part.id.as_str()) {
            issues.push(DefinitionIssue::DuplicatePartId(part.id.clone()));
        }
        check_text(&part.title, &format!("{part_field} title"), &languages, &mut issues);

        let mut section_ids = BTreeSet::new();
        for section in &part.sections {
            let section_field = format!("section '{}/{}'", part.id, section.id);
            check_id(&section.id, "section id", &mut issues);
            if !section_ids.insert(section.id.as_str()) {
                issues.push(DefinitionIssue::DuplicateSectionId {
                    part: part.id.clone(),
                    section: section.id.clone(),
                });
            }
            check_text(
                &section.title,
                &format!("{section_field} title"),
                &languages,
                &mut issues,
            );

            for question in &section.questions {
                check_id(&question.id, "question id", &mut issues);
                if !question_ids.insert(question.id.as_str()) {
                    issues.push(DefinitionIssue::DuplicateQuestionId(question.id.clone()));
                }
                check_question(question, &languages, &mut issues);
            }
        }
    }

    // Only meaningful once the structure itself is sound.
    if issues.is_empty() {
        for gender in Gender::ALL {
            if count_for(definition, gender) == 0 {
                issues.push(DefinitionIssue::EmptyForGender(gender));
            }
        }
    }

    issues
}

fn check_languages(definition: &Questionnaire, issues: &mut Vec<DefinitionIssue>) -> Vec<String> {
    if definition.languages.is_empty() {
        issues.push(DefinitionIssue::NoLanguages);
    }

    let mut seen = BTreeSet::new();
    let mut languages = Vec::new();
    for raw in &definition.languages {
        match normalize_tag(raw) {
            Some(tag) => {
                if seen.insert(tag.clone()) {
                    languages.push(tag);
                } else {
                    issues.push(DefinitionIssue::DuplicateLanguage(raw.clone()));
                }
            }
            None => issues.push(DefinitionIssue::InvalidLanguage(raw.clone())),
        }
    }

    let default_declared = normalize_tag(&definition.default_language)
        .is_some_and(|tag| languages.contains(&tag));
    if !default_declared {
        issues.push(DefinitionIssue::DefaultLanguageNotDeclared(
            definition.default_language.clone(),
        ));
    }

    languages
}

fn check_question(question: &Question, languages: &[String], issues: &mut Vec<DefinitionIssue>) {
    let field = format!("question '{}'", question.id);
    check_text(&question.text, &format!("{field} text"), languages, issues);

    match question.kind {
        QuestionKind::SingleChoice => {
            if question.options.is_empty() {
                issues.push(DefinitionIssue::EmptyOptions(question.id.clone()));
            }
            for (idx, option) in question.options.iter().enumerate() {
                check_text(option, &format!("{field} option {}", idx + 1), languages, issues);
            }
        }
        QuestionKind::FreeText => {
            if !question.options.is_empty() {
                issues.push(DefinitionIssue::UnexpectedOptions(question.id.clone()));
            }
            if question.allow_multiple {
                issues.push(DefinitionIssue::MultipleOnFreeText(question.id.clone()));
            }
        }
    }

    if let Some(follow_up) = &question.follow_up {
        check_text(follow_up, &format!("{field} follow-up"), languages, issues);
    }
}

fn check_id(id: &str, field: &str, issues: &mut Vec<DefinitionIssue>) {
    if id.trim().is_empty() {
        issues.push(DefinitionIssue::EmptyId {
            field: field.to_string(),
        });
    }
}

fn check_text(
    text: &LocalizedText,
    field: &str,
    languages: &[String],
    issues: &mut Vec<DefinitionIssue>,
) {
    for language in languages {
        if !text.has_language(language) {
            issues.push(DefinitionIssue::MissingTranslation {
                field: field.to_string(),
                language: language.clone(),
            });
        }
    }
}

fn count_for(definition: &Questionnaire, gender: Gender) -> usize {
    definition
        .parts
        .iter()
        .flat_map(|part| &part.sections)
        .flat_map(|section| &section.questions)
        .filter(|question| question.gender_scope.includes(gender))
        .count()
}
