use thiserror::Error;

use crate::definition::Gender;
use crate::position::Position;

/// Authoring problem found while loading a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionIssue {
    #[error("no languages declared")]
    NoLanguages,
    #[error("invalid language tag '{0}'")]
    InvalidLanguage(String),
    #[error("language '{0}' declared more than once")]
    DuplicateLanguage(String),
    #[error("default language '{0}' is not among the declared languages")]
    DefaultLanguageNotDeclared(String),
    #[error("questionnaire has no parts")]
    NoParts,
    #[error("part id '{0}' is used more than once")]
    DuplicatePartId(String),
    #[error("section id '{section}' is used more than once in part '{part}'")]
    DuplicateSectionId { part: String, section: String },
    #[error("question id '{0}' is used more than once")]
    DuplicateQuestionId(String),
    #[error("{field} is empty")]
    EmptyId { field: String },
    #[error("choice question '{0}' has no options")]
    EmptyOptions(String),
    #[error("free-text question '{0}' declares options")]
    UnexpectedOptions(String),
    #[error("free-text question '{0}' cannot allow multiple selections")]
    MultipleOnFreeText(String),
    #[error("{field} has no '{language}' text")]
    MissingTranslation { field: String, language: String },
    #[error("no questions apply to {0} participants")]
    EmptyForGender(Gender),
}

/// Configuration errors. Fatal: a session cannot start.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to parse questionnaire definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("questionnaire definition is invalid: {}", join_issues(.0))]
    Invalid(Vec<DefinitionIssue>),
    #[error("invalid language tag '{0}'")]
    InvalidLanguage(String),
    #[error("language '{0}' is not offered by this questionnaire")]
    UnsupportedLanguage(String),
    #[error("no questions apply to {0} participants")]
    EmptySequence(Gender),
}

fn join_issues(issues: &[DefinitionIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Rejected answer submission. Recoverable; the cursor does not move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("an answer is required for question {number}")]
    Empty { question_id: String, number: String },
    #[error("'{value}' is not an option for question {number}")]
    NotAnOption {
        question_id: String,
        number: String,
        value: String,
    },
    #[error("question {number} accepts a single option")]
    MultipleNotAllowed { question_id: String, number: String },
    #[error("question {number} expects free text")]
    ExpectedText { question_id: String, number: String },
    #[error("question {number} has no follow-up field")]
    FollowUpNotOffered { question_id: String, number: String },
    #[error("no question at position {0}")]
    NoQuestionAt(Position),
}
