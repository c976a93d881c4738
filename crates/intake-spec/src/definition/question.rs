use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::text::LocalizedText;

/// Supported input types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    FreeText,
    SingleChoice,
}

/// Participant gender as reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(format!("unknown gender '{other}'")),
        }
    }
}

/// Which participants a question is asked of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenderScope {
    #[default]
    Any,
    Male,
    Female,
}

impl GenderScope {
    pub fn includes(self, gender: Gender) -> bool {
        match self {
            GenderScope::Any => true,
            GenderScope::Male => gender == Gender::Male,
            GenderScope::Female => gender == Gender::Female,
        }
    }
}

/// Definition of a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    pub id: String,
    /// Display label such as `12` or `3a`.
    pub number: String,
    pub text: LocalizedText,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<LocalizedText>,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default, rename = "gender")]
    pub gender_scope: GenderScope,
    /// Free-text prompt shown once the question has an answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<LocalizedText>,
}

impl Question {
    pub fn is_choice(&self) -> bool {
        matches!(self.kind, QuestionKind::SingleChoice)
    }
}
