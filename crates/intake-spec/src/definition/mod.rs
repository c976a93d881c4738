pub mod question;
pub mod text;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DefinitionError;
use crate::validate;

pub use question::{Gender, GenderScope, Question, QuestionKind};
pub use text::{Language, LocalizedText};

/// Grouping of questions within a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub id: String,
    pub title: LocalizedText,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Top-level grouping of the questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Part {
    pub id: String,
    pub title: LocalizedText,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// Immutable questionnaire content, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Questionnaire {
    pub id: String,
    pub version: String,
    /// Language tags every localized field must provide.
    pub languages: Vec<String>,
    pub default_language: String,
    pub parts: Vec<Part>,
}

impl Questionnaire {
    /// Parses and validates a definition. Any authoring error is fatal.
    pub fn from_json(raw: &str) -> Result<Self, DefinitionError> {
        let definition: Questionnaire = serde_json::from_str(raw)?;
        definition.validated()
    }

    pub fn from_value(value: Value) -> Result<Self, DefinitionError> {
        let definition: Questionnaire = serde_json::from_value(value)?;
        definition.validated()
    }

    fn validated(self) -> Result<Self, DefinitionError> {
        let issues = validate::validate(&self);
        if issues.is_empty() {
            tracing::debug!(
                questionnaire = %self.id,
                version = %self.version,
                parts = self.parts.len(),
                "questionnaire definition loaded"
            );
            Ok(self)
        } else {
            Err(DefinitionError::Invalid(issues))
        }
    }

    /// Declared languages, normalised. Invalid tags are reported by validation.
    pub fn supported_languages(&self) -> Vec<Language> {
        self.languages
            .iter()
            .filter_map(|tag| Language::parse(tag).ok())
            .collect()
    }

    pub fn default_language(&self) -> Result<Language, DefinitionError> {
        Language::parse(&self.default_language)
    }

    /// Returns the declared language matching `requested`, tolerating regional variants.
    pub fn resolve_language(&self, requested: &Language) -> Result<Language, DefinitionError> {
        let supported = self.supported_languages();
        supported
            .iter()
            .find(|language| *language == requested)
            .or_else(|| {
                supported
                    .iter()
                    .find(|language| language.as_str() == requested.base())
            })
            .cloned()
            .ok_or_else(|| DefinitionError::UnsupportedLanguage(requested.to_string()))
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.parts
            .iter()
            .flat_map(|part| &part.sections)
            .flat_map(|section| &section.questions)
            .find(|question| question.id == id)
    }

    /// JSON Schema describing the definition format.
    pub fn json_schema() -> Value {
        serde_json::to_value(schemars::schema_for!(Questionnaire)).unwrap_or(Value::Null)
    }
}
