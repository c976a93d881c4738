use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::DefinitionError;

/// Normalised language tag (`en`, `pt-BR`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn parse(raw: &str) -> Result<Self, DefinitionError> {
        normalize_tag(raw)
            .map(Self)
            .ok_or_else(|| DefinitionError::InvalidLanguage(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary subtag, used when a regional variant has no dedicated text.
    pub fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Language {
    type Error = DefinitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.0
    }
}

pub(crate) fn normalize_tag(raw: &str) -> Option<String> {
    let mut cleaned = raw.trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Some((head, _)) = cleaned.split_once('.') {
        cleaned = head;
    }
    cleaned
        .replace('_', "-")
        .parse::<LanguageIdentifier>()
        .ok()
        .map(|lid| lid.to_string())
}

/// Display text keyed by language tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, language: &str, text: impl Into<String>) -> Self {
        self.0.insert(language.to_string(), text.into());
        self
    }

    /// Exact lookup, then the language's primary subtag.
    pub fn get(&self, language: &Language) -> Option<&str> {
        self.lookup(language.as_str())
            .or_else(|| self.lookup(language.base()))
    }

    /// Resolves `language`, then `fallback`, then any entry at all.
    pub fn resolve(&self, language: &Language, fallback: &Language) -> &str {
        self.get(language)
            .or_else(|| self.get(fallback))
            .or_else(|| self.0.values().next().map(String::as_str))
            .unwrap_or_default()
    }

    pub(crate) fn has_language(&self, tag: &str) -> bool {
        self.lookup(tag).is_some_and(|text| !text.trim().is_empty())
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn lookup(&self, tag: &str) -> Option<&str> {
        if let Some(text) = self.0.get(tag) {
            return Some(text);
        }
        self.0
            .iter()
            .find(|(key, _)| normalize_tag(key).as_deref() == Some(tag))
            .map(|(_, text)| text.as_str())
    }
}
