use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::sync::OnceLock;

use unic_langid::LanguageIdentifier;

const SUPPORTED_LOCALES: &[&str] = &["en", "pt"];

static EN_MESSAGES: OnceLock<BTreeMap<String, String>> = OnceLock::new();
static SELECTED_LOCALE: OnceLock<String> = OnceLock::new();
static LOCALE_MESSAGES: OnceLock<BTreeMap<String, String>> = OnceLock::new();
static EN_VALUE_TO_KEY: OnceLock<BTreeMap<String, String>> = OnceLock::new();

fn embedded_catalog(locale: &str) -> Option<&'static str> {
    match locale {
        "en" => Some(include_str!("../../i18n/en.json")),
        "pt" => Some(include_str!("../../i18n/pt.json")),
        _ => None,
    }
}

fn parse_catalog(locale: &str) -> BTreeMap<String, String> {
    embedded_catalog(locale)
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}

fn en_messages() -> &'static BTreeMap<String, String> {
    EN_MESSAGES.get_or_init(|| parse_catalog("en"))
}

fn en_value_to_key() -> &'static BTreeMap<String, String> {
    EN_VALUE_TO_KEY.get_or_init(|| {
        en_messages()
            .iter()
            .map(|(k, v)| (v.clone(), k.clone()))
            .collect()
    })
}

fn detect_env_locale() -> Option<String> {
    for key in ["LC_ALL", "LC_MESSAGES", "LANG"] {
        if let Ok(val) = env::var(key) {
            let trimmed = val.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn normalize_locale(raw: &str) -> Option<String> {
    let mut cleaned = raw.trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Some((head, _)) = cleaned.split_once('.') {
        cleaned = head;
    }
    if let Some((head, _)) = cleaned.split_once('@') {
        cleaned = head;
    }
    let cleaned = cleaned.replace('_', "-");
    cleaned
        .parse::<LanguageIdentifier>()
        .ok()
        .map(|lid| lid.to_string())
}

fn resolve_supported_locale(candidate: &str) -> Option<String> {
    let norm = normalize_locale(candidate)?;
    if SUPPORTED_LOCALES.contains(&norm.as_str()) {
        return Some(norm);
    }
    let base = norm.split('-').next()?.to_ascii_lowercase();
    SUPPORTED_LOCALES
        .contains(&base.as_str())
        .then_some(base)
}

/// Flag, then environment, then the OS setting; English when nothing matches.
fn select_locale(preferred: Option<&str>) -> String {
    if let Some(found) = preferred.and_then(resolve_supported_locale) {
        return found;
    }
    if let Some(found) = detect_env_locale().as_deref().and_then(resolve_supported_locale) {
        return found;
    }
    if let Some(found) = sys_locale::get_locale()
        .as_deref()
        .and_then(resolve_supported_locale)
    {
        return found;
    }
    "en".to_string()
}

fn load_locale_messages(locale: &str) -> BTreeMap<String, String> {
    let mut merged = en_messages().clone();
    if locale != "en" {
        merged.extend(parse_catalog(locale));
    }
    merged
}

pub fn init(preferred: Option<&str>) {
    let locale = select_locale(preferred);
    let _ = LOCALE_MESSAGES.set(load_locale_messages(&locale));
    let _ = SELECTED_LOCALE.set(locale);
}

/// Value of `flag` from raw argv, before clap has parsed anything.
pub fn flag_from_argv(args: &[OsString], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let raw = arg.to_string_lossy();
        if raw == flag {
            return iter.next().map(|value| value.to_string_lossy().to_string());
        }
        if let Some(rest) = raw.strip_prefix(&prefix) {
            return Some(rest.to_string());
        }
    }
    None
}

pub fn selected_locale() -> &'static str {
    SELECTED_LOCALE.get().map(String::as_str).unwrap_or("en")
}

pub fn tr(key: &str) -> String {
    LOCALE_MESSAGES
        .get()
        .and_then(|m| m.get(key))
        .cloned()
        .or_else(|| en_messages().get(key).cloned())
        .unwrap_or_else(|| key.to_string())
}

/// `tr` with `{name}` placeholders filled in.
pub fn trf(key: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(tr(key), |message, (name, value)| {
        message.replace(&format!("{{{name}}}"), value)
    })
}

pub fn tr_lit(english_literal: &str) -> String {
    let Some(key) = en_value_to_key().get(english_literal) else {
        return english_literal.to_string();
    };
    tr(key)
}
