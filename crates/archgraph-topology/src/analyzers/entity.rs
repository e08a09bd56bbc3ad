// ABOUTME: Best-effort business-entity labels extracted from module descriptions
// ABOUTME: Unclassified modules fall into the explicit `_generic` bucket

use archgraph_core::Module;
use once_cell::sync::Lazy;
use regex::Regex;

pub const GENERIC_ENTITY: &str = "_generic";

static ACTION_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(manages?|handles?|displays?|renders?|creates?|stores?|fetch(?:es)?|lists?|updates?|deletes?|process(?:es)?|validates?|tracks?|shows?|edits?|loads?|saves?|persists?|for|of)\b",
    )
    .expect("valid entity verb pattern")
});

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9]*").expect("valid word pattern"));

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "all", "any", "each", "every", "some", "this", "that", "these", "those",
    "its", "their", "new", "existing", "incoming", "outgoing", "various", "multiple", "single",
    "internal", "external", "data", "info", "information", "request", "requests", "response",
    "responses", "api", "apis", "http", "rest", "utility", "utilities", "helper", "helpers",
    "function", "functions", "logic", "state", "ui", "component", "components", "service",
    "services", "module", "modules", "code", "shared", "common", "core", "and", "or", "to",
    "from", "with", "in", "on", "by", "it", "them", "related", "business", "application", "app",
];

/// Scan at most this many words after a verb for the entity noun.
const LOOKAHEAD_WORDS: usize = 3;

/// Singular, capitalised entity noun for a description, or `None` when nothing
/// recognisable is present.
pub fn entity_label(description: Option<&str>) -> Option<String> {
    let text = description?.trim();
    if text.is_empty() {
        return None;
    }

    for verb in ACTION_VERB.find_iter(text) {
        let tail = &text[verb.end()..];
        let candidate = WORD
            .find_iter(tail)
            .take(LOOKAHEAD_WORDS)
            .map(|w| w.as_str())
            .find(|w| !is_stopword(w));
        if let Some(word) = candidate {
            return Some(normalize_noun(word));
        }
    }

    // PascalCase identifiers after the first word usually name a domain type
    WORD.find_iter(text)
        .skip(1)
        .map(|w| w.as_str())
        .find(|w| {
            w.chars().next().is_some_and(|c| c.is_ascii_uppercase())
                && w.chars().skip(1).any(|c| c.is_ascii_lowercase())
                && !is_stopword(w)
        })
        .map(normalize_noun)
}

/// Entity label for a module, falling back to [`GENERIC_ENTITY`].
pub fn module_entity(module: Option<&Module>) -> String {
    module
        .and_then(|m| entity_label(m.description.as_deref()))
        .unwrap_or_else(|| GENERIC_ENTITY.to_string())
}

pub fn is_generic(entity: &str) -> bool {
    entity == GENERIC_ENTITY
}

fn is_stopword(word: &str) -> bool {
    word.len() < 3 && !word.chars().all(|c| c.is_ascii_uppercase())
        || STOPWORDS.contains(&word.to_ascii_lowercase().as_str())
}

fn normalize_noun(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let singular = if lower.ends_with("ies") {
        format!("{}y", &word[..word.len() - 3])
    } else if lower.ends_with("sses") {
        word[..word.len() - 2].to_string()
    } else if lower.ends_with('s')
        && !lower.ends_with("ss")
        && !lower.ends_with("us")
        && !lower.ends_with("is")
        && lower.len() > 3
    {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    };
    super::naming::capitalize(&singular)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_lead_to_the_entity_noun() {
        assert_eq!(
            entity_label(Some("Handles order checkout requests")),
            Some("Order".to_string())
        );
        assert_eq!(
            entity_label(Some("Stores all incoming invoices")),
            Some("Invoice".to_string())
        );
        assert_eq!(
            entity_label(Some("Lists product categories")),
            Some("Product".to_string())
        );
    }

    #[test]
    fn plural_forms_are_singularised() {
        assert_eq!(
            entity_label(Some("Manages categories")),
            Some("Category".to_string())
        );
        assert_eq!(
            entity_label(Some("Validates addresses")),
            Some("Address".to_string())
        );
        assert_eq!(entity_label(Some("Tracks status")), Some("Status".to_string()));
    }

    #[test]
    fn pascal_case_type_is_a_fallback() {
        assert_eq!(
            entity_label(Some("Thin wrapper around the VehicleRegistry")),
            Some("VehicleRegistry".to_string())
        );
    }

    #[test]
    fn no_signal_yields_none_and_generic_bucket() {
        assert_eq!(entity_label(None), None);
        assert_eq!(entity_label(Some("   ")), None);
        assert_eq!(entity_label(Some("shared helpers and utilities")), None);
        assert_eq!(module_entity(None), GENERIC_ENTITY);
        assert_eq!(
            module_entity(Some(&Module::new(1, "app.misc"))),
            GENERIC_ENTITY
        );
    }
}
