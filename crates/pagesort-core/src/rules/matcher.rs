//! First-match-wins keyword matching.

use tracing::trace;

use super::{normalize, RuleTable};
use crate::models::{Classification, PageText, UnclassifiedReason};

/// Classify already-normalized page text against `rules`.
///
/// Rules are tried in table order and keywords in list order. The first
/// normalized keyword contained in `normalized_text` decides the outcome.
/// Matching is plain substring containment, so a short keyword also fires
/// inside longer words.
pub fn classify(normalized_text: &str, rules: &RuleTable) -> Classification {
    if normalized_text.is_empty() {
        return Classification::Unclassified(UnclassifiedReason::NoKeywordMatch);
    }

    for rule in rules.rules() {
        for (keyword, normalized) in rule.keywords.iter().zip(rule.normalized_keywords()) {
            // An empty keyword is a substring of everything.
            if normalized.is_empty() {
                continue;
            }
            if normalized_text.contains(normalized.as_str()) {
                trace!("Keyword {:?} matched doc type {}", keyword, rule.doc_type);
                return Classification::DocType(rule.doc_type.clone());
            }
        }
    }

    Classification::Unclassified(UnclassifiedReason::NoKeywordMatch)
}

/// Normalize and classify extracted page text.
///
/// Returns the normalized text alongside the outcome. Pages without text are
/// unclassified without consulting the rules.
pub fn classify_text(text: &PageText, rules: &RuleTable) -> (String, Classification) {
    match text.content() {
        Some(content) => {
            let normalized = normalize(content);
            let classification = classify(&normalized, rules);
            (normalized, classification)
        }
        None => (
            String::new(),
            Classification::Unclassified(UnclassifiedReason::NoText),
        ),
    }
}
