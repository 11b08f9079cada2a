//! Keyword rule table and first-match classification.
//!
//! A [`RuleTable`] is an ordered list of document types, each with trigger
//! keywords. Order is part of the contract: when several rules could match a
//! page, the earliest one wins.

mod loader;
mod matcher;
mod normalize;

pub use matcher::{classify, classify_text};
pub use normalize::{normalize, SEPARATOR_CHARS};

use std::collections::HashSet;

use serde::Serialize;

use crate::error::ConfigError;

/// One document type and the keywords that trigger it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocTypeRule {
    /// Name of the document type; also names its output file.
    pub doc_type: String,
    /// Keywords as authored, in priority order.
    pub keywords: Vec<String>,
    /// Keywords after normalization, parallel to `keywords`.
    #[serde(skip)]
    normalized: Vec<String>,
}

impl DocTypeRule {
    /// Create a rule, normalizing its keywords.
    pub fn new(doc_type: impl Into<String>, keywords: Vec<String>) -> Self {
        let normalized = keywords.iter().map(|k| normalize(k)).collect();
        Self {
            doc_type: doc_type.into(),
            keywords,
            normalized,
        }
    }

    /// Normalized keywords in the same order as [`DocTypeRule::keywords`].
    pub fn normalized_keywords(&self) -> &[String] {
        &self.normalized
    }
}

/// Ordered, immutable set of classification rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleTable {
    rules: Vec<DocTypeRule>,
}

impl RuleTable {
    /// Build a table from rules in priority order.
    ///
    /// Fails when `rules` is empty or two rules share a doc type name.
    pub fn new(rules: Vec<DocTypeRule>) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Err(ConfigError::MissingDocTypes);
        }

        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.doc_type.as_str()) {
                return Err(ConfigError::DuplicateDocType(rule.doc_type.clone()));
            }
        }

        Ok(Self { rules })
    }

    /// Build a table from `(doc_type, keywords)` pairs in priority order.
    pub fn from_pairs<I, S, K>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, Vec<K>)>,
        S: Into<String>,
        K: Into<String>,
    {
        let rules = pairs
            .into_iter()
            .map(|(doc_type, keywords)| {
                DocTypeRule::new(doc_type, keywords.into_iter().map(Into::into).collect())
            })
            .collect();
        Self::new(rules)
    }

    /// Rules in priority order.
    pub fn rules(&self) -> &[DocTypeRule] {
        &self.rules
    }

    /// Doc type names in priority order.
    pub fn doc_types(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.doc_type.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
