//! Loading rule tables from YAML.
//!
//! The expected shape is:
//!
//! ```yaml
//! doc_types:
//!   Invoice:
//!     match_keywords: ["invoice number", "tax invoice"]
//!   Receipt:
//!     match_keywords: ["receipt total"]
//! ```
//!
//! Mapping order in the file is the match priority.

use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::{DocTypeRule, RuleTable};
use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    doc_types: Option<Mapping>,
}

#[derive(Debug, Deserialize)]
struct DocTypeEntry {
    match_keywords: Option<Vec<String>>,
}

impl RuleTable {
    /// Parse a rule table from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_yaml(yaml, "rules")
    }

    /// Load a rule table from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let table = Self::parse_yaml(&content, &path.display().to_string())?;
        debug!("Loaded {} doc types from {}", table.len(), path.display());
        Ok(table)
    }

    fn parse_yaml(yaml: &str, source_name: &str) -> Result<Self, ConfigError> {
        let parse_err = |reason: String| ConfigError::Parse {
            source_name: source_name.to_string(),
            reason,
        };

        if yaml.trim().is_empty() {
            return Err(ConfigError::MissingDocTypes);
        }

        let file: Option<RuleFile> =
            serde_yaml::from_str(yaml).map_err(|e| parse_err(e.to_string()))?;
        let doc_types = file
            .and_then(|f| f.doc_types)
            .ok_or(ConfigError::MissingDocTypes)?;

        let mut rules = Vec::with_capacity(doc_types.len());
        for (key, value) in doc_types {
            let doc_type = doc_type_name(&key)
                .ok_or_else(|| parse_err(format!("invalid doc type name: {:?}", key)))?;

            let entry: DocTypeEntry = match value {
                Value::Null => DocTypeEntry { match_keywords: None },
                other => serde_yaml::from_value(other)
                    .map_err(|e| parse_err(format!("doc type '{}': {}", doc_type, e)))?,
            };
            let keywords = entry
                .match_keywords
                .ok_or_else(|| ConfigError::MissingKeywords(doc_type.clone()))?;

            rules.push(DocTypeRule::new(doc_type, keywords));
        }

        RuleTable::new(rules)
    }
}

/// Doc type names may be written unquoted as numbers or booleans in YAML.
fn doc_type_name(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
