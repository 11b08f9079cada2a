//! Per-page records produced by the classification pass.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker written wherever a page's text is shown but none could be obtained.
pub const EMPTY_PAGE_MARKER: &str = "[EMPTY]";

/// Text obtained for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "text", rename_all = "snake_case")]
pub enum PageText {
    /// Text from the page's embedded text layer.
    Native(String),
    /// Text recognized from a rendered image of the page.
    Ocr(String),
    /// Neither native extraction nor OCR produced anything.
    NoText,
}

impl PageText {
    /// Text for display, with [`EMPTY_PAGE_MARKER`] standing in for no text.
    pub fn as_str(&self) -> &str {
        match self {
            PageText::Native(text) | PageText::Ocr(text) => text,
            PageText::NoText => EMPTY_PAGE_MARKER,
        }
    }

    /// Text eligible for classification, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            PageText::Native(text) | PageText::Ocr(text) => Some(text),
            PageText::NoText => None,
        }
    }

    /// Whether the text came from OCR.
    pub fn is_ocr(&self) -> bool {
        matches!(self, PageText::Ocr(_))
    }

    /// Short label for where the text came from.
    pub fn source_name(&self) -> &'static str {
        match self {
            PageText::Native(_) => "native",
            PageText::Ocr(_) => "ocr",
            PageText::NoText => "none",
        }
    }

    /// Length in characters of the displayed text.
    pub fn char_len(&self) -> usize {
        self.as_str().chars().count()
    }

    /// Single-line preview of at most `max_chars` characters.
    pub fn preview(&self, max_chars: usize) -> String {
        self.as_str()
            .chars()
            .take(max_chars)
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect()
    }
}

/// Why a page ended up unclassified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnclassifiedReason {
    /// Text was available but no keyword matched.
    NoKeywordMatch,
    /// No text could be obtained for the page.
    NoText,
}

/// Outcome of matching a page against the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The first rule whose keyword matched.
    DocType(String),
    /// Nothing matched.
    Unclassified(UnclassifiedReason),
}

impl Classification {
    /// The matched doc type, if any.
    pub fn doc_type(&self) -> Option<&str> {
        match self {
            Classification::DocType(name) => Some(name),
            Classification::Unclassified(_) => None,
        }
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, Classification::Unclassified(_))
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::DocType(name) => write!(f, "{}", name),
            Classification::Unclassified(_) => write!(f, "Unknown"),
        }
    }
}

/// One page after classification. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Zero-based page index in the source document.
    pub index: usize,
    /// Text as extracted.
    pub raw_text: PageText,
    /// Normalized text the rules were matched against.
    pub normalized_text: String,
    /// Match outcome.
    pub classification: Classification,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_text_displays_marker() {
        assert_eq!(PageText::NoText.as_str(), "[EMPTY]");
        assert_eq!(PageText::NoText.content(), None);
    }

    #[test]
    fn test_preview_flattens_newlines() {
        let text = PageText::Native("Invoice\nNumber 12\r\nTotal".to_string());
        assert_eq!(text.preview(14), "Invoice Number");
        assert_eq!(text.preview(200), "Invoice Number 12  Total");
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        let text = PageText::Ocr("źdźbło".to_string());
        assert_eq!(text.preview(3), "źdź");
        assert_eq!(text.char_len(), 6);
    }

    #[test]
    fn test_classification_display() {
        assert_eq!(Classification::DocType("Invoice".into()).to_string(), "Invoice");
        assert_eq!(
            Classification::Unclassified(UnclassifiedReason::NoText).to_string(),
            "Unknown"
        );
    }
}
