//! Text canonicalization shared by page text and rule keywords.

/// Characters replaced by a single space during normalization.
pub const SEPARATOR_CHARS: [char; 4] = ['\'', '-', ',', '.'];

/// Lowercase `text` and replace each of `'`, `-`, `,` and `.` with a space.
///
/// Whitespace is not collapsed, so `"A - B"` becomes `"a   b"`. Keywords must
/// pass through this same function before being compared with page text.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if SEPARATOR_CHARS.contains(&c) { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lowercases() {
        assert_eq!(normalize("INVOICE Number"), "invoice number");
    }

    #[test]
    fn test_replaces_separators() {
        assert_eq!(normalize("Bill-of-Lading"), "bill of lading");
        assert_eq!(normalize("St. John's, Inc."), "st  john s  inc ");
    }

    #[test]
    fn test_does_not_collapse_whitespace() {
        assert_eq!(normalize("a - b"), "a   b");
        assert_eq!(normalize("  tabs\tstay  "), "  tabs\tstay  ");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "INVOICE NUMBER: 12345",
            "Re-issued, Ltd.'s copy",
            "ÀÉÎ Straße - İstanbul",
            "...---,,,'''",
            "Mixed\nLines\r\nAnd\tTabs",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_other_punctuation_untouched() {
        assert_eq!(normalize("Total: $1/2 (net)"), "total: $1/2 (net)");
    }
}
