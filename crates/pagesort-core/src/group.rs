//! Grouping classified pages by document type.

use serde::{Deserialize, Serialize};

use crate::models::{Classification, PageRecord};

/// Pages assigned to one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocGroup {
    /// Document type name.
    pub doc_type: String,
    /// Zero-based page indices in ascending order.
    pub pages: Vec<usize>,
}

/// Partition of a document's pages by classification outcome.
///
/// Every page index appears exactly once, either in one group or in
/// `unclassified`. Groups are ordered by the first page that hit them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingResult {
    /// Groups in first-occurrence order.
    pub groups: Vec<DocGroup>,
    /// Pages no rule matched, in ascending order.
    pub unclassified: Vec<usize>,
}

impl GroupingResult {
    /// Page indices for `doc_type`, if any page was classified as it.
    pub fn get(&self, doc_type: &str) -> Option<&[usize]> {
        self.groups
            .iter()
            .find(|g| g.doc_type == doc_type)
            .map(|g| g.pages.as_slice())
    }

    /// Number of pages assigned to some document type.
    pub fn classified_count(&self) -> usize {
        self.groups.iter().map(|g| g.pages.len()).sum()
    }

    /// Number of pages covered by the result.
    pub fn total_pages(&self) -> usize {
        self.classified_count() + self.unclassified.len()
    }

    fn push(&mut self, index: usize, classification: &Classification) {
        match classification {
            Classification::DocType(name) => {
                match self.groups.iter_mut().find(|g| &g.doc_type == name) {
                    Some(group) => group.pages.push(index),
                    None => self.groups.push(DocGroup {
                        doc_type: name.clone(),
                        pages: vec![index],
                    }),
                }
            }
            Classification::Unclassified(_) => self.unclassified.push(index),
        }
    }
}

/// Group page records by classification in page-index order.
///
/// Records may arrive in any order; they are visited by ascending index so
/// each sequence in the result is ascending.
pub fn group(records: &[PageRecord]) -> GroupingResult {
    let mut ordered: Vec<&PageRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.index);

    let mut result = GroupingResult::default();
    for record in ordered {
        result.push(record.index, &record.classification);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageText, UnclassifiedReason};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn record(index: usize, doc_type: Option<&str>) -> PageRecord {
        PageRecord {
            index,
            raw_text: PageText::Native(String::new()),
            normalized_text: String::new(),
            classification: match doc_type {
                Some(name) => Classification::DocType(name.to_string()),
                None => Classification::Unclassified(UnclassifiedReason::NoKeywordMatch),
            },
        }
    }

    #[test]
    fn test_order_preserved() {
        let records = vec![
            record(0, Some("Invoice")),
            record(1, None),
            record(2, Some("Invoice")),
            record(3, None),
        ];
        let result = group(&records);
        assert_eq!(result.get("Invoice"), Some(&[0, 2][..]));
        assert_eq!(result.unclassified, vec![1, 3]);
    }

    #[test]
    fn test_groups_in_first_occurrence_order() {
        let records = vec![
            record(0, Some("Receipt")),
            record(1, Some("Invoice")),
            record(2, Some("Receipt")),
            record(3, Some("Contract")),
        ];
        let result = group(&records);
        let names: Vec<_> = result.groups.iter().map(|g| g.doc_type.as_str()).collect();
        assert_eq!(names, ["Receipt", "Invoice", "Contract"]);
        assert_eq!(result.get("Receipt"), Some(&[0, 2][..]));
        assert_eq!(result.get("Missing"), None);
    }

    #[test]
    fn test_out_of_order_records_sorted() {
        let records = vec![record(2, Some("A")), record(0, Some("B")), record(1, Some("A"))];
        let result = group(&records);
        assert_eq!(result.groups[0].doc_type, "B");
        assert_eq!(result.get("A"), Some(&[1, 2][..]));
    }

    #[test]
    fn test_partition() {
        let types = [Some("A"), None, Some("B"), Some("C"), None, Some("A"), Some("B")];
        let records: Vec<_> = (0..50).map(|i| record(i, types[i % types.len()])).collect();

        let result = group(&records);
        assert_eq!(result.total_pages(), records.len());

        let mut seen = HashSet::new();
        for index in result
            .groups
            .iter()
            .flat_map(|g| g.pages.iter())
            .chain(result.unclassified.iter())
        {
            assert!(seen.insert(*index), "page {} appears twice", index);
        }
        assert_eq!(seen.len(), records.len());
    }

    #[test]
    fn test_empty_input() {
        let result = group(&[]);
        assert!(result.groups.is_empty());
        assert!(result.unclassified.is_empty());
        assert_eq!(result.total_pages(), 0);
    }
}
