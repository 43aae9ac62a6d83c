//! Domain models shared across the conversion pipeline.
//!
//! - [`ColumnMetadata`] - what the three header rows say about one column
//! - [`Record`] - one respondent's answer to one column, with its labels
//! - [`RecordSet`] - one respondent's answers keyed by `ImportId`
//! - [`KeyCollision`] - columns sharing an `ImportId`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Column Metadata
// =============================================================================

/// Metadata for a single export column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    /// Position in the grid.
    pub index: usize,
    /// Row 0 label (`Q1`, `Q3_TEXT`, `StartDate`, ...).
    pub qualtrics_label: String,
    /// Row 1 question text.
    pub display_text: String,
    /// `ImportId` parsed out of the row 2 JSON cell.
    pub stable_key: String,
}

/// Columns that share one `ImportId`. The last index wins in every record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCollision {
    pub key: String,
    pub columns: Vec<usize>,
}

// =============================================================================
// Records
// =============================================================================

/// One answer with the labels of the column it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub text: String,
    #[serde(rename = "qualticsID")]
    pub qualtrics_id: String,
    pub answer: String,
}

impl Record {
    pub fn new(column: &ColumnMetadata, answer: impl Into<String>) -> Self {
        Self {
            text: column.display_text.clone(),
            qualtrics_id: column.qualtrics_label.clone(),
            answer: answer.into(),
        }
    }
}

/// All answers of one respondent, keyed by `ImportId`.
///
/// Serializes as a plain JSON object. Keys come out sorted; readers must not
/// rely on that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet(BTreeMap<String, Record>);

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under `key`, returning the record it replaced, if any.
    pub fn insert(&mut self, key: impl Into<String>, record: Record) -> Option<Record> {
        self.0.insert(key.into(), record)
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn column(index: usize, label: &str, text: &str, key: &str) -> ColumnMetadata {
        ColumnMetadata {
            index,
            qualtrics_label: label.into(),
            display_text: text.into(),
            stable_key: key.into(),
        }
    }

    #[test]
    fn test_record_serialization_field_names() {
        let record = Record::new(&column(0, "Q1", "What is your name?", "name"), "Alice");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"text": "What is your name?", "qualticsID": "Q1", "answer": "Alice"})
        );
    }

    #[test]
    fn test_record_set_json_roundtrip() {
        let mut set = RecordSet::new();
        set.insert("age", Record::new(&column(1, "Q2", "Age?", "age"), "30"));
        set.insert("name", Record::new(&column(0, "Q1", "Name?", "name"), "Alice"));

        let parsed = RecordSet::from_json(&set.to_json().unwrap()).unwrap();
        assert_eq!(parsed, set);
        assert_eq!(parsed.get("age").unwrap().answer, "30");
    }

    #[test]
    fn test_insert_reports_overwrite() {
        let mut set = RecordSet::new();
        assert!(set
            .insert("k", Record::new(&column(0, "Q1", "a", "k"), "1"))
            .is_none());
        let old = set.insert("k", Record::new(&column(1, "Q2", "b", "k"), "2"));
        assert_eq!(old.unwrap().answer, "1");
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("k").unwrap().qualtrics_id, "Q2");
    }
}
