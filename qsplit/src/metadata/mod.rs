//! Column metadata extraction from the three Qualtrics header rows.
//!
//! ```text
//! row 0   Q1                    Q2                    <- qualtrics label
//! row 1   What is your name?    What is your age?     <- display text
//! row 2   {"ImportId":"QID1"}   {"ImportId":"QID2"}   <- stable key
//! ```
//!
//! The table is index-aligned with the grid: entry `c` describes column `c`
//! of every data row. It is never sorted or filtered.

use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::error::{MetadataError, MetadataResult};
use crate::models::{ColumnMetadata, KeyCollision};
use crate::parser::{Grid, HEADER_ROWS};

/// Extract the `ImportId` from one row 2 cell.
///
/// The cell must be a JSON object with a non-empty string `ImportId`. Other
/// fields (e.g. `timeZone`) are ignored.
pub fn parse_import_id(column: usize, raw: &str) -> MetadataResult<String> {
    let invalid = |reason: String| MetadataError::InvalidColumnMetadata {
        column,
        raw: raw.to_string(),
        reason,
    };

    let cell: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
    let object = cell
        .as_object()
        .ok_or_else(|| invalid("expected a JSON object".to_string()))?;
    let import_id = object
        .get("ImportId")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing string field ImportId".to_string()))?;
    if import_id.is_empty() {
        return Err(invalid("ImportId is empty".to_string()));
    }
    Ok(import_id.to_string())
}

/// Per-column metadata for one export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataTable {
    columns: Vec<ColumnMetadata>,
}

impl MetadataTable {
    /// Build the table from the header rows of `grid`.
    ///
    /// Rows 1 and 2 must have as many cells as row 0, and every row 2 cell
    /// must yield an `ImportId`. The first failure aborts extraction.
    pub fn extract(grid: &Grid) -> MetadataResult<Self> {
        let expected = grid.column_count();
        for row in 1..HEADER_ROWS {
            let found = grid.header(row).len();
            if found != expected {
                return Err(MetadataError::MisalignedHeader {
                    row,
                    expected,
                    found,
                });
            }
        }

        let labels = grid.header(0);
        let texts = grid.header(1);
        let import_ids = grid.header(2);

        let columns = (0..expected)
            .map(|c| -> MetadataResult<ColumnMetadata> {
                Ok(ColumnMetadata {
                    index: c,
                    qualtrics_label: labels[c].clone(),
                    display_text: texts[c].clone(),
                    stable_key: parse_import_id(c, &import_ids[c])?,
                })
            })
            .collect::<MetadataResult<Vec<_>>>()?;

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of keys a record set built from this table will hold.
    pub fn distinct_keys(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.stable_key.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Keys shared by several columns, in order of first appearance.
    pub fn collisions(&self) -> Vec<KeyCollision> {
        let mut by_key: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut order = Vec::new();
        for column in &self.columns {
            let indices = by_key.entry(column.stable_key.as_str()).or_default();
            if indices.is_empty() {
                order.push(column.stable_key.as_str());
            }
            indices.push(column.index);
        }

        order
            .into_iter()
            .filter_map(|key| {
                let columns = by_key.remove(key)?;
                (columns.len() > 1).then(|| KeyCollision {
                    key: key.to_string(),
                    columns,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn survey() -> Grid {
        grid(&[
            &["Q1", "Q2"],
            &["What is your name?", "What is your age?"],
            &[r#"{"ImportId":"name"}"#, r#"{"ImportId":"age"}"#],
            &["Alice", "30"],
        ])
    }

    #[test]
    fn test_extract_fields_per_column() {
        let table = MetadataTable::extract(&survey()).unwrap();

        assert_eq!(table.len(), 2);
        let second = &table.columns()[1];
        assert_eq!(second.index, 1);
        assert_eq!(second.qualtrics_label, "Q2");
        assert_eq!(second.display_text, "What is your age?");
        assert_eq!(second.stable_key, "age");
    }

    #[test]
    fn test_extract_is_deterministic() {
        let g = survey();
        assert_eq!(
            MetadataTable::extract(&g).unwrap(),
            MetadataTable::extract(&g).unwrap()
        );
    }

    #[test]
    fn test_extra_import_fields_ignored() {
        let key = parse_import_id(0, r#"{"ImportId":"startDate","timeZone":"America/Denver"}"#)
            .unwrap();
        assert_eq!(key, "startDate");
    }

    #[test]
    fn test_invalid_import_cells() {
        for raw in [
            "not-json",
            r#"{"importid":"lowercase"}"#,
            r#"{"ImportId":""}"#,
            r#"{"ImportId":42}"#,
            r#"["QID1"]"#,
            r#""QID1""#,
            "null",
            "",
        ] {
            let err = parse_import_id(3, raw).unwrap_err();
            match err {
                MetadataError::InvalidColumnMetadata { column, raw: got, .. } => {
                    assert_eq!(column, 3);
                    assert_eq!(got, raw);
                }
                other => panic!("unexpected error for {raw:?}: {other}"),
            }
        }
    }

    #[test]
    fn test_invalid_cell_reports_its_column() {
        let g = grid(&[
            &["Q1", "Q2"],
            &["a", "b"],
            &[r#"{"ImportId":"ok"}"#, "not-json"],
        ]);
        let err = MetadataTable::extract(&g).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::InvalidColumnMetadata { column: 1, .. }
        ));
    }

    #[test]
    fn test_misaligned_header_rejected() {
        let g = grid(&[
            &["Q1", "Q2"],
            &["only one"],
            &[r#"{"ImportId":"a"}"#, r#"{"ImportId":"b"}"#],
        ]);
        let err = MetadataTable::extract(&g).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::MisalignedHeader {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_collisions_reported_in_column_order() {
        let g = grid(&[
            &["Q1", "Q2", "Q3", "Q4", "Q5"],
            &["a", "b", "c", "d", "e"],
            &[
                r#"{"ImportId":"x"}"#,
                r#"{"ImportId":"y"}"#,
                r#"{"ImportId":"x"}"#,
                r#"{"ImportId":"z"}"#,
                r#"{"ImportId":"y"}"#,
            ],
        ]);
        let table = MetadataTable::extract(&g).unwrap();

        assert_eq!(table.len(), 5);
        assert_eq!(table.distinct_keys(), 3);
        assert_eq!(
            table.collisions(),
            vec![
                KeyCollision {
                    key: "x".into(),
                    columns: vec![0, 2],
                },
                KeyCollision {
                    key: "y".into(),
                    columns: vec![1, 4],
                },
            ]
        );
    }

    #[test]
    fn test_no_collisions() {
        let table = MetadataTable::extract(&survey()).unwrap();
        assert!(table.collisions().is_empty());
        assert_eq!(table.distinct_keys(), 2);
    }
}
