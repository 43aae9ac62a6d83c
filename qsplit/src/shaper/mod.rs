//! Record shaper: one keyed [`RecordSet`] per answer row.
//!
//! ```text
//! metadata   [Q1|name|"Name?"]   [Q2|age|"Age?"]
//! row 3      Alice               30
//!                   ↓
//! { "name": {text: "Name?", qualticsID: "Q1", answer: "Alice"},
//!   "age":  {text: "Age?",  qualticsID: "Q2", answer: "30"} }
//! ```

use crate::error::{ShapeError, ShapeResult};
use crate::metadata::MetadataTable;
use crate::models::{Record, RecordSet};
use crate::parser::{Grid, HEADER_ROWS};

/// A shaped answer row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedRow {
    /// Zero-based position among the answer rows; names the artifact.
    pub offset: usize,
    /// Index of the row in the grid.
    pub row: usize,
    pub records: RecordSet,
    /// Entries replaced because an earlier column had the same key.
    pub overwritten: usize,
}

/// Build the record set for a single answer row.
pub fn shape_row(
    table: &MetadataTable,
    row: usize,
    cells: &[String],
) -> ShapeResult<(RecordSet, usize)> {
    if cells.len() != table.len() {
        return Err(ShapeError::RowColumnMismatch {
            row,
            expected: table.len(),
            found: cells.len(),
        });
    }

    let mut records = RecordSet::new();
    let mut overwritten = 0;
    for (column, answer) in table.columns().iter().zip(cells) {
        if records
            .insert(column.stable_key.clone(), Record::new(column, answer.as_str()))
            .is_some()
        {
            overwritten += 1;
        }
    }

    Ok((records, overwritten))
}

/// Fail on the first answer row whose width differs from the table.
pub fn check_alignment(grid: &Grid, table: &MetadataTable) -> ShapeResult<()> {
    match grid.data_rows().find(|(_, cells)| cells.len() != table.len()) {
        Some((row, cells)) => Err(ShapeError::RowColumnMismatch {
            row,
            expected: table.len(),
            found: cells.len(),
        }),
        None => Ok(()),
    }
}

/// Lazily shapes the answer rows of a grid, in order.
///
/// Restart by creating a new shaper over the same grid.
pub struct RecordShaper<'a> {
    grid: &'a Grid,
    table: &'a MetadataTable,
    next_offset: usize,
}

impl<'a> RecordShaper<'a> {
    pub fn new(grid: &'a Grid, table: &'a MetadataTable) -> Self {
        Self {
            grid,
            table,
            next_offset: 0,
        }
    }
}

impl Iterator for RecordShaper<'_> {
    type Item = ShapeResult<ShapedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.next_offset;
        let row = HEADER_ROWS + offset;
        let cells = self.grid.rows().get(row)?;
        self.next_offset += 1;

        Some(
            shape_row(self.table, row, cells).map(|(records, overwritten)| ShapedRow {
                offset,
                row,
                records,
                overwritten,
            }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.data_row_count().saturating_sub(self.next_offset);
        (remaining, Some(remaining))
    }
}
