//! Raw records as ingested from the source spreadsheet.

use super::field::{Field, SOURCE_FIELD_COUNT};

/// A row of the source with its fifteen positional cells.
///
/// Cells are kept as free text. Empty or whitespace-only cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// 1-based data row number in the source (header excluded)
    pub row: usize,
    cells: [Option<String>; SOURCE_FIELD_COUNT],
}

impl RawRecord {
    /// Create an empty record for the given source row.
    pub fn new(row: usize) -> Self {
        Self {
            row,
            cells: Default::default(),
        }
    }

    /// Build a record from positional cells. Cells past the fifteenth are
    /// ignored; missing trailing cells stay empty.
    pub fn from_cells<I, S>(row: usize, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut record = Self::new(row);
        for (slot, cell) in record.cells.iter_mut().zip(cells) {
            *slot = non_blank(cell.as_ref());
        }
        record
    }

    /// Cell text for a source field.
    pub fn get(&self, field: Field) -> Option<&str> {
        field
            .source_index()
            .and_then(|i| self.cells[i].as_deref())
    }

    /// Set a cell. Derived fields are not part of the raw record and are ignored.
    pub fn set(&mut self, field: Field, value: Option<&str>) {
        if let Some(i) = field.source_index() {
            self.cells[i] = value.and_then(non_blank);
        }
    }

    /// Builder-style [`RawRecord::set`].
    pub fn with(mut self, field: Field, value: &str) -> Self {
        self.set(field, Some(value));
        self
    }

    /// All cells in positional order.
    pub fn cells(&self) -> impl Iterator<Item = Option<&str>> {
        self.cells.iter().map(|c| c.as_deref())
    }
}

/// The loaded source: headers as read and the positional records.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Header row exactly as found in the source
    pub headers: Vec<String>,
    /// Records in source order
    pub records: Vec<RawRecord>,
}

impl RawTable {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of columns in the source header.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

fn non_blank(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
