//! Result set models.
//!
//! Every cell is rendered to text at execution time; no native numeric or
//! temporal types survive past the executor.

use serde::Serialize;

/// One row, as ordered `(column, value)` pairs. `None` is SQL NULL.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResultRow {
    cells: Vec<(String, Option<String>)>,
}

impl ResultRow {
    pub fn new(cells: Vec<(String, Option<String>)>) -> Self {
        Self { cells }
    }

    /// Build a row from column names and values of the same length.
    pub fn from_parts(columns: &[String], values: Vec<Option<String>>) -> Self {
        Self {
            cells: columns.iter().cloned().zip(values).collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// All rows produced by one execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<ResultRow>) -> Self {
        Self { columns, rows }
    }

    /// Result of a statement with no result-set shape.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
