//! In-memory tabular data passed between pipeline steps.
//!
//! A [`Frame`] is an ordered column list plus row-major cells. Cells use
//! SQLite's dynamic typing model ([`Cell`]: null, integer, real, text), so
//! frames round-trip losslessly through the staging store.

use serde::{Deserialize, Serialize};

use crate::error::{LeadScoreError, Result};

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// SQL NULL / missing value.
    Null,
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl Cell {
    /// Numeric view of the cell. Integers widen to `f64`; null and text are `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of the cell, `None` for anything else.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Stable encoding used for exact row comparison and grouping keys.
    /// Floats key on their bit pattern so `0.0` and `-0.0` stay distinct
    /// and NaN compares equal to itself.
    pub(crate) fn key(&self) -> String {
        match self {
            Cell::Null => "n".to_string(),
            Cell::Int(v) => format!("i{v}"),
            Cell::Float(v) => format!("f{}", v.to_bits()),
            Cell::Text(s) => format!("t{s}"),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// An ordered, named-column table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    /// Create an empty frame with the given column order.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append a row. The row must match the frame's arity.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(LeadScoreError::data(format!(
                "row arity {} does not match {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cell at (row, column name), if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All cells of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| LeadScoreError::data(format!("no such column: {name}")))?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Append a new column with one cell per existing row.
    pub fn add_column(&mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(LeadScoreError::data(format!("column already exists: {name}")));
        }
        if cells.len() != self.rows.len() {
            return Err(LeadScoreError::data(format!(
                "column '{name}' has {} cells for {} rows",
                cells.len(),
                self.rows.len()
            )));
        }
        self.columns.push(name);
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
        Ok(())
    }

    /// Remove a column and its cells.
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| LeadScoreError::data(format!("no such column: {name}")))?;
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        Ok(())
    }

    /// Overwrite every cell of a column.
    pub fn set_column(&mut self, name: &str, cells: Vec<Cell>) -> Result<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| LeadScoreError::data(format!("no such column: {name}")))?;
        if cells.len() != self.rows.len() {
            return Err(LeadScoreError::data(format!(
                "column '{name}' has {} cells for {} rows",
                cells.len(),
                self.rows.len()
            )));
        }
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row[idx] = cell;
        }
        Ok(())
    }

    /// Replace nulls in a column with a constant.
    pub fn fill_null(&mut self, name: &str, fill: Cell) -> Result<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| LeadScoreError::data(format!("no such column: {name}")))?;
        for row in &mut self.rows {
            if row[idx].is_null() {
                row[idx] = fill.clone();
            }
        }
        Ok(())
    }

    /// Project onto the given columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Frame> {
        let indices: Vec<usize> = names
            .iter()
            .map(|n| {
                self.column_index(n)
                    .ok_or_else(|| LeadScoreError::data(format!("no such column: {n}")))
            })
            .collect::<Result<_>>()?;

        let mut out = Frame::new(names.to_vec());
        for row in &self.rows {
            out.rows.push(indices.iter().map(|&i| row[i].clone()).collect());
        }
        Ok(out)
    }

    /// Remove exact-duplicate rows across the full row image, keeping the
    /// first occurrence.
    pub fn dedup_rows(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.rows.retain(|row| {
            let key: String = row.iter().map(|c| c.key() + "\u{1f}").collect();
            seen.insert(key)
        });
    }

    /// Grouping key over a subset of columns, by index.
    pub fn row_key(&self, row: usize, indices: &[usize]) -> String {
        indices
            .iter()
            .map(|&i| self.rows[row][i].key() + "\u{1f}")
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        let mut f = Frame::new(vec!["a".into(), "b".into()]);
        f.push_row(vec![Cell::Int(1), Cell::Text("x".into())]).unwrap();
        f.push_row(vec![Cell::Int(2), Cell::Null]).unwrap();
        f
    }

    #[test]
    fn push_row_checks_arity() {
        let mut f = Frame::new(vec!["a".into()]);
        assert!(f.push_row(vec![Cell::Int(1), Cell::Int(2)]).is_err());
    }

    #[test]
    fn add_and_drop_column() {
        let mut f = sample();
        f.add_column("c", vec![Cell::Float(1.5), Cell::Float(2.5)])
            .unwrap();
        assert_eq!(f.columns(), &["a", "b", "c"]);
        assert_eq!(f.get(1, "c"), Some(&Cell::Float(2.5)));

        f.drop_column("b").unwrap();
        assert_eq!(f.columns(), &["a", "c"]);
        assert_eq!(f.rows()[0].len(), 2);
    }

    #[test]
    fn fill_null_replaces_only_nulls() {
        let mut f = sample();
        f.fill_null("b", Cell::Text("others".into())).unwrap();
        assert_eq!(f.get(0, "b"), Some(&Cell::Text("x".into())));
        assert_eq!(f.get(1, "b"), Some(&Cell::Text("others".into())));
    }

    #[test]
    fn select_reorders_columns() {
        let f = sample();
        let g = f.select(&["b".into(), "a".into()]).unwrap();
        assert_eq!(g.columns(), &["b", "a"]);
        assert_eq!(g.get(0, "a"), Some(&Cell::Int(1)));
    }

    #[test]
    fn select_unknown_column_errors() {
        let f = sample();
        assert!(f.select(&["zzz".into()]).is_err());
    }

    #[test]
    fn dedup_removes_exact_duplicates() {
        let mut f = Frame::new(vec!["a".into()]);
        f.push_row(vec![Cell::Int(1)]).unwrap();
        f.push_row(vec![Cell::Int(1)]).unwrap();
        f.push_row(vec![Cell::Int(2)]).unwrap();
        f.dedup_rows();
        assert_eq!(f.n_rows(), 2);
    }

    #[test]
    fn dedup_distinguishes_types() {
        // Int(1) and Float(1.0) are different row images.
        let mut f = Frame::new(vec!["a".into()]);
        f.push_row(vec![Cell::Int(1)]).unwrap();
        f.push_row(vec![Cell::Float(1.0)]).unwrap();
        f.dedup_rows();
        assert_eq!(f.n_rows(), 2);
    }

    #[test]
    fn cell_numeric_views() {
        assert_eq!(Cell::Int(3).as_f64(), Some(3.0));
        assert_eq!(Cell::Float(3.5).as_f64(), Some(3.5));
        assert_eq!(Cell::Null.as_f64(), None);
        assert_eq!(Cell::Text("x".into()).as_str(), Some("x"));
    }
}
