//! Tabular dataset handed to assumption checkers
//!
//! Named columns of loosely typed cells. The decision logic never looks at a
//! dataset; checkers select columns by caller-supplied name and compute
//! counts from them.

use crate::error::DatasetError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A single value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    fn from_json(value: &Value) -> Option<Cell> {
        match value {
            Value::Null => Some(Cell::Missing),
            Value::Number(n) => n.as_f64().map(Cell::Number),
            Value::String(s) if s.trim().is_empty() => Some(Cell::Missing),
            Value::String(s) => Some(Cell::Text(s.clone())),
            Value::Bool(b) => Some(Cell::Text(b.to_string())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Category label used when counting levels
    pub fn label(&self) -> Option<String> {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Text(s) => Some(s.clone()),
            Cell::Missing => None,
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Column {
            name: name.into(),
            cells,
        }
    }

    /// Column of numbers
    pub fn numbers(name: impl Into<String>, values: &[f64]) -> Self {
        Self::new(name, values.iter().map(|v| Cell::Number(*v)).collect())
    }

    /// Column of text labels
    pub fn labels(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(name, values.iter().map(|v| Cell::Text(v.to_string())).collect())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn non_missing(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_missing()).count()
    }

    /// At least one number and no text
    pub fn is_numeric(&self) -> bool {
        let mut any_number = false;
        for cell in &self.cells {
            match cell {
                Cell::Number(_) => any_number = true,
                Cell::Text(_) => return false,
                Cell::Missing => {}
            }
        }
        any_number
    }

    /// Non-missing numeric values, in row order
    pub fn numeric_values(&self) -> Vec<f64> {
        self.cells.iter().filter_map(Cell::as_f64).collect()
    }

    /// Count of each distinct non-missing label
    pub fn level_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in self.cells.iter().filter_map(Cell::label) {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    pub fn distinct(&self) -> usize {
        self.level_counts().len()
    }
}

/// Ordered collection of equal-length columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// Build from columns, rejecting duplicates and ragged lengths
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let expected = columns.first().map(Column::len).unwrap_or(0);
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(DatasetError::DuplicateColumn(column.name.clone()));
            }
            if column.len() != expected {
                return Err(DatasetError::RaggedColumn {
                    name: column.name.clone(),
                    expected,
                    actual: column.len(),
                });
            }
        }
        Ok(Dataset { columns })
    }

    /// Build from row objects
    ///
    /// Columns appear in first-seen order. A key absent from a row is a
    /// missing cell.
    pub fn from_records(records: &[Value]) -> Result<Self, DatasetError> {
        let mut names: Vec<String> = Vec::new();
        for (row, record) in records.iter().enumerate() {
            let object = record
                .as_object()
                .ok_or(DatasetError::RowNotObject { row })?;
            for key in object.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let mut columns: Vec<Column> = names
            .iter()
            .map(|name| Column::new(name.clone(), Vec::with_capacity(records.len())))
            .collect();

        for (row, record) in records.iter().enumerate() {
            let object = record
                .as_object()
                .ok_or(DatasetError::RowNotObject { row })?;
            for column in &mut columns {
                let cell = match object.get(&column.name) {
                    Some(value) => Cell::from_json(value).ok_or_else(|| {
                        DatasetError::UnsupportedCell {
                            row,
                            column: column.name.clone(),
                        }
                    })?,
                    None => Cell::Missing,
                };
                column.cells.push(cell);
            }
        }

        Ok(Dataset { columns })
    }

    /// Parse a JSON array of row objects
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<Value> =
            serde_json::from_str(json).context("dataset must be a JSON array of row objects")?;
        Ok(Self::from_records(&records)?)
    }

    /// Load a JSON dataset file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse dataset: {}", path.display()))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

/// Cross-tabulation of two categorical columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    /// counts[r][c]
    pub counts: Vec<Vec<usize>>,
}

impl ContingencyTable {
    /// Tabulate rows where both cells are present
    pub fn from_columns(row_column: &Column, col_column: &Column) -> Self {
        let pairs: Vec<(String, String)> = row_column
            .cells
            .iter()
            .zip(&col_column.cells)
            .filter_map(|(r, c)| Some((r.label()?, c.label()?)))
            .collect();

        let rows: Vec<String> = sorted_distinct(pairs.iter().map(|(r, _)| r));
        let cols: Vec<String> = sorted_distinct(pairs.iter().map(|(_, c)| c));

        let mut counts = vec![vec![0usize; cols.len()]; rows.len()];
        for (r, c) in &pairs {
            if let (Ok(ri), Ok(ci)) = (rows.binary_search(r), cols.binary_search(c)) {
                counts[ri][ci] += 1;
            }
        }

        ContingencyTable { rows, cols, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn row_totals(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<usize> {
        (0..self.cols.len())
            .map(|c| self.counts.iter().map(|row| row[c]).sum())
            .collect()
    }

    /// Expected counts under independence
    pub fn expected(&self) -> Vec<Vec<f64>> {
        let total = self.total() as f64;
        let col_totals = self.col_totals();
        self.row_totals()
            .iter()
            .map(|rt| {
                col_totals
                    .iter()
                    .map(|ct| {
                        if total == 0.0 {
                            0.0
                        } else {
                            (*rt as f64) * (*ct as f64) / total
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Smallest expected count, or None for an empty table
    pub fn min_expected(&self) -> Option<f64> {
        self.expected()
            .into_iter()
            .flatten()
            .min_by(|a, b| a.total_cmp(b))
    }
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = values.cloned().collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_records_fills_missing_keys() {
        let records = vec![
            json!({"group": "a", "score": 1.5}),
            json!({"group": "b"}),
            json!({"score": 3, "note": ""}),
        ];
        let dataset = Dataset::from_records(&records).unwrap();
        assert_eq!(dataset.column_names(), vec!["group", "score", "note"]);
        assert_eq!(dataset.row_count(), 3);

        let score = dataset.column("score").unwrap();
        assert_eq!(
            score.cells,
            vec![Cell::Number(1.5), Cell::Missing, Cell::Number(3.0)]
        );
        assert!(score.is_numeric());
        assert_eq!(dataset.column("note").unwrap().non_missing(), 0);
    }

    #[test]
    fn test_from_records_rejects_nested_values() {
        let records = vec![json!({"a": [1, 2]})];
        assert_eq!(
            Dataset::from_records(&records),
            Err(DatasetError::UnsupportedCell {
                row: 0,
                column: "a".to_string()
            })
        );
        assert_eq!(
            Dataset::from_records(&[json!(5)]),
            Err(DatasetError::RowNotObject { row: 0 })
        );
    }

    #[test]
    fn test_from_columns_validates_shape() {
        let ragged = Dataset::from_columns(vec![
            Column::numbers("x", &[1.0, 2.0]),
            Column::numbers("y", &[1.0]),
        ]);
        assert!(matches!(ragged, Err(DatasetError::RaggedColumn { .. })));

        let duplicate = Dataset::from_columns(vec![
            Column::numbers("x", &[1.0]),
            Column::numbers("x", &[2.0]),
        ]);
        assert_eq!(duplicate, Err(DatasetError::DuplicateColumn("x".to_string())));
    }

    #[test]
    fn test_level_counts_normalize_integral_numbers() {
        let column = Column::new(
            "dose",
            vec![
                Cell::Number(1.0),
                Cell::Number(1.0),
                Cell::Number(2.5),
                Cell::Missing,
            ],
        );
        let counts = column.level_counts();
        assert_eq!(counts.get("1"), Some(&2));
        assert_eq!(counts.get("2.5"), Some(&1));
        assert_eq!(column.distinct(), 2);
    }

    #[test]
    fn test_contingency_expected_counts() {
        let smoker = Column::labels("smoker", &["y", "y", "n", "n", "n", "n"]);
        let outcome = Column::labels("outcome", &["ill", "ok", "ok", "ok", "ill", "ok"]);
        let table = ContingencyTable::from_columns(&smoker, &outcome);

        assert_eq!(table.rows, vec!["n", "y"]);
        assert_eq!(table.cols, vec!["ill", "ok"]);
        assert_eq!(table.counts, vec![vec![1, 3], vec![1, 1]]);
        assert_eq!(table.total(), 6);
        // row y (2) * col ill (2) / 6
        let min = table.min_expected().unwrap();
        assert!((min - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_str_errors_carry_context() {
        let err = Dataset::from_json_str("{\"not\": \"rows\"}").unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }
}
