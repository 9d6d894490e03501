//! In-memory table of stacked season rows.

use std::collections::HashMap;
use std::fmt;

/// A single parsed CSV value.
///
/// Numeric cells keep the field exactly as read, so a column that ends up
/// `TEXT` stores the original text rather than a re-formatted number.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64, String),
    Float(f64, String),
    Text(String),
}

impl Cell {
    /// Parse a raw CSV field. Empty fields are `Null`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Null;
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return Cell::Int(v, raw.to_string());
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return Cell::Float(v, raw.to_string());
        }
        Cell::Text(raw.to_string())
    }

    /// Value as an integer, for `BIGINT` columns.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v, _) => Some(*v),
            _ => None,
        }
    }

    /// Value as a float, for `DOUBLE PRECISION` columns.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v, _) => Some(*v as f64),
            Cell::Float(v, _) => Some(*v),
            _ => None,
        }
    }

    /// The field as read, for `TEXT` columns.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Int(_, raw) | Cell::Float(_, raw) | Cell::Text(raw) => Some(raw.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(_, raw) | Cell::Float(_, raw) | Cell::Text(raw) => write!(f, "{}", raw),
        }
    }
}

/// Storage type chosen for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Text,
}

impl ColumnType {
    /// PostgreSQL type name.
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
        }
    }

    /// Narrowest type holding every non-null cell.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut seen_value = false;
        let mut kind = ColumnType::BigInt;

        for cell in cells {
            match cell {
                Cell::Null => continue,
                Cell::Int(..) => {}
                Cell::Float(..) => {
                    if kind == ColumnType::BigInt {
                        kind = ColumnType::Double;
                    }
                }
                Cell::Text(_) => return ColumnType::Text,
            }
            seen_value = true;
        }

        if seen_value {
            kind
        } else {
            ColumnType::Text
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}

/// Rows from one or more season files under a shared header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl MatchTable {
    /// Empty table with the given header.
    ///
    /// Blank names become `Unnamed: <index>` and repeated names get a `.N`
    /// suffix so every column name is unique.
    pub fn with_columns(headers: Vec<String>) -> Self {
        Self {
            columns: dedupe_headers(headers),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add a row, padding with `Null` or truncating to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    /// Stack `other` below this table.
    ///
    /// Columns are matched by name. Columns new to this table are appended and
    /// back-filled with `Null`; columns `other` lacks are `Null` in its rows.
    pub fn append(&mut self, other: MatchTable) {
        let mut index: HashMap<String, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        let mut mapping = Vec::with_capacity(other.columns.len());
        for column in other.columns {
            let position = match index.get(&column) {
                Some(&i) => i,
                None => {
                    self.columns.push(column.clone());
                    let i = self.columns.len() - 1;
                    index.insert(column, i);
                    i
                }
            };
            mapping.push(position);
        }

        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, Cell::Null);
        }

        for row in other.rows {
            let mut stacked = vec![Cell::Null; width];
            for (cell, &target) in row.into_iter().zip(&mapping) {
                stacked[target] = cell;
            }
            self.rows.push(stacked);
        }
    }

    /// One storage type per column.
    pub fn infer_column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len())
            .map(|i| ColumnType::infer(self.rows.iter().map(|row| &row[i])))
            .collect()
    }
}

fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());

    for (i, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            header
        };

        let name = match seen.get(&base).copied() {
            None => base.clone(),
            Some(mut n) => loop {
                let candidate = format!("{}.{}", base, n);
                n += 1;
                if !seen.contains_key(&candidate) {
                    seen.insert(base.clone(), n);
                    break candidate;
                }
            },
        };

        seen.entry(base).or_insert(1);
        seen.insert(name.clone(), 1);
        out.push(name);
    }

    out
}
