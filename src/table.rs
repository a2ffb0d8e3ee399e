//! In-memory result tables decoded from the service's CSV responses.

use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, ErrorKind, Result};

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Missing,
    Int(i64),
    Float(f64),
    Text(&'a str),
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(v) => f.write_str(v),
        }
    }
}

/// Column storage. Type is inferred from the column's non-empty cells.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    fn infer(raw: Vec<Option<String>>) -> Self {
        let present = || raw.iter().flatten();

        if present().all(|s| s.parse::<i64>().is_ok()) && present().next().is_some() {
            return ColumnData::Int(
                raw.iter()
                    .map(|c| c.as_deref().and_then(|s| s.parse().ok()))
                    .collect(),
            );
        }
        if present().all(|s| s.parse::<f64>().is_ok()) && present().next().is_some() {
            return ColumnData::Float(
                raw.iter()
                    .map(|c| c.as_deref().and_then(|s| s.parse().ok()))
                    .collect(),
            );
        }
        ColumnData::Text(raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn get(&self, row: usize) -> Option<Cell<'_>> {
        let cell = match &self.data {
            ColumnData::Int(v) => v.get(row)?.map(Cell::Int),
            ColumnData::Float(v) => v.get(row)?.map(Cell::Float),
            ColumnData::Text(v) => v.get(row)?.as_deref().map(Cell::Text),
        };
        Some(cell.unwrap_or(Cell::Missing))
    }

    /// Numeric view of the column; text cells that parse as numbers are included.
    pub fn as_f64(&self) -> Vec<Option<f64>> {
        match &self.data {
            ColumnData::Int(v) => v.iter().map(|x| x.map(|i| i as f64)).collect(),
            ColumnData::Float(v) => v.clone(),
            ColumnData::Text(v) => v
                .iter()
                .map(|x| x.as_deref().and_then(|s| s.parse().ok()))
                .collect(),
        }
    }
}

/// Column-typed result of one request. Built fresh per call and never mutated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Decodes delimited text: header row of column names, then one row per record.
    pub fn from_csv(text: &str) -> Result<Self> {
        let names: Vec<String> = csv_reader(text.as_bytes())
            .headers()?
            .iter()
            .map(str::to_string)
            .collect();
        if names.iter().all(|n| n.is_empty()) {
            return Ok(Self::default());
        }

        // The csv reader skips blank lines, which in a one-column table are NULL cells.
        let text: Cow<'_, str> = if names.len() == 1 {
            Cow::Owned(quote_blank_lines(text))
        } else {
            Cow::Borrowed(text)
        };
        let mut reader = csv_reader(text.as_bytes());

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        let mut rows = 0usize;
        for record in reader.records() {
            let record = record?;
            if record.len() != names.len() {
                return Err(Error::new(ErrorKind::MalformedResponse(format!(
                    "row {} has {} field(s), header has {}",
                    rows + 1,
                    record.len(),
                    names.len()
                ))));
            }
            for (col, field) in raw.iter_mut().zip(record.iter()) {
                col.push(if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                });
            }
            rows += 1;
        }

        let columns = names
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column {
                name,
                data: ColumnData::infer(cells),
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<Cell<'_>> {
        self.column(column)?.get(row)
    }

    /// Cell rendered as text; `None` when the column is absent or the cell is empty.
    pub fn get_string(&self, row: usize, column: &str) -> Option<String> {
        match self.cell(row, column)? {
            Cell::Missing => None,
            cell => Some(cell.to_string()),
        }
    }

    pub fn get_f64(&self, row: usize, column: &str) -> Option<f64> {
        match self.cell(row, column)? {
            Cell::Int(v) => Some(v as f64),
            Cell::Float(v) => Some(v),
            Cell::Text(s) => s.parse().ok(),
            Cell::Missing => None,
        }
    }

    pub fn get_i64(&self, row: usize, column: &str) -> Option<i64> {
        match self.cell(row, column)? {
            Cell::Int(v) => Some(v),
            Cell::Float(v) if v.fract() == 0.0 => Some(v as i64),
            Cell::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes)
}

/// Rewrites blank record lines after the header as `""` so they decode as
/// one empty field. Blank lines inside quoted fields are left alone.
fn quote_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut seen_header = false;
    let mut in_quotes = false;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        if seen_header && !in_quotes && content.trim().is_empty() {
            out.push_str("\"\"");
            out.push_str(&line[content.len()..]);
            continue;
        }
        if !content.trim().is_empty() {
            seen_header = true;
        }
        out.push_str(line);
        if content.matches('"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
    }
    out
}
