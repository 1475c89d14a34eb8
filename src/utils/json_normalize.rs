//! Flatten a list of JSON records into a rectangular frame, one column per
//! leaf path.  Nested objects give dotted paths (`a.b`), arrays are kept as
//! their JSON text.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },
    #[error("columns `{first}` and `{second}` both normalize to `{name}`")]
    DuplicateColumn {
        first: String,
        second: String,
        name: String,
    },
}

/// One flattened value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    fn from_leaf(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => Cell::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "null"),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Storage type of a column, inferred from its non-null cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Varchar,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    fn of(cell: &Cell) -> Option<ColumnType> {
        match cell {
            Cell::Null => None,
            Cell::Bool(_) => Some(ColumnType::Boolean),
            Cell::Int(_) => Some(ColumnType::BigInt),
            Cell::Float(_) => Some(ColumnType::Double),
            Cell::Text(_) => Some(ColumnType::Varchar),
        }
    }

    fn widen(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (BigInt, Double) | (Double, BigInt) => Double,
            _ => Varchar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Frame {
    /// Number of rows and columns.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    /// An all-null column is `VARCHAR`.
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len())
            .map(|j| {
                self.rows
                    .iter()
                    .filter_map(|row| ColumnType::of(&row[j]))
                    .reduce(ColumnType::widen)
                    .unwrap_or(ColumnType::Varchar)
            })
            .collect()
    }
}

/// Lowercase, then replace `.` and spaces with `_`.  Applying it twice gives the
/// same result as applying it once.
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace('.', "_").replace(' ', "_")
}

/// Leaf paths of one record in key order.  An empty nested object has no leaves.
pub fn flatten_record(record: &Map<String, Value>) -> Vec<(String, Cell)> {
    let mut out = Vec::new();
    flatten_into(None, record, &mut out);
    out
}

fn flatten_into(prefix: Option<&str>, map: &Map<String, Value>, out: &mut Vec<(String, Cell)>) {
    for (key, value) in map {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(Some(&path), inner, out),
            leaf => out.push((path, Cell::from_leaf(leaf))),
        }
    }
}

/// Flatten the records and normalize the column names.  Columns appear in the
/// order they are first seen; a record without a column gets a null there.
pub fn json_normalize(records: &[Value]) -> Result<Frame, NormalizeError> {
    let mut paths: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut flat_rows: Vec<Vec<(usize, Cell)>> = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let Value::Object(map) = record else {
            return Err(NormalizeError::NotAnObject { index: i });
        };
        let mut row = Vec::new();
        for (path, cell) in flatten_record(map) {
            let j = match index.get(&path) {
                Some(j) => *j,
                None => {
                    paths.push(path.clone());
                    index.insert(path, paths.len() - 1);
                    paths.len() - 1
                }
            };
            row.push((j, cell));
        }
        flat_rows.push(row);
    }

    let mut seen: HashMap<String, &str> = HashMap::new();
    let mut columns = Vec::with_capacity(paths.len());
    for path in &paths {
        let name = normalize_column_name(path);
        if let Some(first) = seen.get(&name) {
            return Err(NormalizeError::DuplicateColumn {
                first: first.to_string(),
                second: path.clone(),
                name,
            });
        }
        seen.insert(name.clone(), path);
        columns.push(name);
    }

    let rows = flat_rows
        .into_iter()
        .map(|cells| {
            let mut row = vec![Cell::Null; columns.len()];
            for (j, cell) in cells {
                row[j] = cell;
            }
            row
        })
        .collect();

    Ok(Frame { columns, rows })
}
