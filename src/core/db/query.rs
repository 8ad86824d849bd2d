/// Query Result Module
///
/// This module holds the shapes a statement's result can take: the raw
/// `ResultSet` cursor produced by a backend and the column-keyed `Row`
/// handed back to callers.
use super::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single result row: column names mapped to values, in select order.
///
/// Lookups are by column name. Iteration and flattening follow the order
/// the backend reported the columns in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    /// Creates a row from parallel column and value lists.
    ///
    /// A repeated column name keeps its first position and takes the later
    /// value, so every name maps to exactly one value.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        let mut entries: Vec<(String, Value)> = Vec::with_capacity(columns.len());
        for (name, value) in columns.into_iter().zip(values) {
            match entries.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, slot)) => *slot = value,
                None => entries.push((name, value)),
            }
        }
        Row { entries }
    }

    /// Returns the value stored under `column`, if present
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Consumes the row, yielding its values in column order
    pub fn into_values(self) -> impl Iterator<Item = Value> {
        self.entries.into_iter().map(|(_, value)| value)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// The cursor returned by executing a prepared statement.
///
/// Backends collect every row eagerly; the fetch methods then pick the
/// shape a caller asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names from the query result
    pub columns: Vec<String>,
    /// Rows of data, each aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Creates a new ResultSet from column names and row data
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        ResultSet { columns, rows }
    }

    /// A result with no columns and no rows, as produced by statements
    /// such as INSERT or UPDATE
    pub fn empty() -> Self {
        Self::default()
    }

    /// First column of the first row, if any
    pub fn fetch_column(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// First row keyed by column name, if any
    pub fn fetch(self) -> Option<Row> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .next()
            .map(|values| Row::new(columns, values))
    }

    /// Every row keyed by column name
    pub fn fetch_all(self) -> Vec<Row> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| Row::new(columns.clone(), values))
            .collect()
    }
}
