/// Statement Construction Module
///
/// Renders parameterized INSERT / UPSERT statements. Values always travel as
/// positional `?` parameters; identifiers are interpolated into the SQL text
/// and therefore have to pass an allow-list first.
use super::value::Value;
use crate::core::{DbError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("identifier pattern is valid"));

/// SQL text plus the parameters to bind to its placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Rejects any table or column name that is not made of ASCII letters,
/// digits and underscores.
pub fn validate_identifier(name: &str) -> Result<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

/// Wraps an identifier in backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name)
}

/// `count` comma-separated `?` placeholders
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// The assignment list of an `ON DUPLICATE KEY UPDATE` clause, one entry per
/// column in the given order
pub fn on_duplicate_update<C: AsRef<str>>(columns: &[C]) -> String {
    columns
        .iter()
        .map(|column| {
            let quoted = quote_identifier(column.as_ref());
            format!("{} = VALUES({})", quoted, quoted)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builder for `INSERT INTO ... VALUES (...)` with an optional upsert clause.
///
/// The number of placeholders follows `values`, not `columns`. A mismatch is
/// left for the backend to report.
#[derive(Debug, Clone)]
pub struct InsertStatement<'a, C: AsRef<str>> {
    table: &'a str,
    columns: &'a [C],
    values: &'a [Value],
    upsert: bool,
}

impl<'a, C: AsRef<str>> InsertStatement<'a, C> {
    pub fn new(table: &'a str, columns: &'a [C], values: &'a [Value]) -> Self {
        InsertStatement {
            table,
            columns,
            values,
            upsert: false,
        }
    }

    /// Updates every listed column when the row already exists
    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Validates identifiers and renders the statement
    pub fn to_statement(&self) -> Result<Statement> {
        validate_identifier(self.table)?;
        for column in self.columns {
            validate_identifier(column.as_ref())?;
        }

        let columns = self
            .columns
            .iter()
            .map(|column| quote_identifier(column.as_ref()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(self.table),
            columns,
            placeholders(self.values.len())
        );

        if self.upsert {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&on_duplicate_update(self.columns));
        }

        Ok(Statement {
            sql,
            params: self.values.to_vec(),
        })
    }
}
