/// Connection Management Module
///
/// This module defines the seam between `DataAccess` and a concrete driver:
/// a `Connector` opens a `Connection` from a `ConnectionConfig`, and a
/// `Connection` executes one statement at a time.
use super::query::ResultSet;
use super::value::Value;
use crate::config::ConnectionConfig;
use crate::core::{DbError, Result};
use tracing::debug;

/// A live, exclusively owned session with a database backend.
///
/// Implementations must report every prepare, bind or execute failure as
/// `DbError::Query` and return rows with their column names.
pub trait Connection: Send {
    /// Prepares `sql`, binds `params` positionally and executes it
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet>;

    /// Releases the session. Dropping a connection also releases it; this
    /// variant reports failures.
    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Factory for connections.
pub trait Connector: Send {
    /// Driver prefix used when rendering the DSN
    fn driver(&self) -> &str;

    /// Opens a new connection with the given settings
    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>>;
}

impl<F> Connector for F
where
    F: Fn(&ConnectionConfig) -> Result<Box<dyn Connection>> + Send,
{
    fn driver(&self) -> &str {
        "custom"
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        self(config)
    }
}

/// Opens SQLite databases through rusqlite.
///
/// The config's `name` is the database path (`:memory:` for an in-memory
/// database). Host, port and credentials have no meaning for SQLite and
/// are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn driver(&self) -> &str {
        "sqlite"
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let conn = rusqlite::Connection::open(&config.name)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        // Initialize connection with common pragmas
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DbError::Connection(e.to_string()))?;

        match sqlite_encoding(&config.charset) {
            Some(encoding) => {
                // only takes effect on a database that has no content yet
                conn.execute_batch(&format!("PRAGMA encoding = '{}';", encoding))
                    .map_err(|e| DbError::Connection(e.to_string()))?;
            }
            None => debug!("charset {:?} has no SQLite encoding, ignoring", config.charset),
        }

        Ok(Box::new(SqliteConnection { conn }))
    }
}

/// Maps a MySQL-style charset name onto a SQLite text encoding
fn sqlite_encoding(charset: &str) -> Option<&'static str> {
    let charset = charset.to_ascii_lowercase();
    if charset.starts_with("utf16") {
        Some("UTF-16")
    } else if charset.starts_with("utf8") {
        Some("UTF-8")
    } else {
        None
    }
}

/// A rusqlite-backed connection
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl Connection for SqliteConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DbError::Query(format!("Failed to prepare statement: {}", e)))?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                (0..column_count)
                    .map(|i| row.get_ref(i).map(Value::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(|e| DbError::Query(format!("Query execution failed: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DbError::Query(format!("Result processing failed: {}", e)))?;

        Ok(ResultSet::new(columns, rows))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| DbError::Connection(e.to_string()))
    }
}
