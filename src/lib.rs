//! pidl - a small relational-database access helper.
//!
//! A [`DataAccess`] holds connection settings, opens one connection on first
//! use and runs parameterized statements through it:
//!
//! ```
//! use pidl::{values, ConnectionConfig, DataAccess, SqliteConnector};
//!
//! let config = ConnectionConfig::new("localhost", "0", ":memory:", "app", "secret", "utf8");
//! let mut db = DataAccess::with_config(config, SqliteConnector);
//!
//! db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
//! db.insert("users", &["id", "name"], &values![1, "Ann"], false)?;
//!
//! assert_eq!(db.query_value("SELECT name FROM users WHERE id = ?", &values![1])?, "Ann");
//! # Ok::<(), pidl::DbError>(())
//! ```

// Core infrastructure modules
pub mod config;
pub mod core;

#[cfg(test)]
pub mod test_utils;

pub use crate::config::ConnectionConfig;
pub use crate::core::db::{
    Connection, Connector, DataAccess, InsertStatement, ResultSet, Row, SqliteConnector,
    Statement, Value,
};
#[cfg(feature = "mysql")]
pub use crate::core::db::MysqlConnector;
pub use crate::core::{DbError, Result};
