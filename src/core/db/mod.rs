/// Database Module
///
/// This module provides the database access layer for Pidl, organized into
/// focused submodules:
///
/// - **Values** (`value.rs`): scalar parameters and cells
/// - **Results** (`query.rs`): the `ResultSet` cursor and column-keyed `Row`
/// - **Statements** (`statement.rs`): identifier checks and INSERT/UPSERT rendering
/// - **Connections** (`connection.rs`, `mysql.rs`): the driver seam and its backends
/// - **Access** (`access.rs`): `DataAccess`, which ties the above together
///
/// ## Error Handling
///
/// All database operations use the `DbError` type for consistent error propagation.
pub mod access;
pub mod connection;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod query;
pub mod statement;
pub mod value;

pub use access::DataAccess;
pub use connection::{Connection, Connector, SqliteConnection, SqliteConnector};
#[cfg(feature = "mysql")]
pub use self::mysql::{MysqlConnection, MysqlConnector};
pub use query::{ResultSet, Row};
pub use statement::{InsertStatement, Statement};
pub use value::Value;
