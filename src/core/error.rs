/// Pidl Error Module
///
/// This module defines the error taxonomy for database access. Throwing
/// operations surface these untouched; best-effort operations swallow the
/// query class and return an empty value instead.
use thiserror::Error;

/// Error type for every fallible operation in the crate.
///
/// The variants fall into three groups:
/// - configuration (missing settings, unreadable or malformed config files)
/// - connection (backend unreachable, credentials rejected)
/// - query (anything that goes wrong preparing or executing a statement)
#[derive(Error, Debug)]
pub enum DbError {
    /// A required setting is missing or empty
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend could not be reached or rejected the credentials
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Malformed SQL, constraint violations, parameter-count mismatches and
    /// type coercion failures reported by the backend
    #[error("Query error: {0}")]
    Query(String),

    /// A single-row lookup in strict mode matched nothing
    #[error("Query returned no rows")]
    NoRows,

    /// A table or column name failed the identifier allow-list
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Config file I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DbError {
    /// Returns `true` for errors raised while building or running a
    /// statement, as opposed to configuration or connection failures.
    ///
    /// Best-effort operations only ever swallow this class.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            DbError::Query(_) | DbError::NoRows | DbError::InvalidIdentifier(_)
        )
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Query(err.to_string())
    }
}

/// Type alias for Result to use DbError as the error type.
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let conn_err = DbError::Connection("Access denied for user 'app'".to_string());
        assert_eq!(
            conn_err.to_string(),
            "Database connection failed: Access denied for user 'app'"
        );

        let query_err = DbError::Query("Syntax error".to_string());
        assert!(query_err.to_string().contains("Query error"));

        let config_err = DbError::Config("PIDL_HOST is not set".to_string());
        assert!(config_err.to_string().contains("Configuration error"));

        let ident_err = DbError::InvalidIdentifier("users; DROP".to_string());
        assert_eq!(ident_err.to_string(), "Invalid identifier: \"users; DROP\"");
    }

    #[test]
    fn test_query_error_classification() {
        assert!(DbError::Query("boom".to_string()).is_query_error());
        assert!(DbError::NoRows.is_query_error());
        assert!(DbError::InvalidIdentifier("a-b".to_string()).is_query_error());
        assert!(!DbError::Connection("refused".to_string()).is_query_error());
        assert!(!DbError::Config("missing".to_string()).is_query_error());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let db_err: DbError = io_err.into();
        match db_err {
            DbError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }

        let sqlite_err: DbError = rusqlite::Error::ExecuteReturnedResults.into();
        match sqlite_err {
            DbError::Query(_) => {}
            _ => panic!("Expected Query error"),
        }
    }
}
