/// Data Access Module
///
/// `DataAccess` holds connection settings, opens a single connection on first
/// use and runs parameterized statements through it, shaping the results into
/// scalars, rows, flattened columns or row sets.
///
/// ## Error handling
///
/// Every operation funnels through [`DataAccess::execute_statement`]. The
/// `Result`-returning operations surface errors untouched. The best-effort
/// ones (`query`, `query_value_or_empty`, `query_column`,
/// `query_all_or_empty`) turn failures into `false` or an empty value and
/// only log them at debug level. `query_row` sits in between: its behavior
/// depends on the strict flag.
use super::connection::{Connection, Connector};
use super::query::{ResultSet, Row};
use super::statement::InsertStatement;
use super::value::Value;
use crate::config::ConnectionConfig;
use crate::core::{DbError, Result};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Lazily connected, single-connection database helper.
///
/// Not meant to be shared between threads; it is `Send`, so one instance can
/// be handed to a worker.
pub struct DataAccess {
    config: ConnectionConfig,
    connector: Box<dyn Connector>,
    connection: Option<Box<dyn Connection>>,
    strict: bool,
}

impl fmt::Debug for DataAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataAccess")
            .field("config", &self.config)
            .field("driver", &self.connector.driver())
            .field("connected", &self.connection.is_some())
            .field("strict", &self.strict)
            .finish()
    }
}

impl DataAccess {
    /// Creates an unconfigured instance. Call [`DataAccess::configure`]
    /// before the first statement, or connecting fails with a
    /// configuration error.
    pub fn new<C: Connector + 'static>(connector: C) -> Self {
        Self::with_config(ConnectionConfig::default(), connector)
    }

    pub fn with_config<C: Connector + 'static>(config: ConnectionConfig, connector: C) -> Self {
        DataAccess {
            config,
            connector: Box::new(connector),
            connection: None,
            strict: true,
        }
    }

    /// Configures the instance from the `PIDL_*` environment variables.
    pub fn from_env<C: Connector + 'static>(connector: C) -> Result<Self> {
        Ok(Self::with_config(ConnectionConfig::from_env()?, connector))
    }

    /// Configures the instance from a dotenv file, with process variables
    /// taking precedence.
    pub fn from_env_file<P, C>(path: P, connector: C) -> Result<Self>
    where
        P: AsRef<Path>,
        C: Connector + 'static,
    {
        Ok(Self::with_config(
            ConnectionConfig::from_env_file(path)?,
            connector,
        ))
    }

    /// Overwrites all six connection settings, verbatim.
    ///
    /// An already open connection keeps running with the old settings until
    /// the next forced reload.
    pub fn configure(
        &mut self,
        host: impl Into<String>,
        port: impl Into<String>,
        name: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        charset: impl Into<String>,
    ) {
        self.config = ConnectionConfig::new(host, port, name, user, password, charset);
    }

    pub fn set_config(&mut self, config: ConnectionConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// In strict mode (the default) a failed or empty `query_row` is an
    /// error; otherwise it yields an empty row.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Connection string for the current settings and connector
    pub fn dsn(&self) -> String {
        self.config.dsn(self.connector.driver())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Returns the cached connection, opening one first if there is none or
    /// `force_reload` is set.
    ///
    /// A reload only replaces the current connection once the new one is
    /// open; the old one is then closed.
    pub fn connection(&mut self, force_reload: bool) -> Result<&mut dyn Connection> {
        if force_reload || self.connection.is_none() {
            let fresh = self.init_connection()?;
            if let Some(previous) = self.connection.replace(fresh) {
                if let Err(e) = previous.close() {
                    warn!("Failed to close replaced connection: {}", e);
                }
            }
        }

        match self.connection.as_deref_mut() {
            Some(conn) => Ok(conn as &mut dyn Connection),
            None => Err(DbError::Connection("no connection established".to_string())),
        }
    }

    fn init_connection(&self) -> Result<Box<dyn Connection>> {
        self.config.validate()?;

        let dsn = self.dsn();
        let conn = self.connector.connect(&self.config).map_err(|e| match e {
            DbError::Connection(_) => e,
            other => DbError::Connection(other.to_string()),
        })?;

        info!("Connected to {} as {}", dsn, self.config.user);
        Ok(conn)
    }

    /// Closes the current connection, if any. The next statement reconnects.
    pub fn disconnect(&mut self) -> Result<()> {
        if let Some(conn) = self.connection.take() {
            debug!("Closing connection to {}", self.dsn());
            conn.close()?;
        }
        Ok(())
    }

    /// Inserts one row, optionally updating every listed column when the row
    /// already exists (`ON DUPLICATE KEY UPDATE`).
    ///
    /// Identifiers must match `[A-Za-z0-9_]+`; anything else is rejected
    /// before a connection is opened. The placeholder count follows
    /// `values`, so `columns` and `values` must have the same length.
    pub fn insert<C: AsRef<str>>(
        &mut self,
        table: &str,
        columns: &[C],
        values: &[Value],
        upsert: bool,
    ) -> Result<()> {
        let statement = InsertStatement::new(table, columns, values)
            .upsert(upsert)
            .to_statement()?;
        self.execute(&statement.sql, &statement.params)
    }

    /// Prepares `sql`, binds `params` in order and executes it.
    pub fn execute_statement(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        debug!("Executing {:?} with {} parameter(s)", sql, params.len());
        self.connection(false)?.execute(sql, params)
    }

    /// Runs a statement for its side effect, reporting query failures as
    /// `Ok(false)`. Configuration and connection errors still propagate.
    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<bool> {
        match self.execute_statement(sql, params) {
            Ok(_) => Ok(true),
            Err(e) if e.is_query_error() => {
                debug!("Query failed, reporting false: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs a statement for its side effect.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<()> {
        self.execute_statement(sql, params).map(|_| ())
    }

    /// First column of the first row as text; empty when there is no row.
    pub fn query_value(&mut self, sql: &str, params: &[Value]) -> Result<String> {
        let result = self.execute_statement(sql, params)?;
        Ok(result.fetch_column().map(Value::to_text).unwrap_or_default())
    }

    /// Like [`DataAccess::query_value`], but any error yields the empty string.
    pub fn query_value_or_empty(&mut self, sql: &str, params: &[Value]) -> String {
        self.query_value(sql, params).unwrap_or_else(|e| {
            debug!("Value query failed, returning empty string: {}", e);
            String::new()
        })
    }

    /// First row keyed by column name.
    ///
    /// In strict mode query failures propagate and an empty result is
    /// `DbError::NoRows`. With strict mode off both become an empty row.
    /// Configuration and connection errors propagate either way.
    pub fn query_row(&mut self, sql: &str, params: &[Value]) -> Result<Row> {
        let outcome = self
            .execute_statement(sql, params)
            .and_then(|result| result.fetch().ok_or(DbError::NoRows));

        match outcome {
            Ok(row) => Ok(row),
            Err(e) if e.is_query_error() && !self.strict => {
                debug!("Row query failed, returning empty row: {}", e);
                Ok(Row::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Every value of every row, row by row and column by column within a
    /// row. Multi-column queries therefore interleave their columns.
    ///
    /// Failures yield an empty vector.
    pub fn query_column(&mut self, sql: &str, params: &[Value]) -> Vec<Value> {
        self.query_all_or_empty(sql, params)
            .into_iter()
            .flat_map(Row::into_values)
            .collect()
    }

    pub fn query_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        Ok(self.execute_statement(sql, params)?.fetch_all())
    }

    /// Like [`DataAccess::query_all`], but any error yields an empty vector.
    pub fn query_all_or_empty(&mut self, sql: &str, params: &[Value]) -> Vec<Row> {
        self.query_all(sql, params).unwrap_or_else(|e| {
            debug!("Row set query failed, returning no rows: {}", e);
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_config, users_result, FakeConnector};
    use crate::values;

    fn fake_db() -> (DataAccess, FakeConnector) {
        let connector = FakeConnector::new();
        let db = DataAccess::with_config(test_config(), connector.clone());
        (db, connector)
    }

    #[test]
    fn test_connection_is_lazy_and_cached() {
        let (mut db, fake) = fake_db();
        assert!(!db.is_connected());
        assert_eq!(fake.state().lock().unwrap().connects, 0);

        db.execute("SELECT 1", &[]).unwrap();
        db.execute("SELECT 2", &[]).unwrap();

        let state = fake.state();
        let state = state.lock().unwrap();
        assert!(db.is_connected());
        assert_eq!(state.connects, 1);
        assert_eq!(state.statements.len(), 2);
    }

    #[test]
    fn test_force_reload_closes_previous_connection() {
        let (mut db, fake) = fake_db();
        db.connection(false).unwrap();
        db.connection(true).unwrap();

        let state = fake.state();
        let state = state.lock().unwrap();
        assert_eq!(state.connects, 2);
        assert_eq!(state.closes, 1);
    }

    #[test]
    fn test_configure_applies_on_reload_only() {
        let (mut db, fake) = fake_db();
        db.connection(false).unwrap();

        db.configure("other-host", "3307", "other", "u", "p", "latin1");
        db.execute("SELECT 1", &[]).unwrap();
        assert_eq!(
            fake.state().lock().unwrap().last_config.as_ref().unwrap().host,
            "localhost"
        );

        db.connection(true).unwrap();
        assert_eq!(
            fake.state().lock().unwrap().last_config.as_ref().unwrap().host,
            "other-host"
        );
    }

    #[test]
    fn test_configure_keeps_values_verbatim() {
        let (mut db, _) = fake_db();
        db.configure("h", "1", "n", "u", "p", "uft8");
        assert_eq!(db.config().charset, "uft8");
    }

    #[test]
    fn test_unconfigured_instance_fails_before_connecting() {
        let fake = FakeConnector::new();
        let mut db = DataAccess::new(fake.clone());

        let err = db.execute("SELECT 1", &[]).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
        assert_eq!(fake.state().lock().unwrap().connects, 0);
    }

    #[test]
    fn test_connection_errors_are_wrapped() {
        let (mut db, fake) = fake_db();
        fake.refuse("Access denied for user 'app'");

        let err = db.execute("SELECT 1", &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Database connection failed: Access denied for user 'app'"
        );
    }

    #[test]
    fn test_dsn_uses_connector_driver() {
        let (db, _) = fake_db();
        assert_eq!(
            db.dsn(),
            "fake:host=localhost;port=3306;dbname=pidl_test;charset=utf8"
        );
    }

    #[test]
    fn test_insert_upsert_statement() {
        let (mut db, fake) = fake_db();
        db.insert("users", &["id", "name"], &values![1, "Ann"], true)
            .unwrap();

        let state = fake.state();
        let state = state.lock().unwrap();
        let (sql, params) = &state.statements[0];
        assert_eq!(
            sql,
            "INSERT INTO `users` (`id`, `name`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `id` = VALUES(`id`), `name` = VALUES(`name`)"
        );
        assert_eq!(params, &values![1, "Ann"]);
    }

    #[test]
    fn test_insert_propagates_failure() {
        let (mut db, fake) = fake_db();
        fake.fail("Duplicate entry '1' for key 'PRIMARY'");

        let err = db
            .insert("users", &["id"], &values![1], false)
            .unwrap_err();
        assert!(matches!(err, DbError::Query(_)));
    }

    #[test]
    fn test_insert_rejects_identifiers_without_connecting() {
        let (mut db, fake) = fake_db();
        let err = db
            .insert("users`; DROP TABLE users; --", &["id"], &values![1], false)
            .unwrap_err();

        assert!(matches!(err, DbError::InvalidIdentifier(_)));
        assert_eq!(fake.state().lock().unwrap().connects, 0);
    }

    #[test]
    fn test_query_reports_false_on_query_failure() {
        let (mut db, fake) = fake_db();
        fake.fail("syntax error");
        assert!(!db.query("SELEC 1", &[]).unwrap());
        assert!(db.query("SELECT 1", &[]).unwrap());
    }

    #[test]
    fn test_query_propagates_connection_failure() {
        let (mut db, fake) = fake_db();
        fake.refuse("unreachable");
        assert!(matches!(
            db.query("SELECT 1", &[]),
            Err(DbError::Connection(_))
        ));
    }

    #[test]
    fn test_query_value() {
        let (mut db, fake) = fake_db();
        fake.respond(users_result());
        assert_eq!(db.query_value("SELECT id, name FROM users", &[]).unwrap(), "1");
    }

    #[test]
    fn test_query_value_zero_rows_is_empty_string() {
        let (mut db, fake) = fake_db();
        fake.respond(ResultSet::new(vec!["id".to_string()], vec![]));
        assert_eq!(db.query_value("SELECT id FROM users WHERE 0", &[]).unwrap(), "");

        fake.respond(ResultSet::new(vec!["id".to_string()], vec![vec![Value::Null]]));
        assert_eq!(db.query_value_or_empty("SELECT NULL", &[]), "");
    }

    #[test]
    fn test_query_value_variants_on_failure() {
        let (mut db, fake) = fake_db();
        fake.fail("boom").fail("boom");
        assert!(db.query_value("SELECT x", &[]).is_err());
        assert_eq!(db.query_value_or_empty("SELECT x", &[]), "");

        let (mut offline, fake) = fake_db();
        fake.refuse("unreachable");
        assert_eq!(offline.query_value_or_empty("SELECT x", &[]), "");
    }

    #[test]
    fn test_query_row() {
        let (mut db, fake) = fake_db();
        fake.respond(users_result());

        let row = db.query_row("SELECT id, name FROM users", &[]).unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("Ann")));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_query_row_zero_rows_strict() {
        let (mut db, _) = fake_db();
        assert!(db.is_strict());
        assert!(matches!(
            db.query_row("SELECT id FROM users WHERE 0", &[]),
            Err(DbError::NoRows)
        ));
    }

    #[test]
    fn test_query_row_zero_rows_lenient() {
        let (mut db, fake) = fake_db();
        db.set_strict(false);
        assert!(db.query_row("SELECT id FROM users WHERE 0", &[]).unwrap().is_empty());

        fake.fail("syntax error");
        assert!(db.query_row("SELEC", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_query_row_lenient_still_propagates_connection_errors() {
        let (mut db, fake) = fake_db();
        db.set_strict(false);
        fake.refuse("unreachable");
        assert!(matches!(
            db.query_row("SELECT 1", &[]),
            Err(DbError::Connection(_))
        ));
    }

    #[test]
    fn test_query_column_flattens_row_major() {
        let (mut db, fake) = fake_db();
        fake.respond(users_result());

        let values = db.query_column("SELECT id, name FROM users", &[]);
        assert_eq!(values, values![1, "Ann", 2, "Bob"]);
    }

    #[test]
    fn test_query_column_failure_is_empty() {
        let (mut db, fake) = fake_db();
        fake.fail("boom");
        assert!(db.query_column("SELECT x", &[]).is_empty());
    }

    #[test]
    fn test_query_all_variants() {
        let (mut db, fake) = fake_db();
        fake.respond(users_result());
        let rows = db.query_all("SELECT id, name FROM users", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("name"), Some(&Value::from("Bob")));

        fake.fail("boom").fail("boom");
        assert!(db.query_all("SELECT x", &[]).is_err());
        assert!(db.query_all_or_empty("SELECT x", &[]).is_empty());
    }

    #[test]
    fn test_params_are_bound_in_order() {
        let (mut db, fake) = fake_db();
        db.execute(
            "UPDATE users SET name = ? WHERE id = ?",
            &values!["Cleo", 3],
        )
        .unwrap();
        assert_eq!(
            fake.state().lock().unwrap().statements[0].1,
            vec![Value::from("Cleo"), Value::Integer(3)]
        );
    }

    #[test]
    fn test_disconnect() {
        let (mut db, fake) = fake_db();
        db.execute("SELECT 1", &[]).unwrap();
        db.disconnect().unwrap();
        assert!(!db.is_connected());
        assert_eq!(fake.state().lock().unwrap().closes, 1);

        db.execute("SELECT 1", &[]).unwrap();
        assert_eq!(fake.state().lock().unwrap().connects, 2);
    }

    #[test]
    fn test_from_env_file_unreadable_is_config_error() {
        let fake = FakeConnector::new();
        let err = DataAccess::from_env_file("/nonexistent/pidl.env", fake.clone()).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
        assert_eq!(fake.state().lock().unwrap().connects, 0);
    }

    #[test]
    fn test_data_access_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<DataAccess>();
    }
}
