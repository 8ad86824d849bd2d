//! Test helpers: a scripted, recording connector standing in for a real
//! backend.
use crate::config::ConnectionConfig;
use crate::core::db::{Connection, Connector, ResultSet, Value};
use crate::core::{DbError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Everything the fake backend observed, shared between the connector,
/// its connections and the test body.
#[derive(Debug, Default)]
pub struct FakeState {
    /// Number of successful `connect` calls
    pub connects: usize,
    /// Number of connections closed explicitly
    pub closes: usize,
    /// Settings passed to the most recent connect
    pub last_config: Option<ConnectionConfig>,
    /// Every executed statement, in order
    pub statements: Vec<(String, Vec<Value>)>,
    /// Responses handed out for the next executions; empty results once
    /// exhausted
    pub responses: VecDeque<Result<ResultSet>>,
    /// When set, `connect` fails with this message
    pub refuse_connections: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for assertions after the connector has been moved
    pub fn state(&self) -> Arc<Mutex<FakeState>> {
        Arc::clone(&self.state)
    }

    /// Queues a successful result
    pub fn respond(&self, result: ResultSet) -> &Self {
        self.state.lock().unwrap().responses.push_back(Ok(result));
        self
    }

    /// Queues a query failure
    pub fn fail(&self, message: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(Err(DbError::Query(message.to_string())));
        self
    }

    pub fn refuse(&self, message: &str) -> &Self {
        self.state.lock().unwrap().refuse_connections = Some(message.to_string());
        self
    }
}

impl Connector for FakeConnector {
    fn driver(&self) -> &str {
        "fake"
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.refuse_connections {
            return Err(DbError::Connection(message.clone()));
        }
        state.connects += 1;
        state.last_config = Some(config.clone());
        Ok(Box::new(FakeConnection {
            id: state.connects,
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    pub id: usize,
    state: Arc<Mutex<FakeState>>,
}

impl Connection for FakeConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let mut state = self.state.lock().unwrap();
        state.statements.push((sql.to_string(), params.to_vec()));
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(ResultSet::empty()))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// A fully populated config that passes validation
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::new("localhost", "3306", "pidl_test", "app", "secret", "utf8")
}

/// Two-column, two-row result used by shaping tests
pub fn users_result() -> ResultSet {
    ResultSet::new(
        vec!["id".to_string(), "name".to_string()],
        vec![
            vec![Value::Integer(1), Value::from("Ann")],
            vec![Value::Integer(2), Value::from("Bob")],
        ],
    )
}
