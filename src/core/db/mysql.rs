/// MySQL / MariaDB backend built on the `mysql` crate.
///
/// Only compiled with the `mysql` cargo feature.
use super::connection::{Connection, Connector};
use super::query::ResultSet;
use super::statement::validate_identifier;
use super::value::Value;
use crate::config::ConnectionConfig;
use crate::core::{DbError, Result};
use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Params};

/// Opens TCP connections to a MySQL-compatible server.
#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlConnector;

impl Connector for MysqlConnector {
    fn driver(&self) -> &str {
        "mysql"
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let port: u16 = config
            .port
            .parse()
            .map_err(|_| DbError::Connection(format!("invalid port {:?}", config.port)))?;

        // SET NAMES cannot take a placeholder
        validate_identifier(&config.charset)
            .map_err(|_| DbError::Connection(format!("invalid charset {:?}", config.charset)))?;

        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(port)
            .db_name(Some(config.name.clone()))
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .init(vec![format!("SET NAMES {}", config.charset)]);

        let conn = Conn::new(opts).map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(Box::new(MysqlConnection { conn }))
    }
}

/// A `mysql::Conn`-backed connection. The server session ends when it is
/// dropped.
pub struct MysqlConnection {
    conn: Conn,
}

impl Connection for MysqlConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let params = if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(params.iter().map(to_mysql).collect())
        };

        let rows: Vec<mysql::Row> = self
            .conn
            .exec(sql, params)
            .map_err(|e| DbError::Query(e.to_string()))?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| {
                row.columns_ref()
                    .iter()
                    .map(|column| column.name_str().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows
            .into_iter()
            .map(|row| row.unwrap().into_iter().map(from_mysql).collect())
            .collect();

        Ok(ResultSet::new(columns, rows))
    }
}

fn to_mysql(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Integer(i) => mysql::Value::Int(*i),
        Value::Real(f) => mysql::Value::Double(*f),
        Value::Text(t) => mysql::Value::Bytes(t.clone().into_bytes()),
        Value::Blob(b) => mysql::Value::Bytes(b.clone()),
    }
}

fn from_mysql(value: mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Blob(e.into_bytes()),
        },
        mysql::Value::Int(i) => Value::Integer(i),
        mysql::Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(u.to_string()),
        },
        mysql::Value::Float(f) => Value::Real(f64::from(f)),
        mysql::Value::Double(d) => Value::Real(d),
        mysql::Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Value::Text(text)
        }
        mysql::Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let total_hours = days * 24 + u32::from(hours);
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                if negative { "-" } else { "" },
                total_hours,
                minutes,
                seconds
            );
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Value::Text(text)
        }
    }
}
