use crate::core::{DbError, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

pub const ENV_HOST: &str = "PIDL_HOST";
pub const ENV_PORT: &str = "PIDL_PORT";
pub const ENV_NAME: &str = "PIDL_NAME";
pub const ENV_USER: &str = "PIDL_USER";
pub const ENV_PASSWORD: &str = "PIDL_PASSWORD";
pub const ENV_CHARSET: &str = "PIDL_CHARSET";

/// Every variable that must be present and non-empty, in reporting order.
pub const REQUIRED_VARS: [&str; 6] = [
    ENV_HOST,
    ENV_PORT,
    ENV_NAME,
    ENV_USER,
    ENV_PASSWORD,
    ENV_CHARSET,
];

/// Connection parameters for a single database.
///
/// `port` stays textual: it is only ever interpolated into a connection
/// string. Backends that need a number parse it when they connect.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(deserialize_with = "port_from_text_or_number")]
    pub port: String,
    pub name: String,
    pub user: String,
    pub password: String,
    pub charset: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("charset", &self.charset)
            .finish()
    }
}

impl ConnectionConfig {
    /// Creates a config from the six parameters, stored verbatim.
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        name: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        charset: impl Into<String>,
    ) -> Self {
        ConnectionConfig {
            host: host.into(),
            port: port.into(),
            name: name.into(),
            user: user.into(),
            password: password.into(),
            charset: charset.into(),
        }
    }

    /// Loads the `PIDL_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the `PIDL_*` variables from a dotenv file such as `pidl.env`.
    ///
    /// Variables already set in the process environment take precedence over
    /// the file. The process environment itself is never modified.
    pub fn from_env_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_env_file_with(path, |key| std::env::var(key).ok())
    }

    /// Loads a dotenv file, resolving each key through `process_lookup`
    /// first and the file second.
    ///
    /// A key that `process_lookup` reports, even as an empty string, shadows
    /// the file entry.
    pub fn from_env_file_with<P, F>(path: P, process_lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let entries = dotenvy::from_path_iter(path).map_err(|e| {
            DbError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut file_vars = HashMap::new();
        for entry in entries {
            let (key, value) = entry.map_err(|e| {
                DbError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            file_vars.insert(key, value);
        }

        Self::from_lookup(|key| process_lookup(key).or_else(|| file_vars.get(key).cloned()))
    }

    /// Builds a config from an arbitrary key lookup.
    ///
    /// All six `PIDL_*` keys must resolve to non-empty values. The charset
    /// is passed through [`normalize_charset`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut found = HashMap::new();
        let mut missing = Vec::new();
        for key in REQUIRED_VARS {
            match lookup(key) {
                Some(value) if !value.is_empty() => {
                    found.insert(key, value);
                }
                _ => missing.push(key),
            }
        }

        if !missing.is_empty() {
            return Err(DbError::Config(format!(
                "required variables missing or empty: {}",
                missing.join(", ")
            )));
        }

        let mut take = |key: &str| found.remove(key).unwrap_or_default();
        Ok(ConnectionConfig {
            host: take(ENV_HOST),
            port: take(ENV_PORT),
            name: take(ENV_NAME),
            user: take(ENV_USER),
            password: take(ENV_PASSWORD),
            charset: normalize_charset(&take(ENV_CHARSET)),
        })
    }

    /// Fails with a configuration error naming every empty field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("host", &self.host),
            ("port", &self.port),
            ("name", &self.name),
            ("user", &self.user),
            ("password", &self.password),
            ("charset", &self.charset),
        ];
        let empty: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(field, _)| *field)
            .collect();

        if empty.is_empty() {
            Ok(())
        } else {
            Err(DbError::Config(format!(
                "connection settings must not be empty: {}",
                empty.join(", ")
            )))
        }
    }

    /// Renders `<driver>:host=<host>;port=<port>;dbname=<name>;charset=<charset>`.
    pub fn dsn(&self, driver: &str) -> String {
        format!(
            "{}:host={};port={};dbname={};charset={}",
            driver, self.host, self.port, self.name, self.charset
        )
    }
}

/// Rewrites the common "uft" typo to "utf". Nothing else is touched.
pub fn normalize_charset(charset: &str) -> String {
    charset.replace("uft", "utf")
}

fn port_from_text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(i64),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(text) => text,
        Port::Number(number) => number.to_string(),
    })
}

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: ConnectionConfig,
}

/// Loads configuration from a TOML file at the given path.
///
/// Values are taken as written (no charset rewrite) and must all be
/// non-empty.
///
/// # Example
///
/// ```no_run
/// let config = pidl::config::load_config("pidl.toml").expect("Failed to load config");
/// println!("{:?}", config.database);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.database.validate()?;
    Ok(config)
}
