//! Configuration loader and validator for the schema bootstrap.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATABASE: &str = "lastperson07_bot";
pub const URI_ENV: &str = "MONGODB_URI";
pub const DATABASE_ENV: &str = "MONGODB_DATABASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid MongoDB URI: {0}")]
    Uri(#[source] mongodb::error::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub mongodb: MongoSettings,
}

/// Connection settings for the target MongoDB deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MongoSettings {
    pub uri: String,
    pub database: String,
    pub connect_timeout_ms: u64,
    pub server_selection_timeout_ms: u64,
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: String::new(),
            database: DEFAULT_DATABASE.to_string(),
            connect_timeout_ms: 10_000,
            server_selection_timeout_ms: 10_000,
        }
    }
}

impl MongoSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    /// The URI with any `user:password@` section masked, safe for logs.
    pub fn redacted_uri(&self) -> String {
        let Some((scheme, rest)) = self.uri.split_once("://") else {
            return self.uri.clone();
        };
        // Credentials can only appear before the first '/' of the host list.
        let authority_end = rest.find('/').unwrap_or(rest.len());
        match rest[..authority_end].rfind('@') {
            Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
            None => self.uri.clone(),
        }
    }
}

/// Load configuration from an optional YAML file, then apply `MONGODB_URI` and
/// `MONGODB_DATABASE` from the process environment and validate the result.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load`] with an injectable environment lookup.
pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        }
        None => Config::default(),
    };
    apply_env(&mut cfg, env);
    validate(&cfg)?;
    Ok(cfg)
}

fn apply_env<F>(cfg: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(uri) = env(URI_ENV).filter(|v| !v.trim().is_empty()) {
        cfg.mongodb.uri = uri.trim().to_string();
    }
    if let Some(db) = env(DATABASE_ENV).filter(|v| !v.trim().is_empty()) {
        cfg.mongodb.database = db.trim().to_string();
    }
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let m = &cfg.mongodb;
    if m.uri.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "mongodb.uri must be non-empty (set MONGODB_URI)",
        ));
    }
    if !(m.uri.starts_with("mongodb://") || m.uri.starts_with("mongodb+srv://")) {
        return Err(ConfigError::Invalid(
            "mongodb.uri must start with mongodb:// or mongodb+srv://",
        ));
    }

    if m.database.trim().is_empty() {
        return Err(ConfigError::Invalid("mongodb.database must be non-empty"));
    }
    // MongoDB rejects these in database names on every platform.
    if m
        .database
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '.' | ' ' | '"' | '$' | '\0'))
    {
        return Err(ConfigError::Invalid(
            "mongodb.database contains a character MongoDB does not allow",
        ));
    }
    if m.database.len() >= 64 {
        return Err(ConfigError::Invalid(
            "mongodb.database must be shorter than 64 bytes",
        ));
    }

    if m.connect_timeout_ms == 0 {
        return Err(ConfigError::Invalid("mongodb.connect_timeout_ms must be > 0"));
    }
    if m.server_selection_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "mongodb.server_selection_timeout_ms must be > 0",
        ));
    }

    Ok(())
}

/// Example YAML accepted by `--config`.
pub fn example() -> &'static str {
    r#"mongodb:
  uri: "mongodb://localhost:27017"
  database: "lastperson07_bot"
  connect_timeout_ms: 10000
  server_selection_timeout_ms: 10000
"#
}
