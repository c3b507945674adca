use thiserror::Error;

use crate::bootstrap::MissingIndex;
use crate::config::ConfigError;

/// Every way a bootstrap run can fail. None of them are retried.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("connection failed: {source:#}")]
    Connection {
        #[source]
        source: anyhow::Error,
    },

    #[error("{action} on `{collection}` failed: {source:#}")]
    SchemaOperation {
        collection: String,
        action: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("schema verification failed: {} index(es) missing or mismatched", .missing.len())]
    Verification { missing: Vec<MissingIndex> },
}

impl BootstrapError {
    pub(crate) fn schema(
        collection: &str,
        action: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::SchemaOperation {
            collection: collection.to_string(),
            action: action.into(),
            source,
        }
    }

    /// Short label for logs. Verification mismatches are schema failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Connection { .. } => "connection",
            Self::SchemaOperation { .. } | Self::Verification { .. } => "schema_operation",
        }
    }
}
