use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database, IndexModel};
use tracing::{info, instrument};

use super::{IndexInfo, SchemaStore};
use crate::config::{ConfigError, MongoSettings};
use crate::error::BootstrapError;
use crate::schema::IndexSpec;

/// A live client bound to the target database.
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Parse the URI, apply timeouts and ping the server.
    ///
    /// A URI the driver cannot parse is a configuration error; DNS, TCP, TLS,
    /// auth and timeout failures are connection errors.
    #[instrument(skip_all, fields(database = %settings.database))]
    pub async fn connect(settings: &MongoSettings) -> Result<Self, BootstrapError> {
        info!(uri = %settings.redacted_uri(), "connecting to MongoDB");
        // `mongodb+srv://` resolves DNS while parsing; only a malformed string
        // is the caller's mistake.
        let mut options = ClientOptions::parse(settings.uri.as_str())
            .await
            .map_err(|err| {
                if matches!(*err.kind, ErrorKind::InvalidArgument { .. }) {
                    BootstrapError::from(ConfigError::Uri(err))
                } else {
                    BootstrapError::Connection { source: err.into() }
                }
            })?;
        options.connect_timeout = Some(settings.connect_timeout());
        options.server_selection_timeout = Some(settings.server_selection_timeout());
        if options.app_name.is_none() {
            options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        }

        let client = Client::with_options(options)
            .map_err(|err| BootstrapError::Connection { source: err.into() })?;

        let deadline = settings.server_selection_timeout() + settings.connect_timeout();
        let ping = async {
            client
                .database("admin")
                .run_command(doc! { "ping": 1 })
                .await
        };
        let failure = match tokio::time::timeout(deadline, ping).await {
            Ok(Ok(_)) => None,
            Ok(Err(err)) => Some(anyhow::Error::from(err)),
            Err(_) => Some(anyhow!("no response from server within {deadline:?}")),
        };
        if let Some(source) = failure {
            client.shutdown().await;
            return Err(BootstrapError::Connection { source });
        }

        info!("connected to MongoDB");
        let db = client.database(&settings.database);
        Ok(Self { client, db })
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.db.collection(name)
    }
}

#[async_trait]
impl SchemaStore for MongoStore {
    #[instrument(skip_all)]
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        Ok(self.db.list_collection_names().await?)
    }

    #[instrument(skip(self))]
    async fn create_collection(&self, name: &str) -> Result<()> {
        self.db.create_collection(name).await?;
        Ok(())
    }

    #[instrument(skip(self, index), fields(index = %index.name()))]
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()> {
        self.collection(collection)
            .create_index(index.to_model())
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexInfo>> {
        let models: Vec<IndexModel> = self
            .collection(collection)
            .list_indexes()
            .await?
            .try_collect()
            .await?;
        Ok(models.iter().map(IndexInfo::from_model).collect())
    }

    async fn close(self) {
        self.client.shutdown().await;
        info!("MongoDB connection closed");
    }
}
