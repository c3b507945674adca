//! Idempotent schema bootstrap.
//!
//! `run` owns the store for the whole run and closes it on every path;
//! `ensure_schema` and `verify_schema` only borrow it.

use std::fmt;

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::db::{IndexInfo, MongoStore, SchemaStore};
use crate::error::BootstrapError;
use crate::schema::{IndexSpec, Schema};

/// How a run treats an existing database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mode {
    /// Inspect and report the plan without creating anything.
    pub dry_run: bool,
    /// Apply the schema even when the primary collection already exists.
    pub force: bool,
    /// List indexes afterwards and fail if any declared index is missing.
    pub verify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Initialized {
        existing: usize,
        collections_created: usize,
        indexes_applied: usize,
    },
    Skipped {
        existing: usize,
    },
    Planned {
        existing: usize,
        collections: Vec<String>,
        indexes: usize,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Initialized {
                collections_created,
                indexes_applied,
                ..
            } => write!(
                f,
                "database initialized ({collections_created} collections created, {indexes_applied} indexes applied)"
            ),
            Outcome::Skipped { existing } => write!(
                f,
                "database already initialized ({existing} collections); no action taken"
            ),
            Outcome::Planned {
                collections,
                indexes,
                ..
            } => write!(
                f,
                "dry run: would create {} collections and apply {indexes} indexes",
                collections.len()
            ),
        }
    }
}

/// A declared index that the server does not have in the declared form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingIndex {
    pub collection: String,
    pub index: String,
    /// What the server has under the same keys, if anything.
    pub found: Option<IndexInfo>,
}

impl fmt::Display for MissingIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.found {
            None => write!(f, "{}.{} is missing", self.collection, self.index),
            Some(info) => write!(
                f,
                "{}.{} exists with unique={} sparse={}",
                self.collection, self.index, info.unique, info.sparse
            ),
        }
    }
}

/// Connect with `config`, bootstrap the application schema and disconnect.
pub async fn run(config: &Config, mode: Mode) -> Result<Outcome, BootstrapError> {
    let store = MongoStore::connect(&config.mongodb).await?;
    run_with(store, &Schema::app(), mode).await
}

/// Bootstrap `schema` through an already connected store, then close it
/// regardless of the result.
pub async fn run_with<S: SchemaStore>(
    store: S,
    schema: &Schema,
    mode: Mode,
) -> Result<Outcome, BootstrapError> {
    let result = apply(&store, schema, mode).await;
    store.close().await;
    result
}

async fn apply<S: SchemaStore>(
    store: &S,
    schema: &Schema,
    mode: Mode,
) -> Result<Outcome, BootstrapError> {
    let outcome = ensure_schema(store, schema, mode).await?;
    if mode.verify && !mode.dry_run {
        let missing = verify_schema(store, schema).await?;
        if !missing.is_empty() {
            for m in &missing {
                warn!("{m}");
            }
            return Err(BootstrapError::Verification { missing });
        }
        info!("schema verified");
    }
    Ok(outcome)
}

/// Create the collections and indexes of `schema` unless the primary
/// collection is already present.
#[instrument(skip_all)]
pub async fn ensure_schema<S: SchemaStore>(
    store: &S,
    schema: &Schema,
    mode: Mode,
) -> Result<Outcome, BootstrapError> {
    let names = store
        .list_collection_names()
        .await
        .map_err(|source| BootstrapError::Connection { source })?;
    let existing = names.len();
    info!("found {existing} existing collections");

    let has = |name: &str| names.iter().any(|n| n == name);
    let initialized = has(Schema::PRIMARY_COLLECTION);

    if initialized && !mode.force {
        info!("database already initialized; skipping");
        return Ok(Outcome::Skipped { existing });
    }

    if mode.dry_run {
        let collections: Vec<String> = schema
            .collection_names()
            .filter(|name| !has(*name))
            .map(str::to_string)
            .collect();
        for name in &collections {
            info!(collection = %name, "would create collection");
        }
        return Ok(Outcome::Planned {
            existing,
            collections,
            indexes: schema.creatable_index_count(),
        });
    }

    if initialized {
        info!("re-applying schema to an initialized database");
    } else {
        info!("database not initialized; creating collections");
    }

    let mut collections_created = 0;
    let mut indexes_applied = 0;
    for coll in &schema.collections {
        if !has(coll.name) {
            store
                .create_collection(coll.name)
                .await
                .map_err(|e| BootstrapError::schema(coll.name, "create collection", e))?;
            collections_created += 1;
        }
        for index in coll.creatable_indexes() {
            store.create_index(coll.name, index).await.map_err(|e| {
                BootstrapError::schema(coll.name, format!("create index {}", index.name()), e)
            })?;
            indexes_applied += 1;
        }
        info!(collection = coll.name, "collection ready");
    }

    info!("database initialized successfully");
    Ok(Outcome::Initialized {
        existing,
        collections_created,
        indexes_applied,
    })
}

/// Report every declared index the server lacks or holds with different
/// uniqueness/sparsity. An empty result means the schema is complete.
#[instrument(skip_all)]
pub async fn verify_schema<S: SchemaStore>(
    store: &S,
    schema: &Schema,
) -> Result<Vec<MissingIndex>, BootstrapError> {
    let names = store
        .list_collection_names()
        .await
        .map_err(|source| BootstrapError::Connection { source })?;

    let mut missing = Vec::new();
    for coll in &schema.collections {
        let present = if names.iter().any(|n| n == coll.name) {
            store
                .list_indexes(coll.name)
                .await
                .map_err(|e| BootstrapError::schema(coll.name, "list indexes", e))?
        } else {
            Vec::new()
        };
        for spec in &coll.indexes {
            if let Some(problem) = check_index(coll.name, spec, &present) {
                missing.push(problem);
            }
        }
    }
    Ok(missing)
}

fn check_index(collection: &str, spec: &IndexSpec, present: &[IndexInfo]) -> Option<MissingIndex> {
    let found = present.iter().find(|info| info.same_keys(spec));
    match found {
        Some(info) if info.unique == spec.unique && info.sparse == spec.sparse => None,
        _ => Some(MissingIndex {
            collection: collection.to_string(),
            index: spec.name(),
            found: found.cloned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_index_matches_attributes() {
        let spec = IndexSpec::asc(&[("url", 1)]).unique();
        let ok = IndexInfo::from_spec(&spec);
        assert!(check_index("api_urls", &spec, &[ok.clone()]).is_none());

        let mut loose = ok;
        loose.unique = false;
        let problem = check_index("api_urls", &spec, &[loose]).unwrap();
        assert_eq!(problem.index, "url_1");
        assert_eq!(
            problem.to_string(),
            "api_urls.url_1 exists with unique=false sparse=false"
        );

        let problem = check_index("api_urls", &spec, &[]).unwrap();
        assert!(problem.found.is_none());
        assert_eq!(problem.to_string(), "api_urls.url_1 is missing");
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(
            Outcome::Skipped { existing: 5 }.to_string(),
            "database already initialized (5 collections); no action taken"
        );
        let planned = Outcome::Planned {
            existing: 0,
            collections: vec!["users".into(), "logs".into()],
            indexes: 11,
        };
        assert_eq!(
            planned.to_string(),
            "dry run: would create 2 collections and apply 11 indexes"
        );
    }
}
