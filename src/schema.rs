//! Declarative schema for the bot database: which collections exist and which
//! indexes each one carries.
//!
//! The bootstrap only asserts that these objects exist; documents themselves
//! are owned by the bot.

use mongodb::bson::Document;
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

/// One index declaration. All keys are ascending unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: &'static [(&'static str, i32)],
    pub unique: bool,
    pub sparse: bool,
}

impl IndexSpec {
    pub const fn asc(keys: &'static [(&'static str, i32)]) -> Self {
        Self {
            keys,
            unique: false,
            sparse: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// The `_id` index is built by the server with every collection and cannot
    /// be created (or given a `unique` option) by clients.
    pub fn is_builtin_id(&self) -> bool {
        matches!(self.keys, [("_id", _)])
    }

    /// Server default index name, e.g. `chat_id_1_category_1`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, dir)| format!("{field}_{dir}"))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn to_model(&self) -> IndexModel {
        let mut keys = Document::new();
        for (field, dir) in self.keys {
            keys.insert(*field, *dir);
        }
        let options = (self.unique || self.sparse).then(|| {
            IndexOptions::builder()
                .unique(self.unique.then_some(true))
                .sparse(self.sparse.then_some(true))
                .build()
        });
        IndexModel::builder().keys(keys).options(options).build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    /// Indexes a client has to create; the builtin `_id` index is excluded.
    pub fn creatable_indexes(&self) -> impl Iterator<Item = &IndexSpec> {
        self.indexes.iter().filter(|i| !i.is_builtin_id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub collections: Vec<CollectionSpec>,
}

impl Schema {
    /// Its presence marks a database as already initialized.
    pub const PRIMARY_COLLECTION: &'static str = "users";

    /// The bot's user/settings/log store.
    pub fn app() -> Self {
        Self {
            collections: vec![
                CollectionSpec {
                    name: "users",
                    indexes: vec![
                        IndexSpec::asc(&[("_id", 1)]).unique(),
                        IndexSpec::asc(&[("username", 1)]).sparse(),
                        IndexSpec::asc(&[("tier", 1)]),
                        IndexSpec::asc(&[("banned", 1)]),
                        IndexSpec::asc(&[("join_date", 1)]),
                    ],
                },
                CollectionSpec {
                    name: "api_urls",
                    indexes: vec![
                        IndexSpec::asc(&[("url", 1)]).unique(),
                        IndexSpec::asc(&[("source_name", 1)]),
                    ],
                },
                CollectionSpec {
                    name: "schedules",
                    indexes: vec![
                        IndexSpec::asc(&[("chat_id", 1), ("category", 1)]).unique(),
                        IndexSpec::asc(&[("last_post_time", 1)]),
                    ],
                },
                CollectionSpec {
                    name: "bot_settings",
                    indexes: vec![IndexSpec::asc(&[("key", 1)]).unique()],
                },
                CollectionSpec {
                    name: "logs",
                    indexes: vec![
                        IndexSpec::asc(&[("timestamp", 1)]),
                        IndexSpec::asc(&[("level", 1)]),
                    ],
                },
            ],
        }
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.collections.iter().map(|c| c.name)
    }

    pub fn creatable_index_count(&self) -> usize {
        self.collections
            .iter()
            .map(|c| c.creatable_indexes().count())
            .sum()
    }
}
