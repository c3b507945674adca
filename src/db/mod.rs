//! Database access for the bootstrap.
//!
//! - `SchemaStore`: the handful of administrative calls the bootstrap issues.
//! - `mongo`: the MongoDB-backed implementation used by the binary.
//!
//! Tests drive the bootstrap through their own `SchemaStore` so the control
//! flow can be checked without a running server.

pub mod mongo;

use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::Bson;
use mongodb::IndexModel;

use crate::schema::IndexSpec;

pub use mongo::MongoStore;

/// Administrative operations against one target database.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn list_collection_names(&self) -> Result<Vec<String>>;

    async fn create_collection(&self, name: &str) -> Result<()>;

    /// Must be a no-op when an identical index already exists.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()>;

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexInfo>>;

    /// Release the connection. Called exactly once per store.
    async fn close(self);
}

/// An index as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub keys: Vec<(String, i32)>,
    pub unique: bool,
    pub sparse: bool,
}

impl IndexInfo {
    pub fn from_model(model: &IndexModel) -> Self {
        let keys: Vec<(String, i32)> = model
            .keys
            .iter()
            .map(|(field, dir)| (field.clone(), key_direction(dir)))
            .collect();
        let options = model.options.as_ref();
        // `_id_` carries no unique flag but is always unique.
        let is_id = keys.len() == 1 && keys[0].0 == "_id";
        Self {
            unique: is_id || options.and_then(|o| o.unique).unwrap_or(false),
            sparse: options.and_then(|o| o.sparse).unwrap_or(false),
            keys,
        }
    }

    pub fn from_spec(spec: &IndexSpec) -> Self {
        Self {
            keys: spec
                .keys
                .iter()
                .map(|(field, dir)| (field.to_string(), *dir))
                .collect(),
            unique: spec.unique,
            sparse: spec.sparse,
        }
    }

    pub fn same_keys(&self, spec: &IndexSpec) -> bool {
        self.keys.len() == spec.keys.len()
            && self
                .keys
                .iter()
                .zip(spec.keys)
                .all(|((field, dir), (want_field, want_dir))| field == want_field && dir == want_dir)
    }
}

// Text/hashed/geo indexes use string values and out-of-range numbers are not a
// direction; both map to 0, which never matches a declared key.
fn key_direction(value: &Bson) -> i32 {
    match value {
        Bson::Int32(v) => *v,
        Bson::Int64(v) => i32::try_from(*v).unwrap_or(0),
        Bson::Double(v) if *v == 1.0 => 1,
        Bson::Double(v) if *v == -1.0 => -1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use mongodb::options::IndexOptions;

    #[test]
    fn id_index_reports_unique() {
        let model = IndexModel::builder().keys(doc! { "_id": 1 }).build();
        let info = IndexInfo::from_model(&model);
        assert!(info.unique);
        assert!(!info.sparse);
    }

    #[test]
    fn reads_options_and_numeric_directions() {
        let model = IndexModel::builder()
            .keys(doc! { "chat_id": 1_i64, "category": 1.0 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let info = IndexInfo::from_model(&model);
        assert_eq!(
            info.keys,
            vec![("chat_id".to_string(), 1), ("category".to_string(), 1)]
        );
        assert!(info.unique);
        let spec = IndexSpec::asc(&[("chat_id", 1), ("category", 1)]).unique();
        assert!(info.same_keys(&spec));
        assert!(!info.same_keys(&IndexSpec::asc(&[("chat_id", 1)])));
    }

    #[test]
    fn oversized_or_fractional_directions_never_match() {
        let spec = IndexSpec::asc(&[("tier", 1)]);

        let wide = IndexModel::builder()
            .keys(doc! { "tier": 4_294_967_297_i64 })
            .build();
        let info = IndexInfo::from_model(&wide);
        assert_eq!(info.keys, vec![("tier".to_string(), 0)]);
        assert!(!info.same_keys(&spec));

        let fractional = IndexModel::builder().keys(doc! { "tier": 1.5 }).build();
        assert!(!IndexInfo::from_model(&fractional).same_keys(&spec));

        let descending = IndexModel::builder().keys(doc! { "tier": -1.0 }).build();
        assert_eq!(
            IndexInfo::from_model(&descending).keys,
            vec![("tier".to_string(), -1)]
        );

        let hashed = IndexModel::builder().keys(doc! { "tier": "hashed" }).build();
        assert!(!IndexInfo::from_model(&hashed).same_keys(&spec));
    }

    #[test]
    fn from_spec_round_trips_attributes() {
        let spec = IndexSpec::asc(&[("username", 1)]).sparse();
        let info = IndexInfo::from_spec(&spec);
        assert!(info.same_keys(&spec));
        assert!(info.sparse && !info.unique);
    }
}
