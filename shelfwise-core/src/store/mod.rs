//! Document store access
//!
//! The library never owns persistence. Every read and write goes through the
//! [`DocumentStore`] trait, a narrow slice of a document database client:
//! list a collection, filter on one field, fetch or merge a single document.
//!
//! Shipped backends:
//! - [`MemoryStore`]: in-process collections, optionally persisted to a JSON
//!   snapshot file on every write
//! - [`HttpStore`]: client for a document gateway speaking JSON over HTTP

mod http;
mod memory;

pub use http::HttpStore;
pub use memory::{MemoryStore, Snapshot};

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{StoreConfig, StoreKind};
use crate::error::Result;

/// Collection names used by the reports and editors.
pub mod collections {
    pub const CHECKINS: &str = "checkindetails";
    pub const FINES: &str = "FineDetails";
    pub const RATINGS: &str = "BookRating";
    pub const BOOKS: &str = "books";
    pub const USERS: &str = "Users";
    pub const FINE_CONFIG: &str = "Fine";
}

/// A semi-structured record: an id plus free-form fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String field, `None` when absent or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }
}

/// Inclusive bounds for a range query. Either side may be open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRange {
    pub min: Option<Value>,
    pub max: Option<Value>,
}

impl FieldRange {
    pub fn between(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    /// Whether `value` falls within the range under store ordering.
    ///
    /// Values of a different JSON type than a bound never match it.
    pub fn contains(&self, value: &Value) -> bool {
        let above_min = match &self.min {
            Some(min) => matches!(
                compare_values(value, min),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            None => true,
        };
        let below_max = match &self.max {
            Some(max) => matches!(
                compare_values(value, max),
                Some(Ordering::Less | Ordering::Equal)
            ),
            None => true,
        };
        above_min && below_max
    }
}

/// Store ordering: numbers numerically, strings lexicographically.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Query contract of the external document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in a collection.
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Documents whose `field` equals `value`.
    async fn where_equals(&self, collection: &str, field: &str, value: &Value)
        -> Result<Vec<Document>>;

    /// Documents whose `field` lies within `range` (inclusive).
    async fn where_in_range(
        &self,
        collection: &str,
        field: &str,
        range: &FieldRange,
    ) -> Result<Vec<Document>>;

    /// A single document by id, `None` when it does not exist.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Merge `fields` into the document, creating it if needed.
    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<()>;
}

/// Open the store described by configuration.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    config.validate()?;
    match config.kind {
        StoreKind::Snapshot => {
            let path = config.snapshot_path();
            tracing::debug!(path = %path.display(), "Opening snapshot store");
            Ok(Arc::new(MemoryStore::open_snapshot(&path)?))
        }
        StoreKind::Http => {
            tracing::debug!(base_url = ?config.base_url, "Opening HTTP document store");
            Ok(Arc::new(HttpStore::new(config)?))
        }
    }
}
