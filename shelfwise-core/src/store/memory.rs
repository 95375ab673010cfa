//! In-memory document store with optional JSON snapshot persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Document, DocumentStore, FieldRange};
use crate::error::{Error, Result};

/// On-disk snapshot layout: `{"collections": {"<name>": [Document, ...]}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<Document>>,
}

/// Document store held in memory.
///
/// When opened from a snapshot file, every merge rewrites the file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            collections: RwLock::new(snapshot.collections),
            snapshot_path: None,
        }
    }

    /// Load a snapshot file. A missing file yields an empty store bound to that path.
    pub fn open_snapshot(path: &Path) -> Result<Self> {
        let snapshot = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            tracing::info!(path = %path.display(), "Snapshot not found, starting empty");
            Snapshot::default()
        };

        tracing::debug!(
            path = %path.display(),
            collections = snapshot.collections.len(),
            "Loaded snapshot"
        );

        Ok(Self {
            collections: RwLock::new(snapshot.collections),
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    /// Add a document to a collection (builder style, for seeding).
    pub fn with_document(self, collection: &str, document: Document) -> Self {
        self.insert(collection, document);
        self
    }

    pub fn insert(&self, collection: &str, document: Document) {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let collections = self
            .collections
            .read()
            .map_err(|_| Error::fetch("*", "store lock poisoned"))?;
        Ok(Snapshot {
            collections: collections.clone(),
        })
    }

    fn filter<F>(&self, collection: &str, predicate: F) -> Result<Vec<Document>>
    where
        F: Fn(&Document) -> bool,
    {
        let collections = self
            .collections
            .read()
            .map_err(|_| Error::fetch(collection, "store lock poisoned"))?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| predicate(d)).cloned().collect())
            .unwrap_or_default())
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(snapshot)?)?;
        tracing::debug!(path = %path.display(), "Snapshot written");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        self.filter(collection, |_| true)
    }

    async fn where_equals(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        self.filter(collection, |doc| doc.get(field) == Some(value))
    }

    async fn where_in_range(
        &self,
        collection: &str,
        field: &str,
        range: &FieldRange,
    ) -> Result<Vec<Document>> {
        self.filter(collection, |doc| {
            doc.get(field).is_some_and(|value| range.contains(value))
        })
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        Ok(self
            .filter(collection, |doc| doc.id == id)?
            .into_iter()
            .next())
    }

    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<()> {
        let snapshot = {
            let mut collections = self
                .collections
                .write()
                .map_err(|_| Error::fetch(collection, "store lock poisoned"))?;
            let docs = collections.entry(collection.to_string()).or_default();
            match docs.iter_mut().find(|doc| doc.id == id) {
                Some(doc) => doc.fields.extend(fields),
                None => docs.push(Document {
                    id: id.to_string(),
                    fields,
                }),
            }
            Snapshot {
                collections: collections.clone(),
            }
        };
        self.persist(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> MemoryStore {
        MemoryStore::new()
            .with_document("Users", Document::new("u1", json!({"userType": "Member"})))
            .with_document("Users", Document::new("u2", json!({"userType": "Librarian"})))
            .with_document("Users", Document::new("u3", json!({"userType": "Member"})))
    }

    #[tokio::test]
    async fn test_where_equals() {
        let store = seeded();
        let members = store
            .where_equals("Users", "userType", &json!("Member"))
            .await
            .unwrap();
        assert_eq!(members.len(), 2);
        assert!(store.get_all("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_where_in_range() {
        let store = MemoryStore::new()
            .with_document("n", Document::new("a", json!({"v": 1})))
            .with_document("n", Document::new("b", json!({"v": 5})))
            .with_document("n", Document::new("c", json!({"v": "5"})));
        let docs = store
            .where_in_range("n", "v", &FieldRange::between(2, 10))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "b");
    }

    #[tokio::test]
    async fn test_merge_updates_and_creates() {
        let store = seeded();
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!("Asha"));
        store.merge_document("Users", "u1", fields).await.unwrap();

        let doc = store.get_document("Users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.get_str("userType"), Some("Member"));
        assert_eq!(doc.get_str("name"), Some("Asha"));

        store
            .merge_document("Users", "u9", Map::new())
            .await
            .unwrap();
        assert!(store.get_document("Users", "u9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_snapshot_persists_on_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/snapshot.json");

        let store = MemoryStore::open_snapshot(&path).unwrap();
        let mut fields = Map::new();
        fields.insert("lateReturnFixedAmount".to_string(), json!(5.0));
        store
            .merge_document("Fine", "fine_configuration", fields)
            .await
            .unwrap();

        let reopened = MemoryStore::open_snapshot(&path).unwrap();
        let doc = reopened
            .get_document("Fine", "fine_configuration")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.get_f64("lateReturnFixedAmount"), Some(5.0));
    }

    #[test]
    fn test_insert_survives_poisoned_lock() {
        let store = std::sync::Arc::new(seeded());
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.collections.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(store.collections.is_poisoned());

        store.insert("Users", Document::new("u4", json!({"userType": "Member"})));

        let collections = store
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let ids: Vec<&str> = collections["Users"].iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2", "u3", "u4"]);
    }
}
