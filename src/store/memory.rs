use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use log::{debug, trace};
use serde_json::{Map, Value};

use super::{merge_fields, CollectionPath, DocPath, Document, DocumentStore};
use crate::{PrepaseError, Result};

/// In-memory document store for tests and throw-away sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<BTreeMap<Vec<String>, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<Vec<String>, Value>>> {
        self.documents
            .lock()
            .map_err(|_| PrepaseError::LockAcquisitionFailed {
                message: "Failed to acquire lock on memory store".to_string(),
            })
    }

    /// Number of stored documents across all collections
    pub fn len(&self) -> usize {
        self.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Value>> {
        trace!("Reading {}", path);
        Ok(self.lock()?.get(path.segments()).cloned())
    }

    async fn set(&self, path: &DocPath, data: Value) -> Result<()> {
        debug!("Writing document {}", path);
        self.lock()?.insert(path.segments().to_vec(), data);
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> Result<()> {
        let mut docs = self.lock()?;
        let current = docs
            .get_mut(path.segments())
            .ok_or_else(|| PrepaseError::DocumentNotFound {
                path: path.to_string(),
            })?;
        merge_fields(current, fields);
        debug!("Updated document {}", path);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<bool> {
        let removed = self.lock()?.remove(path.segments()).is_some();
        debug!("Delete {} removed={}", path, removed);
        Ok(removed)
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>> {
        let prefix = collection.segments();
        let docs = self.lock()?;
        let listed: Vec<Document> = docs
            .iter()
            .filter(|(key, _)| key.len() == prefix.len() + 1 && key.starts_with(prefix))
            .filter_map(|(key, data)| {
                key.last().map(|id| Document {
                    id: id.clone(),
                    data: data.clone(),
                })
            })
            .collect();
        debug!("Listed {} documents in {}", listed.len(), collection);
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn list_only_returns_direct_children() {
        let store = MemoryStore::new();
        store
            .set(&DocPath::user("alice").unwrap(), json!({"password": "p"}))
            .await
            .unwrap();
        store
            .set(&DocPath::note("alice", "n1").unwrap(), json!({"noteTitle": "a"}))
            .await
            .unwrap();
        store
            .set(&DocPath::note("bob", "n2").unwrap(), json!({"noteTitle": "b"}))
            .await
            .unwrap();

        let alice = store
            .list(&CollectionPath::notes("alice").unwrap())
            .await
            .unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, "n1");
        assert_eq!(store.list(&CollectionPath::users()).await.unwrap().len(), 1);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn add_generates_a_fresh_key() {
        let store = MemoryStore::new();
        let notes = CollectionPath::notes("alice").unwrap();

        let first = store.add(&notes, json!({})).await.unwrap();
        let second = store.add(&notes, json!({})).await.unwrap();

        assert_ne!(first, second);
        assert!(store
            .get(&notes.doc(&first).unwrap())
            .await
            .unwrap()
            .is_some());
    }
}
