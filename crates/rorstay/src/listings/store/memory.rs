use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{
    Document, DocumentKey, PropertyStore, StoreError, StoreId, UpdateOutcome, DOMAIN_ID_FIELD,
    NATIVE_ID_FIELD,
};
use crate::listings::query::PropertyQuery;

/// Process-local store that keeps documents in insertion order.
#[derive(Debug, Default, Clone)]
pub struct MemoryPropertyStore {
    documents: Arc<Mutex<Vec<Document>>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryPropertyStore {
    fn documents(&self) -> MutexGuard<'_, Vec<Document>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> StoreId {
        let counter = self.sequence.fetch_add(1, Ordering::Relaxed);
        let timestamp = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        StoreId::from_parts(timestamp, counter)
    }

    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents().is_empty()
    }

    /// Copy of every stored document, including store-native ids.
    pub fn snapshot(&self) -> Vec<Document> {
        self.documents().clone()
    }
}

fn key_matches(document: &Document, key: &DocumentKey) -> bool {
    match key {
        DocumentKey::Domain(id) => {
            document.get(DOMAIN_ID_FIELD).and_then(Value::as_str) == Some(id.as_str())
        }
        DocumentKey::Native(id) => {
            document.get(NATIVE_ID_FIELD).and_then(Value::as_str) == Some(id.as_str())
        }
    }
}

#[async_trait]
impl PropertyStore for MemoryPropertyStore {
    async fn insert(&self, mut document: Document) -> Result<StoreId, StoreError> {
        let id = self.next_id();
        document.insert(
            NATIVE_ID_FIELD.to_string(),
            Value::String(id.as_str().to_string()),
        );
        self.documents().push(document);
        Ok(id)
    }

    async fn find_one(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        Ok(self
            .documents()
            .iter()
            .find(|document| key_matches(document, key))
            .cloned())
    }

    async fn find(&self, query: &PropertyQuery) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .documents()
            .iter()
            .filter(|document| query.matches(document))
            .take(query.limit())
            .cloned()
            .collect())
    }

    async fn update_one(
        &self,
        key: &DocumentKey,
        changes: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut documents = self.documents();
        let Some(document) = documents
            .iter_mut()
            .find(|document| key_matches(document, key))
        else {
            return Ok(UpdateOutcome::default());
        };

        let mut modified = false;
        for (field, value) in changes {
            if document.get(&field) != Some(&value) {
                document.insert(field, value);
                modified = true;
            }
        }

        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn delete_one(&self, key: &DocumentKey) -> Result<u64, StoreError> {
        let mut documents = self.documents();
        match documents
            .iter()
            .position(|document| key_matches(document, key))
        {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[tokio::test]
    async fn assigns_native_ids_and_finds_by_either_key() {
        let store = MemoryPropertyStore::default();
        let native = store
            .insert(document(json!({ "id": "domain-1", "agent_id": "a" })))
            .await
            .expect("insert succeeds");

        let by_domain = store
            .find_one(&DocumentKey::Domain("domain-1".to_string()))
            .await
            .expect("lookup succeeds")
            .expect("document present");
        assert_eq!(by_domain[NATIVE_ID_FIELD], json!(native.as_str()));

        let by_native = store
            .find_one(&DocumentKey::Native(native.clone()))
            .await
            .expect("lookup succeeds");
        assert_eq!(by_native, Some(by_domain));
    }

    #[tokio::test]
    async fn update_reports_matched_and_modified_counts() {
        let store = MemoryPropertyStore::default();
        store
            .insert(document(json!({ "id": "d", "price": 10 })))
            .await
            .expect("insert succeeds");
        let key = DocumentKey::Domain("d".to_string());

        let unchanged = store
            .update_one(&key, document(json!({ "price": 10 })))
            .await
            .expect("update runs");
        assert_eq!(unchanged, UpdateOutcome { matched: 1, modified: 0 });

        let changed = store
            .update_one(&key, document(json!({ "price": 12 })))
            .await
            .expect("update runs");
        assert_eq!(changed, UpdateOutcome { matched: 1, modified: 1 });

        let missing = store
            .update_one(&DocumentKey::Domain("x".to_string()), Document::new())
            .await
            .expect("update runs");
        assert_eq!(missing.matched, 0);
    }

    #[tokio::test]
    async fn find_preserves_insertion_order_and_limit() {
        let store = MemoryPropertyStore::default();
        for index in 0..3 {
            store
                .insert(document(json!({ "id": format!("d{index}"), "agent_id": "a" })))
                .await
                .expect("insert succeeds");
        }
        let found = store
            .find(&PropertyQuery::owned_by("a"))
            .await
            .expect("find succeeds");
        let ids: Vec<_> = found.iter().map(|doc| doc["id"].clone()).collect();
        assert_eq!(ids, vec![json!("d0"), json!("d1"), json!("d2")]);
    }

    #[tokio::test]
    async fn delete_removes_single_document() {
        let store = MemoryPropertyStore::default();
        store
            .insert(document(json!({ "id": "d" })))
            .await
            .expect("insert succeeds");
        let key = DocumentKey::Domain("d".to_string());
        assert_eq!(store.delete_one(&key).await.expect("delete runs"), 1);
        assert_eq!(store.delete_one(&key).await.expect("delete runs"), 0);
        assert!(store.is_empty());
    }
}
