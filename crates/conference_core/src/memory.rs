//! crates/conference_core/src/memory.rs
//!
//! In-memory `DocumentStore` implementation. Backs the test suite (no
//! database required) and mirrors the store contract exactly: atomic
//! commits, idempotent deletes, nested field-path queries.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::ports::{Collection, Document, DocumentStore, PortResult, WriteOp};

#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<(&'static str, String), Value>>,
    /// Op count of every commit, in order. Lets tests assert chunking.
    commits: Mutex<Vec<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one document, outside of any batch accounting.
    pub fn put(&self, collection: Collection, id: &str, data: Value) {
        self.docs
            .lock()
            .expect("memory store poisoned")
            .insert((collection.name(), id.to_string()), data);
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.docs
            .lock()
            .expect("memory store poisoned")
            .keys()
            .filter(|(name, _)| *name == collection.name())
            .count()
    }

    pub fn commit_sizes(&self) -> Vec<usize> {
        self.commits.lock().expect("memory store poisoned").clone()
    }
}

fn value_at<'a>(data: &'a Value, field_path: &[&str]) -> Option<&'a Value> {
    let mut current = data;
    for key in field_path {
        current = current.get(key)?;
    }
    Some(current)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> PortResult<Option<Document>> {
        let docs = self.docs.lock().expect("memory store poisoned");
        Ok(docs
            .get(&(collection.name(), id.to_string()))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn list(&self, collection: Collection) -> PortResult<Vec<Document>> {
        let docs = self.docs.lock().expect("memory store poisoned");
        Ok(docs
            .iter()
            .filter(|((name, _), _)| *name == collection.name())
            .map(|((_, id), data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn find_eq(
        &self,
        collection: Collection,
        field_path: &[&str],
        value: &Value,
    ) -> PortResult<Vec<Document>> {
        let docs = self.docs.lock().expect("memory store poisoned");
        Ok(docs
            .iter()
            .filter(|((name, _), data)| {
                *name == collection.name() && value_at(data, field_path) == Some(value)
            })
            .map(|((_, id), data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn find_array_contains(
        &self,
        collection: Collection,
        field_path: &[&str],
        value: &str,
    ) -> PortResult<Vec<Document>> {
        let docs = self.docs.lock().expect("memory store poisoned");
        Ok(docs
            .iter()
            .filter(|((name, _), data)| {
                *name == collection.name()
                    && value_at(data, field_path)
                        .and_then(Value::as_array)
                        .is_some_and(|entries| {
                            entries.iter().any(|entry| entry.as_str() == Some(value))
                        })
            })
            .map(|((_, id), data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> PortResult<()> {
        let mut docs = self.docs.lock().expect("memory store poisoned");
        self.commits
            .lock()
            .expect("memory store poisoned")
            .push(ops.len());
        for op in ops {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    data,
                } => {
                    docs.insert((collection.name(), id), data);
                }
                WriteOp::Delete { collection, id } => {
                    docs.remove(&(collection.name(), id));
                }
            }
        }
        Ok(())
    }

    fn allocate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn nested_field_queries_and_idempotent_deletes() {
        let store = MemoryStore::new();
        store.put(
            Collection::Session,
            "s1",
            json!({"conference": {"conferenceId": "c1"}}),
        );
        store.put(
            Collection::Session,
            "s2",
            json!({"conference": {"conferenceId": "c2"}}),
        );

        let hits = store
            .find_eq(
                Collection::Session,
                &["conference", "conferenceId"],
                &json!("c1"),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "s1");

        // Deleting a missing id must be a no-op, twice in a row.
        for _ in 0..2 {
            store
                .commit(vec![WriteOp::delete(Collection::Session, "ghost")])
                .await
                .unwrap();
        }
        assert_eq!(store.count(Collection::Session), 2);
    }

    #[tokio::test]
    async fn array_contains_matches_string_entries() {
        let store = MemoryStore::new();
        store.put(
            Collection::Person,
            "p1",
            json!({"speaker": {"submittedConferenceIds": ["c1", "c2"]}}),
        );
        let hits = store
            .find_array_contains(
                Collection::Person,
                &["speaker", "submittedConferenceIds"],
                "c2",
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        let none = store
            .find_array_contains(
                Collection::Person,
                &["speaker", "submittedConferenceIds"],
                "c3",
            )
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
