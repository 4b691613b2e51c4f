//! crates/conference_core/src/batch.rs
//!
//! Chunked create/delete against the document store, honoring the store's
//! maximum-operations-per-atomic-commit limit. Chunks commit sequentially;
//! a later chunk's failure never rolls back earlier chunks.

use serde_json::Value;
use tracing::debug;

use crate::ports::{Collection, DocumentStore, PortResult, WriteOp};

/// Safe upper bound of ops per atomic store commit.
pub const MAX_BATCH_OPS: usize = 450;

/// Recursively removes null-valued object entries before a write.
///
/// Optional-absent fields that escape `skip_serializing_if` arrive here as
/// nulls; the target format treats absence as "field omitted", so they are
/// stripped at this boundary rather than per call site. Array elements are
/// left alone (a null element is data, not an absent field).
pub fn strip_absent(value: Value) -> Value {
    match value {
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, entry)| (key, strip_absent(entry)))
                .filter(|(_, entry)| !entry.is_null())
                .collect(),
        ),
        Value::Array(entries) => Value::Array(entries.into_iter().map(strip_absent).collect()),
        other => other,
    }
}

/// Executes write plans in sequential chunks of at most [`MAX_BATCH_OPS`]
/// operations each.
pub struct BatchedMutator<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> BatchedMutator<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Deletes every id; missing ids are no-ops. Returns the id count.
    pub async fn delete_ids(&self, collection: Collection, ids: Vec<String>) -> PortResult<u64> {
        let groups = ids
            .into_iter()
            .map(|id| vec![WriteOp::delete(collection, id)])
            .collect();
        self.commit_grouped(groups).await
    }

    /// Upserts every `(id, payload)` pair, stripping absent fields from each
    /// payload first. Returns the document count.
    pub async fn upsert(
        &self,
        collection: Collection,
        docs: Vec<(String, Value)>,
    ) -> PortResult<u64> {
        let groups = docs
            .into_iter()
            .map(|(id, data)| vec![WriteOp::set(collection, id, strip_absent(data))])
            .collect();
        self.commit_grouped(groups).await
    }

    /// Commits op groups in chunks of whole groups, never exceeding
    /// [`MAX_BATCH_OPS`] ops per chunk. A group's ops always land in the
    /// same atomic commit (e.g. a person delete with its email-index
    /// delete). Returns the number of groups committed.
    pub async fn commit_grouped(&self, groups: Vec<Vec<WriteOp>>) -> PortResult<u64> {
        let total = groups.len() as u64;
        let mut chunk: Vec<WriteOp> = Vec::new();
        for group in groups {
            if !chunk.is_empty() && chunk.len() + group.len() > MAX_BATCH_OPS {
                let ops = std::mem::take(&mut chunk);
                debug!(ops = ops.len(), "committing batch chunk");
                self.store.commit(ops).await?;
            }
            chunk.extend(group);
        }
        if !chunk.is_empty() {
            debug!(ops = chunk.len(), "committing batch chunk");
            self.store.commit(chunk).await?;
        }
        Ok(total)
    }
}
