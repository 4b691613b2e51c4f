//! services/api/src/adapters/store.rs
//!
//! This module contains the document store adapter, the concrete
//! implementation of the `DocumentStore` port from the `core` crate. All
//! collections share a single `documents` table keyed by `(collection, id)`
//! with the payload in a JSONB column; nested field-path queries map onto
//! the `#>` operator, batch commits onto one transaction.

use async_trait::async_trait;
use conference_core::ports::{
    Collection, Document, DocumentStore, PortError, PortResult, WriteOp,
};
use serde_json::{json, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// A Postgres adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(err: sqlx::Error) -> PortError {
    PortError::Unexpected(err.to_string())
}

fn path_vec(field_path: &[&str]) -> Vec<String> {
    field_path.iter().map(|key| key.to_string()).collect()
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> PortResult<Option<Document>> {
        let row = sqlx::query("SELECT data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(row.map(|row| Document {
            id: id.to_string(),
            data: row.get::<Value, _>("data"),
        }))
    }

    async fn list(&self, collection: Collection) -> PortResult<Vec<Document>> {
        let rows = sqlx::query("SELECT id, data FROM documents WHERE collection = $1 ORDER BY id")
            .bind(collection.name())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(rows
            .into_iter()
            .map(|row| Document {
                id: row.get("id"),
                data: row.get::<Value, _>("data"),
            })
            .collect())
    }

    async fn find_eq(
        &self,
        collection: Collection,
        field_path: &[&str],
        value: &Value,
    ) -> PortResult<Vec<Document>> {
        // A missing path yields SQL NULL, which never compares equal.
        let rows = sqlx::query(
            "SELECT id, data FROM documents \
             WHERE collection = $1 AND data #> $2 = $3 ORDER BY id",
        )
        .bind(collection.name())
        .bind(path_vec(field_path))
        .bind(value)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows
            .into_iter()
            .map(|row| Document {
                id: row.get("id"),
                data: row.get::<Value, _>("data"),
            })
            .collect())
    }

    async fn find_array_contains(
        &self,
        collection: Collection,
        field_path: &[&str],
        value: &str,
    ) -> PortResult<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT id, data FROM documents \
             WHERE collection = $1 AND data #> $2 @> $3 ORDER BY id",
        )
        .bind(collection.name())
        .bind(path_vec(field_path))
        .bind(json!([value]))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows
            .into_iter()
            .map(|row| Document {
                id: row.get("id"),
                data: row.get::<Value, _>("data"),
            })
            .collect())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        for op in ops {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    data,
                } => {
                    sqlx::query(
                        "INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3) \
                         ON CONFLICT (collection, id) \
                         DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
                    )
                    .bind(collection.name())
                    .bind(id)
                    .bind(data)
                    .execute(&mut *tx)
                    .await
                    .map_err(unexpected)?;
                }
                WriteOp::Delete { collection, id } => {
                    // Deleting a missing id is a no-op by contract.
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection.name())
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(unexpected)?;
                }
            }
        }
        tx.commit().await.map_err(unexpected)
    }

    fn allocate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
