//! services/api/src/adapters/tokens.rs
//!
//! Bearer-credential resolution: the concrete `TokenVerifier` port
//! implementation, backed by the `access-token` collection. Provisioning of
//! tokens belongs to the identity provider and is out of scope here; this
//! adapter only answers "which email does this credential belong to".

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conference_core::ports::{Collection, DocumentStore, PortResult, TokenVerifier};
use serde::Deserialize;
use tracing::debug;

pub struct StoreTokenVerifier {
    store: Arc<dyn DocumentStore>,
}

impl StoreTokenVerifier {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

/// Stored shape of one access-token document, keyed by the opaque token.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenRecord {
    #[serde(default)]
    email: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl TokenVerifier for StoreTokenVerifier {
    async fn resolve_email(&self, bearer_token: &str) -> PortResult<Option<String>> {
        let Some(doc) = self.store.get(Collection::AccessToken, bearer_token).await? else {
            return Ok(None);
        };
        let record: AccessTokenRecord = match serde_json::from_value(doc.data) {
            Ok(record) => record,
            Err(err) => {
                debug!(%err, "unreadable access-token document");
                return Ok(None);
            }
        };
        if record
            .expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now())
        {
            return Ok(None);
        }
        let email = record.email.trim().to_string();
        Ok((!email.is_empty()).then_some(email))
    }
}
