//! crates/conference_core/src/platform.rs
//!
//! Access to the single, well-known platform policy document. All reads and
//! merge-writes of the singleton go through here instead of scattering the
//! document id across orchestrators.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::domain::PlatformConfig;
use crate::ports::{Collection, DocumentStore, PortError, PortResult, WriteOp};

/// Well-known document id of the platform policy singleton.
pub const PLATFORM_CONFIG_DOC_ID: &str = "PlatformConfig";

pub struct PlatformConfigService<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> PlatformConfigService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> PortResult<Option<PlatformConfig>> {
        let Some(doc) = self
            .store
            .get(Collection::PlatformConfig, PLATFORM_CONFIG_DOC_ID)
            .await?
        else {
            return Ok(None);
        };
        serde_json::from_value(doc.data)
            .map(Some)
            .map_err(|err| PortError::Unexpected(format!("malformed platform config: {err}")))
    }

    /// Repoints the single-conference-mode pointer from `source_id` to
    /// `target_id` when the mode is active and currently targets the source.
    /// Merge-write: every other field of the singleton is preserved.
    /// Returns whether a switch happened.
    pub async fn switch_single_conference(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> PortResult<bool> {
        let Some(doc) = self
            .store
            .get(Collection::PlatformConfig, PLATFORM_CONFIG_DOC_ID)
            .await?
        else {
            info!("platform config not found, single-conference switch skipped");
            return Ok(false);
        };

        let restricted = doc
            .data
            .get("onlyPlatformAdminCanCreateConference")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let current_pointer = doc
            .data
            .get("singleConferenceId")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();
        if !restricted || current_pointer != source_id {
            info!(
                single_conference_id = %current_pointer,
                restricted, "single-conference switch not needed"
            );
            return Ok(false);
        }

        let mut merged = doc.data;
        if let Some(entries) = merged.as_object_mut() {
            entries.insert("id".to_string(), json!(PLATFORM_CONFIG_DOC_ID));
            entries.insert("singleConferenceId".to_string(), json!(target_id));
            entries.insert(
                "lastUpdated".to_string(),
                json!(Utc::now().timestamp_millis().to_string()),
            );
        }
        self.store
            .commit(vec![WriteOp::set(
                Collection::PlatformConfig,
                PLATFORM_CONFIG_DOC_ID,
                merged,
            )])
            .await?;

        info!(source_id, target_id, "single-conference pointer switched");
        Ok(true)
    }
}
