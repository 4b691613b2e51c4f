//! crates/conference_core/src/descriptor.rs
//!
//! Assembles the external publication event descriptor for a conference:
//! the JSON document a Voxxrin-style publication platform consumes. Pure
//! projection of the conference aggregate plus its publication config;
//! empty optional fields are omitted from the output.

use serde_json::{json, Map, Value};
use tracing::info;

use crate::candidates::find_config_by_conference_id;
use crate::domain::{Conference, PublicationConfig};
use crate::error::LifecycleError;
use crate::ports::{Collection, Document, DocumentStore};

/// Builds the descriptor for `conference_doc`. Fails with `MissingConfig`
/// when the conference has no publication config under either storage
/// convention.
pub async fn generate_publication_descriptor(
    store: &dyn DocumentStore,
    conference_doc: &Document,
) -> Result<Value, LifecycleError> {
    let conference: Conference = serde_json::from_value(conference_doc.data.clone())
        .map_err(|err| LifecycleError::corrupt("conference", err))?;

    let config_doc =
        find_config_by_conference_id(store, Collection::PublicationConfig, &conference_doc.id)
            .await?
            .ok_or(LifecycleError::MissingConfig("Publication config"))?;
    let config: PublicationConfig = serde_json::from_value(config_doc.data)
        .map_err(|err| LifecycleError::corrupt("publication config", err))?;

    let descriptor = build_descriptor(&conference, &config);
    info!(
        conference_id = %conference_doc.id,
        config_doc_id = %config_doc.id,
        "publication descriptor generated"
    );
    Ok(descriptor)
}

fn build_descriptor(conference: &Conference, config: &PublicationConfig) -> Value {
    let title = format!("{} {}", conference.name.trim(), conference.edition);
    let days: Vec<Value> = conference
        .days
        .iter()
        .enumerate()
        .map(|(i, day)| {
            json!({
                "id": day.id.clone().unwrap_or_else(|| format!("d{}", i + 1)),
                "localDate": day.date,
            })
        })
        .collect();

    let mut descriptor = Map::new();
    insert_clean(&mut descriptor, "eventFamily", config.event_family.as_deref());
    descriptor.insert("title".to_string(), json!(title));
    descriptor.insert("headingTitle".to_string(), json!(title));
    insert_clean(
        &mut descriptor,
        "headingSubTitle",
        config.heading_sub_title.as_deref(),
    );
    descriptor.insert(
        "timezone".to_string(),
        json!(clean(config.timezone.as_deref()).unwrap_or_else(|| "UTC".to_string())),
    );
    insert_clean(&mut descriptor, "websiteUrl", config.website_url.as_deref());
    insert_clean(&mut descriptor, "ticketsUrl", config.tickets_url.as_deref());
    if !config.keywords.is_empty() {
        descriptor.insert("keywords".to_string(), json!(config.keywords));
    }
    if let Some(location) = &config.location {
        descriptor.insert("location".to_string(), location.clone());
    }
    if let Some(first) = days.first() {
        descriptor.insert("start".to_string(), first["localDate"].clone());
    }
    if let Some(last) = days.last() {
        descriptor.insert("end".to_string(), last["localDate"].clone());
    }
    descriptor.insert("days".to_string(), json!(days));
    Value::Object(descriptor)
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn insert_clean(descriptor: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = clean(value) {
        descriptor.insert(key.to_string(), json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn descriptor_projects_conference_and_config() {
        let store = MemoryStore::new();
        store.put(
            Collection::Conference,
            "c1",
            json!({"id": "c1", "name": " DevCon ", "edition": 5,
                   "days": [
                       {"id": "monday", "dayIndex": 0, "date": "2024-03-01"},
                       {"dayIndex": 1, "date": "2024-03-02"},
                   ]}),
        );
        store.put(
            Collection::PublicationConfig,
            "c1",
            json!({"eventFamily": "devcon", "timezone": "Europe/Brussels",
                   "keywords": ["java", "cloud"], "websiteUrl": "  ",
                   "location": {"country": "Belgium", "city": "Antwerp"}}),
        );
        let doc = store.get(Collection::Conference, "c1").await.unwrap().unwrap();

        let descriptor = generate_publication_descriptor(&store, &doc).await.unwrap();

        assert_eq!(descriptor["title"], "DevCon 5");
        assert_eq!(descriptor["timezone"], "Europe/Brussels");
        assert_eq!(descriptor["start"], "2024-03-01");
        assert_eq!(descriptor["end"], "2024-03-02");
        assert_eq!(descriptor["days"][1]["id"], "d2");
        assert_eq!(descriptor["location"]["city"], "Antwerp");
        // Blank optionals are omitted, not emitted as empty strings.
        assert!(descriptor.get("websiteUrl").is_none());
        assert!(descriptor.get("headingSubTitle").is_none());
    }

    #[tokio::test]
    async fn missing_config_is_a_client_error() {
        let store = MemoryStore::new();
        store.put(
            Collection::Conference,
            "c1",
            json!({"id": "c1", "name": "DevCon", "edition": 5, "days": []}),
        );
        let doc = store.get(Collection::Conference, "c1").await.unwrap().unwrap();

        let err = generate_publication_descriptor(&store, &doc).await.unwrap_err();
        assert!(matches!(err, LifecycleError::MissingConfig(_)));
    }

    #[tokio::test]
    async fn timezone_defaults_to_utc() {
        let store = MemoryStore::new();
        store.put(
            Collection::Conference,
            "c1",
            json!({"id": "c1", "name": "DevCon", "edition": 5, "days": []}),
        );
        store.put(Collection::PublicationConfig, "c1", json!({}));
        let doc = store.get(Collection::Conference, "c1").await.unwrap().unwrap();

        let descriptor = generate_publication_descriptor(&store, &doc).await.unwrap();
        assert_eq!(descriptor["timezone"], "UTC");
    }
}
