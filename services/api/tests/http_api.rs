//! HTTP integration tests.
//!
//! Drive the complete request flow (router -> middleware -> handlers ->
//! orchestrators) against the in-memory document store; no database or
//! network required.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use api_lib::adapters::StoreTokenVerifier;
use api_lib::config::Config;
use api_lib::web::{api_router, state::AppState};
use conference_core::memory::MemoryStore;
use conference_core::ports::{Collection, DocumentStore};

const ORGANIZER_TOKEN: &str = "organizer-token";
const STRANGER_TOKEN: &str = "stranger-token";

fn test_config() -> Config {
    use std::str::FromStr;
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        allowed_origin: "http://localhost:4200".to_string(),
        dashboard_sweep_enabled: false,
        dashboard_sweep_schedule: cron::Schedule::from_str("0 0 3 * * *").unwrap(),
        dashboard_sweep_timezone: chrono_tz::Tz::Europe__Paris,
        dashboard_sweep_budget_secs: 540,
    }
}

fn test_state() -> (axum::Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.put(
        Collection::AccessToken,
        ORGANIZER_TOKEN,
        json!({"email": "orga@devcon.io"}),
    );
    store.put(
        Collection::AccessToken,
        STRANGER_TOKEN,
        json!({"email": "stranger@example.org"}),
    );
    store.put(
        Collection::Conference,
        "c1",
        json!({
            "id": "c1",
            "name": "DevCon",
            "edition": 5,
            "organizerEmails": ["orga@devcon.io"],
            "days": [
                {"id": "d1", "dayIndex": 0, "date": "2024-01-10",
                 "slots": [{"id": "sl1", "roomId": "r1"}], "disabledRoomIds": []},
            ],
            "rooms": [{"id": "r1", "name": "Main"}],
            "tracks": [],
            "sessionTypes": [{"id": "talk", "name": "Talk"}],
        }),
    );
    store.put(
        Collection::Session,
        "s1",
        json!({"id": "s1", "speaker1Id": "p1",
               "conference": {"conferenceId": "c1", "status": "SUBMITTED", "sessionTypeId": "talk"}}),
    );

    let app_state = Arc::new(AppState {
        store: store.clone() as Arc<dyn DocumentStore>,
        tokens: Arc::new(StoreTokenVerifier::new(
            store.clone() as Arc<dyn DocumentStore>
        )),
        config: Arc::new(test_config()),
    });
    (api_router(app_state), store)
}

fn post_request(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requests_without_a_credential_are_rejected_first() {
    let (router, _) = test_state();
    let response = router
        .oneshot(post_request(
            "/conference/delete",
            None,
            json!({"conferenceId": "c1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_post_methods_are_rejected_before_processing() {
    let (router, _) = test_state();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/conference/duplicate")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn non_organizers_are_forbidden() {
    let (router, _) = test_state();
    let response = router
        .oneshot(post_request(
            "/conference/delete",
            Some(STRANGER_TOKEN),
            json!({"conferenceId": "c1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_conference_id_is_a_bad_request() {
    let (router, _) = test_state();
    let response = router
        .oneshot(post_request(
            "/conference/refresh-dashboard",
            Some(ORGANIZER_TOKEN),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_conference_is_not_found() {
    let (router, _) = test_state();
    let response = router
        .oneshot(post_request(
            "/conference/delete",
            Some(ORGANIZER_TOKEN),
            json!({"conferenceId": "ghost"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_clones_and_reports() {
    let (router, store) = test_state();
    let response = router
        .oneshot(post_request(
            "/conference/duplicate",
            Some(ORGANIZER_TOKEN),
            json!({
                "conferenceId": "c1",
                "name": "DevCon",
                "edition": 6,
                "startDate": "2024-03-01",
                "duplicateRooms": true,
                "duplicateTracks": true,
                "duplicatePlanningStructure": true,
                "duplicateActivities": true,
                "duplicateSponsors": false,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let new_id = body["report"]["conferenceId"].as_str().unwrap().to_string();
    assert!(!new_id.is_empty());
    assert_eq!(body["report"]["activitiesCreated"], 0);

    let clone = store
        .get(Collection::Conference, &new_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(clone.data["edition"], 6);
    assert_eq!(clone.data["days"][0]["date"], "2024-03-01");
}

#[tokio::test]
async fn duplicate_conflicts_on_existing_name_and_edition() {
    let (router, _) = test_state();
    let response = router
        .oneshot(post_request(
            "/conference/duplicate",
            Some(ORGANIZER_TOKEN),
            json!({
                "conferenceId": "c1",
                "name": "DevCon",
                "edition": 5,
                "startDate": "2024-03-01",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn duplicate_rejects_planning_structure_without_rooms() {
    let (router, _) = test_state();
    let response = router
        .oneshot(post_request(
            "/conference/duplicate",
            Some(ORGANIZER_TOKEN),
            json!({
                "conferenceId": "c1",
                "name": "DevCon",
                "edition": 6,
                "startDate": "2024-03-01",
                "duplicatePlanningStructure": true,
                "duplicateRooms": false,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_reports_counts_then_the_conference_is_gone() {
    let (router, store) = test_state();
    let response = router
        .clone()
        .oneshot(post_request(
            "/conference/delete",
            Some(ORGANIZER_TOKEN),
            json!({"conferenceId": "c1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["report"]["conferenceDeleted"], 1);
    assert_eq!(body["report"]["sessionsDeleted"], 1);
    assert!(store
        .get(Collection::Conference, "c1")
        .await
        .unwrap()
        .is_none());

    // The authorization gate reports the conference as gone on a re-run.
    let rerun = router
        .oneshot(post_request(
            "/conference/delete",
            Some(ORGANIZER_TOKEN),
            json!({"conferenceId": "c1"}),
        ))
        .await
        .unwrap();
    assert_eq!(rerun.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_dashboard_returns_the_snapshot() {
    let (router, store) = test_state();
    let response = router
        .oneshot(post_request(
            "/conference/refresh-dashboard",
            Some(ORGANIZER_TOKEN),
            json!({"conferenceId": "c1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(!body["report"]["historyId"].as_str().unwrap().is_empty());
    assert_eq!(body["report"]["dashboard"]["submitted"]["total"], 1);
    assert_eq!(body["report"]["dashboard"]["trigger"], "MANUAL_REFRESH");
    assert_eq!(store.count(Collection::ConferenceDashboard), 1);
    assert_eq!(store.count(Collection::ConferenceDashboardHistory), 1);
}

#[tokio::test]
async fn export_streams_an_attachment_named_after_the_conference() {
    let (router, store) = test_state();
    store.put(
        Collection::PublicationConfig,
        "c1",
        json!({"timezone": "Europe/Brussels", "keywords": ["java"]}),
    );

    let response = router
        .oneshot(post_request(
            "/conference/export-descriptor",
            Some(ORGANIZER_TOKEN),
            json!({"conferenceId": "c1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"publication-c1.json\"");

    let body = body_json(response).await;
    assert_eq!(body["title"], "DevCon 5");
    assert_eq!(body["timezone"], "Europe/Brussels");
}

#[tokio::test]
async fn export_without_publication_config_is_a_bad_request() {
    let (router, _) = test_state();
    let response = router
        .oneshot(post_request(
            "/conference/export-descriptor",
            Some(ORGANIZER_TOKEN),
            json!({"conferenceId": "c1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
