//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the conference lifecycle endpoints and
//! the master definition for the OpenAPI specification. Every endpoint is
//! method-locked to POST and sits behind the bearer-auth middleware.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use conference_core::domain::{DuplicateOptions, DuplicateRequest};
use conference_core::{authz, dashboard, delete, descriptor, duplicate, LifecycleError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::error::ApiError;
use crate::web::middleware::RequesterEmail;
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        delete_conference_handler,
        duplicate_conference_handler,
        refresh_dashboard_handler,
        export_descriptor_handler,
    ),
    components(schemas(
        ConferenceIdRequest,
        DuplicateConferenceRequest,
        DeleteConferenceResponse,
        DuplicateConferenceResponse,
        RefreshDashboardResponse,
    )),
    tags(
        (name = "Conference Lifecycle", description = "Duplicate, delete and dashboard operations for conference organizers.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceIdRequest {
    #[serde(default)]
    pub conference_id: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateConferenceRequest {
    #[serde(default)]
    pub conference_id: String,
    /// Name of the new conference.
    #[serde(default)]
    pub name: String,
    /// Edition number of the new conference.
    #[serde(default)]
    pub edition: Option<i64>,
    /// New conference first day in `YYYY-MM-DD` format.
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub duplicate_rooms: bool,
    #[serde(default)]
    pub duplicate_tracks: bool,
    #[serde(default)]
    pub duplicate_planning_structure: bool,
    #[serde(default)]
    pub duplicate_activities: bool,
    #[serde(default)]
    pub duplicate_sponsors: bool,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteConferenceResponse {
    #[schema(value_type = Object)]
    pub report: conference_core::DeleteReport,
}

#[derive(Serialize, ToSchema)]
pub struct DuplicateConferenceResponse {
    #[schema(value_type = Object)]
    pub report: conference_core::DuplicateReport,
}

#[derive(Serialize, ToSchema)]
pub struct RefreshDashboardResponse {
    #[schema(value_type = Object)]
    pub report: conference_core::DashboardReport,
}

fn parse_conference_id(raw: &str) -> Result<String, ApiError> {
    let conference_id = raw.trim().to_string();
    if conference_id.is_empty() {
        return Err(LifecycleError::validation("Missing conferenceId").into());
    }
    Ok(conference_id)
}

fn log_failure(operation: &str, conference_id: &str, requester_email: &str, err: &ApiError) {
    error!(
        operation,
        conference_id,
        requester_email,
        %err,
        "operation failed"
    );
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Irrevocably delete a conference and every dependent record.
///
/// Dependents are removed first, the conference document strictly last.
/// Safe to retry; organizer only.
#[utoipa::path(
    post,
    path = "/conference/delete",
    request_body = ConferenceIdRequest,
    responses(
        (status = 200, description = "Cascade completed", body = DeleteConferenceResponse),
        (status = 400, description = "Missing conferenceId"),
        (status = 401, description = "Missing or invalid bearer credential"),
        (status = 403, description = "Requester is not an organizer"),
        (status = 404, description = "Conference not found"),
        (status = 500, description = "Cascade failed part-way; re-run to finish")
    )
)]
pub async fn delete_conference_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequesterEmail(requester_email)): Extension<RequesterEmail>,
    Json(request): Json<ConferenceIdRequest>,
) -> Result<Json<DeleteConferenceResponse>, ApiError> {
    let conference_id = parse_conference_id(&request.conference_id)?;
    info!(%conference_id, %requester_email, "deleteConference requested");

    let result = async {
        authz::ensure_requester_is_organizer(state.store.as_ref(), &conference_id, &requester_email)
            .await?;
        delete::delete_conference(state.store.as_ref(), &conference_id).await
    }
    .await;

    match result {
        Ok(report) => {
            info!(%conference_id, %requester_email, "deleteConference completed");
            Ok(Json(DeleteConferenceResponse { report }))
        }
        Err(err) => {
            let err = ApiError::from(err);
            log_failure("deleteConference", &conference_id, &requester_email, &err);
            Err(err)
        }
    }
}

/// Create a full clone of a conference under a new name, edition and start
/// date.
///
/// Not idempotent: retrying creates a second clone. Organizer only.
#[utoipa::path(
    post,
    path = "/conference/duplicate",
    request_body = DuplicateConferenceRequest,
    responses(
        (status = 200, description = "Clone created", body = DuplicateConferenceResponse),
        (status = 400, description = "Missing/invalid field, or planning structure without rooms"),
        (status = 401, description = "Missing or invalid bearer credential"),
        (status = 403, description = "Requester is not an organizer"),
        (status = 404, description = "Source conference not found"),
        (status = 409, description = "Conference name and edition already exist"),
        (status = 500, description = "Clone failed part-way; the new conference may exist with partial dependents")
    )
)]
pub async fn duplicate_conference_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequesterEmail(requester_email)): Extension<RequesterEmail>,
    Json(request): Json<DuplicateConferenceRequest>,
) -> Result<Json<DuplicateConferenceResponse>, ApiError> {
    let conference_id = parse_conference_id(&request.conference_id)?;
    info!(
        %conference_id,
        %requester_email,
        target_name = %request.name,
        target_edition = ?request.edition,
        "duplicateConference requested"
    );

    let edition = request
        .edition
        .ok_or_else(|| LifecycleError::validation("Missing conference edition"))?;
    let core_request = DuplicateRequest {
        name: request.name.clone(),
        edition,
        start_date: request.start_date.clone(),
        options: DuplicateOptions {
            rooms: request.duplicate_rooms,
            tracks: request.duplicate_tracks,
            planning_structure: request.duplicate_planning_structure,
            activities: request.duplicate_activities,
            sponsors: request.duplicate_sponsors,
        },
    };

    let result = async {
        let authorized = authz::ensure_requester_is_organizer(
            state.store.as_ref(),
            &conference_id,
            &requester_email,
        )
        .await?;
        duplicate::duplicate_conference(state.store.as_ref(), &authorized.document, &core_request)
            .await
    }
    .await;

    match result {
        Ok(report) => {
            info!(
                %conference_id,
                %requester_email,
                new_conference_id = %report.conference_id,
                "duplicateConference completed"
            );
            Ok(Json(DuplicateConferenceResponse { report }))
        }
        Err(err) => {
            let err = ApiError::from(err);
            log_failure("duplicateConference", &conference_id, &requester_email, &err);
            Err(err)
        }
    }
}

/// Recompute the conference dashboard snapshot on demand.
///
/// Overwrites the dashboard document and appends an immutable history
/// entry. Safe to retry; organizer only.
#[utoipa::path(
    post,
    path = "/conference/refresh-dashboard",
    request_body = ConferenceIdRequest,
    responses(
        (status = 200, description = "Dashboard recomputed", body = RefreshDashboardResponse),
        (status = 400, description = "Missing conferenceId"),
        (status = 401, description = "Missing or invalid bearer credential"),
        (status = 403, description = "Requester is not an organizer"),
        (status = 404, description = "Conference not found"),
        (status = 500, description = "Recompute failed")
    )
)]
pub async fn refresh_dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequesterEmail(requester_email)): Extension<RequesterEmail>,
    Json(request): Json<ConferenceIdRequest>,
) -> Result<Json<RefreshDashboardResponse>, ApiError> {
    let conference_id = parse_conference_id(&request.conference_id)?;
    info!(%conference_id, %requester_email, "refreshConferenceDashboard requested");

    let result = async {
        let authorized = authz::ensure_requester_is_organizer(
            state.store.as_ref(),
            &conference_id,
            &requester_email,
        )
        .await?;
        dashboard::recompute_and_persist(
            state.store.as_ref(),
            &authorized.document,
            conference_core::DashboardTrigger::ManualRefresh,
            Utc::now(),
        )
        .await
    }
    .await;

    match result {
        Ok(report) => {
            info!(
                %conference_id,
                %requester_email,
                history_id = %report.history_id,
                "refreshConferenceDashboard completed"
            );
            Ok(Json(RefreshDashboardResponse { report }))
        }
        Err(err) => {
            let err = ApiError::from(err);
            log_failure(
                "refreshConferenceDashboard",
                &conference_id,
                &requester_email,
                &err,
            );
            Err(err)
        }
    }
}

/// Download the external publication event descriptor for a conference.
///
/// Streams the descriptor JSON as an attachment named after the conference
/// id. Fails with 400 when the conference has no publication config.
#[utoipa::path(
    post,
    path = "/conference/export-descriptor",
    request_body = ConferenceIdRequest,
    responses(
        (status = 200, description = "Descriptor attachment", body = String, content_type = "application/json"),
        (status = 400, description = "Missing conferenceId or no publication config"),
        (status = 401, description = "Missing or invalid bearer credential"),
        (status = 403, description = "Requester is not an organizer"),
        (status = 404, description = "Conference not found"),
        (status = 500, description = "Descriptor generation failed")
    )
)]
pub async fn export_descriptor_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequesterEmail(requester_email)): Extension<RequesterEmail>,
    Json(request): Json<ConferenceIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conference_id = parse_conference_id(&request.conference_id)?;
    info!(%conference_id, %requester_email, "exportDescriptor requested");

    let result = async {
        let authorized = authz::ensure_requester_is_organizer(
            state.store.as_ref(),
            &conference_id,
            &requester_email,
        )
        .await?;
        descriptor::generate_publication_descriptor(state.store.as_ref(), &authorized.document)
            .await
    }
    .await;

    match result {
        Ok(descriptor) => {
            let payload = serde_json::to_string_pretty(&descriptor)
                .map_err(|err| ApiError::Internal(err.to_string()))?;
            info!(
                %conference_id,
                %requester_email,
                payload_size = payload.len(),
                "exportDescriptor completed"
            );
            Ok((
                StatusCode::OK,
                [
                    (
                        header::CONTENT_TYPE,
                        "application/json; charset=utf-8".to_string(),
                    ),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"publication-{conference_id}.json\""),
                    ),
                ],
                payload,
            ))
        }
        Err(err) => {
            let err = ApiError::from(err);
            log_failure("exportDescriptor", &conference_id, &requester_email, &err);
            Err(err)
        }
    }
}
