//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use conference_core::authz::resolve_requester_email;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::state::AppState;

/// The requester identity resolved from the bearer credential, available to
/// handlers through request extensions.
#[derive(Debug, Clone)]
pub struct RequesterEmail(pub String);

/// Middleware that resolves the `Authorization` bearer credential to a
/// requester email before any conference-specific logic runs.
///
/// If valid, inserts the email into request extensions for handlers to use.
/// If absent or invalid, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let email = resolve_requester_email(state.tokens.as_ref(), authorization).await?;

    req.extensions_mut().insert(RequesterEmail(email));
    Ok(next.run(req).await)
}
