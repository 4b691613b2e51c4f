//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use conference_core::ports::{DocumentStore, TokenVerifier};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tokens: Arc<dyn TokenVerifier>,
    pub config: Arc<Config>,
}
