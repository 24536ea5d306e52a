use std::sync::Arc;

use crate::api_client::TrackerApi;
use crate::config::Config;
use crate::review::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Tracker backend. `HttpTrackerApi` in production, swappable in tests.
    pub api: Arc<dyn TrackerApi>,
    pub config: Config,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(api: Arc<dyn TrackerApi>, config: Config) -> Self {
        Self {
            api,
            config,
            sessions: SessionStore::new(),
        }
    }
}
