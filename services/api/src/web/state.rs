//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use citizen_registry_core::ports::{CitizenStore, PhotoStorage};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CitizenStore>,
    pub photos: Arc<dyn PhotoStorage>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Public URL of a stored photo, derived from the configured base URL.
    pub fn photo_url(&self, stored_file_name: &str) -> String {
        format!(
            "{}/{}",
            self.config.photo_base_url.trim_end_matches('/'),
            stored_file_name
        )
    }
}
