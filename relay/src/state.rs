//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::provider::ChatProvider;

/// Shared application state passed to all handlers.
///
/// Read-only after startup.
pub struct AppState {
    pub config: Config,
    pub provider: Arc<dyn ChatProvider>,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn ChatProvider>) -> Self {
        Self { config, provider }
    }
}
