//! Shared application state for the UI server.

use std::sync::Arc;

use nexus::engine::Engine;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The engine owning the session; the run controller drives its cycles.
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}
