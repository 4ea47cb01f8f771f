use std::sync::Arc;

use parsepro_core::{BatchProcessor, GeminiClient};

/// Shared application state: one stateless processor reused across
/// requests. Concurrent batches share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<BatchProcessor>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        let client = Arc::new(GeminiClient::new());
        Self {
            processor: Arc::new(BatchProcessor::new(client)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
