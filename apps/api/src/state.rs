use std::sync::Arc;

use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::llm_client::CompletionClient;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no per-user data; evaluation context travels with each request.
#[derive(Clone)]
pub struct AppState {
    pub llm: CompletionClient,
    /// Owns the extraction memo cache, the only state shared across requests.
    pub extractor: Arc<TextExtractor>,
    pub config: Config,
}
