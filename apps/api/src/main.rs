mod config;
mod errors;
mod evaluation;
mod extraction;
mod llm_client;
mod render;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::ocr::TesseractOcr;
use crate::extraction::TextExtractor;
use crate::llm_client::{CompletionClient, GeminiClient};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing API key)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let gemini = GeminiClient::new(config.google_api_key.clone(), config.gemini_model.clone())?;
    info!("LLM client initialized (model: {})", gemini.model());
    let retry_policy = config.retry_policy();
    info!(
        "Completion retry policy: {} attempt(s), {}s backoff",
        retry_policy.max_attempts,
        retry_policy.backoff.as_secs()
    );
    let llm = CompletionClient::new(Arc::new(gemini), retry_policy);

    // Initialize text extraction (OCR fallback needs tesseract + pdftoppm on PATH)
    let ocr = TesseractOcr::new(config.tesseract_lang.clone());
    if !ocr.is_available() {
        warn!("tesseract or pdftoppm not found; scanned resumes cannot be read");
    }
    let extractor = Arc::new(TextExtractor::new(
        Arc::new(ocr),
        config.extraction_cache_capacity,
    ));

    let state = AppState {
        llm,
        extractor,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
