pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod share;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServerConfig};
use crate::core_state::CoreState;
use crate::pipeline::extraction::{AnthropicClient, ExtractionClient, ExtractionError};
use crate::share::{start_sweeper, ShareError, ShareStore};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Share store error: {0}")]
    Share(#[from] ShareError),

    #[error("Extraction client error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Server error: {0}")]
    Server(String),
}

/// Binary entry point: serve until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        version = config::APP_VERSION,
        db = %config.db_path.display(),
        "Starting {}",
        config::APP_NAME
    );

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = Arc::new(ShareStore::open(&config.db_path)?);

    // The blocking HTTP client must be built (and finally dropped)
    // outside the async runtime.
    let extractor = build_extractor(&config)?;

    let mut core = CoreState::new(store)
        .with_public_base_url(config.public_base_url.clone())
        .with_max_upload_bytes(config.max_upload_bytes);
    if let Some(client) = &extractor {
        core = core.with_extractor(client.clone());
    }
    let core = Arc::new(core);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(core.clone(), &config));
    drop(runtime);

    result
}

fn build_extractor(
    config: &ServerConfig,
) -> Result<Option<Arc<dyn ExtractionClient>>, StartupError> {
    let Some(api_key) = config.anthropic_api_key.as_deref() else {
        tracing::warn!("ANTHROPIC_API_KEY not set, extraction disabled");
        return Ok(None);
    };

    let client = AnthropicClient::new(
        api_key,
        &config.anthropic_model,
        &config.anthropic_base_url,
        config.extraction_timeout_secs,
    )?;
    tracing::info!(model = client.model(), "Extraction enabled");
    Ok(Some(Arc::new(client)))
}

async fn serve(core: Arc<CoreState>, config: &ServerConfig) -> Result<(), StartupError> {
    let sweeper = start_sweeper(core.shares.clone(), config.sweep_interval);

    let mut server = api::start_server_on(core, config.bind)
        .await
        .map_err(StartupError::Server)?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }

    tracing::info!("Shutting down");
    server.shutdown();
    server.wait().await;
    sweeper.stop().await;
    Ok(())
}
