pub mod api;
pub mod config;
pub mod credentials;
pub mod http;
pub mod pipeline;
pub mod storage;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::ServiceConfig;
use crate::pipeline::DocumentProcessor;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load `.env`, then install the tracing subscriber. The order matters:
/// the filter is read from `RUST_LOG`, which `.env` may provide.
pub fn init_tracing() {
    let dotenv = config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .init();

    match dotenv {
        Some(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        None => tracing::debug!("No .env file found, using process environment"),
    }
}

/// Filter from a `RUST_LOG` value, falling back to the default when it is
/// unset or unparsable.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(config::default_log_filter()))
}

/// Load configuration, wire the pipeline and serve until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    let config = ServiceConfig::from_env()?;

    tracing::info!(
        "{} starting v{} on {}",
        config::APP_NAME,
        config::APP_VERSION,
        config.bind_addr
    );

    // Blocking HTTP clients own an internal runtime; build them (and drop
    // them) outside the async runtime.
    let processor = Arc::new(DocumentProcessor::from_config(&config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(api::serve(ApiContext::new(processor.clone()), config.bind_addr));
    drop(runtime);
    drop(processor);

    served?;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
