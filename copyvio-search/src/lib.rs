//! Pluggable web search for candidate source URLs.
//!
//! This crate exposes a common [`traits::SearchEngine`] interface and one
//! provider implementation, [`boss::YahooBossSearchEngine`]. Engines are
//! selected by display name from [`copyvio_common::SearchSettings`], so the
//! copyright-violation detector never names a concrete provider type.
//!
//! # Examples
//! ```no_run
//! use copyvio_config::CopyvioConfigLoader;
//! use copyvio_search::engine_from_config;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CopyvioConfigLoader::from_default_location().load()?;
//! let engine = engine_from_config(&config)?;
//! let urls = engine.search("the quick brown fox jumps").await?;
//! println!("{} candidates from {}", urls.len(), engine.name());
//! # Ok(())
//! # }
//! ```
pub mod boss;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

use boss::YahooBossSearchEngine;
use copyvio_common::{SearchSettings, TransportSettings};
use copyvio_config::CopyvioConfig;
use copyvio_http::{HttpError, HttpTransport, Transport};

pub use traits::{SearchEngine, SearchEngineKind, SearchError};

/// Build the reqwest transport described by `settings`.
pub fn build_transport(settings: &TransportSettings) -> Result<Arc<dyn Transport>, HttpError> {
    let transport = HttpTransport::new(&settings.user_agent)?
        .with_timeout(Duration::from_secs(settings.timeout_secs));
    Ok(Arc::new(transport))
}

/// Construct the engine named in `settings`, sharing `transport`.
pub fn select_engine(
    settings: &SearchSettings,
    transport: Arc<dyn Transport>,
) -> Result<Arc<dyn SearchEngine>, SearchError> {
    let kind: SearchEngineKind = settings.engine.parse()?;
    let credentials = Arc::new(settings.credentials.clone());

    let engine: Arc<dyn SearchEngine> = match kind {
        SearchEngineKind::YahooBoss => Arc::new(YahooBossSearchEngine::new(credentials, transport)),
    };
    tracing::info!(engine = kind.name(), "search engine selected");
    Ok(engine)
}

/// Transport plus engine straight from a loaded configuration.
pub fn engine_from_config(config: &CopyvioConfig) -> Result<Arc<dyn SearchEngine>, SearchError> {
    let transport = build_transport(&config.transport)?;
    select_engine(&config.search, transport)
}
