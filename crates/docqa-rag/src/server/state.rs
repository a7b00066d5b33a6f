//! Application state for the HTTP server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::engine::RagEngine;
use crate::error::Result;
use crate::providers::Providers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// The Q&A engine
    engine: Arc<RagEngine>,
}

impl AppState {
    /// Wrap an existing engine
    pub fn new(config: RagConfig, engine: Arc<RagEngine>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, engine }),
        }
    }

    /// Build providers and start the engine from configuration
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state (backend: {:?})", config.backend);

        let providers = Providers::from_config(&config)?;
        let engine = RagEngine::start(&config, providers).await?;

        if config.require_credential().is_err() {
            tracing::warn!(
                "{} is not set; uploads and questions will be rejected until it is",
                config.credential_env().unwrap_or_default()
            );
        }

        Ok(Self::new(config, Arc::new(engine)))
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the engine
    pub fn engine(&self) -> &Arc<RagEngine> {
        &self.inner.engine
    }

    /// Reject the request early when the backend credential is missing
    pub fn require_credential(&self) -> Result<()> {
        self.inner.config.require_credential()
    }

    /// Check if documents are loaded
    pub async fn is_ready(&self) -> bool {
        self.inner.engine.is_ready().await
    }
}
