//! Provider abstractions for embeddings, answer synthesis and vector storage
//!
//! The embedder and synthesizer are external services behind traits, so the
//! backend can be switched between Gemini and a local Ollama server.

pub mod embedding;
pub mod gemini;
pub mod llm;
pub mod ollama;
pub mod vector_store;

use std::sync::Arc;

use crate::config::{BackendProvider, RagConfig};
use crate::error::Result;

pub use embedding::{EmbeddingProvider, EmbeddingTask};
pub use gemini::{GeminiClient, GeminiEmbedder, GeminiLlm};
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use vector_store::{VectorSearchResult, VectorStoreProvider};

/// The external collaborators the engine talks to
#[derive(Clone)]
pub struct Providers {
    /// Text embedder
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Answer synthesizer
    pub llm: Arc<dyn LlmProvider>,
}

impl Providers {
    /// Build the providers selected by `config.backend`
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let providers = match config.backend {
            BackendProvider::Gemini => {
                let client = Arc::new(GeminiClient::new(&config.gemini)?);
                Self {
                    embedder: Arc::new(GeminiEmbedder::new(Arc::clone(&client))),
                    llm: Arc::new(GeminiLlm::new(client)),
                }
            }
            BackendProvider::Ollama => {
                let client = Arc::new(OllamaClient::new(&config.ollama)?);
                Self {
                    embedder: Arc::new(OllamaEmbedder::new(Arc::clone(&client))),
                    llm: Arc::new(OllamaLlm::new(client)),
                }
            }
        };

        tracing::info!(
            "Using {} embeddings and {} ({}) for answers",
            providers.embedder.name(),
            providers.llm.name(),
            providers.llm.model()
        );

        Ok(providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        let mut config = RagConfig::default();
        let providers = Providers::from_config(&config).unwrap();
        assert_eq!(providers.embedder.name(), "gemini");
        assert_eq!(providers.llm.model(), "gemini-2.5-flash");

        config.backend = BackendProvider::Ollama;
        config.ollama.generate_model = "mistral".to_string();
        let providers = Providers::from_config(&config).unwrap();
        assert_eq!(providers.embedder.name(), "ollama");
        assert_eq!(providers.llm.model(), "mistral");
    }
}
