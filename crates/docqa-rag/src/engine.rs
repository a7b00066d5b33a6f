//! RAG orchestrator owning the vector index and the synthesis pipeline
//!
//! The engine is either `Empty` (no index handle) or `Ready` (an index plus a
//! pipeline bound to it). Questions share a read lock; loading and clearing
//! take the write lock.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{PromptTemplate, SynthesisPipeline};
use crate::ingestion::{DocumentLoader, TextChunker};
use crate::providers::Providers;
use crate::retrieval::{ClearFailure, VectorIndex};
use crate::types::{AskOutcome, IngestSummary};

/// Message returned when clearing an engine that holds no index
pub const ALREADY_EMPTY_MESSAGE: &str = "Vector index is already empty; nothing to clear.";

enum EngineState {
    Empty,
    Ready {
        index: VectorIndex,
        pipeline: SynthesisPipeline,
    },
}

/// Document Q&A engine
pub struct RagEngine {
    state: RwLock<EngineState>,
    providers: Providers,
    chunker: TextChunker,
    template: PromptTemplate,
    top_k: usize,
    persist_dir: PathBuf,
}

impl RagEngine {
    /// Create an engine in the `Empty` state
    pub fn new(config: &RagConfig, providers: Providers) -> Result<Self> {
        Ok(Self {
            state: RwLock::new(EngineState::Empty),
            providers,
            chunker: TextChunker::from_config(&config.chunking)?,
            template: PromptTemplate::from_config(config.retrieval.prompt_template.as_deref())?,
            top_k: config.retrieval.top_k,
            persist_dir: config.storage.persist_dir.clone(),
        })
    }

    /// Create an engine, reopening a persisted index if there is one
    ///
    /// A persisted index that cannot be opened is logged and skipped, leaving
    /// the engine `Empty`.
    pub async fn start(config: &RagConfig, providers: Providers) -> Result<Self> {
        let mut engine = Self::new(config, providers)?;

        let loaded = VectorIndex::try_load(&engine.persist_dir).await;
        match loaded {
            Ok(Some(index)) => {
                tracing::info!("Loaded persisted vector index from {}", engine.persist_dir.display());
                let pipeline = engine.build_pipeline();
                *engine.state.get_mut() = EngineState::Ready { index, pipeline };
            }
            Ok(None) => {
                tracing::info!(
                    "No persisted vector index in {}, waiting for documents",
                    engine.persist_dir.display()
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load persisted vector index from {}: {}; starting empty",
                    engine.persist_dir.display(),
                    e
                );
            }
        }

        Ok(engine)
    }

    /// Check whether an index is loaded
    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.read().await, EngineState::Ready { .. })
    }

    fn build_pipeline(&self) -> SynthesisPipeline {
        SynthesisPipeline::new(
            self.providers.embedder.clone(),
            self.providers.llm.clone(),
            self.template.clone(),
            self.top_k,
        )
    }

    /// Load a file into the index, adding to whatever is already there
    pub async fn load(&self, path: &Path) -> Result<IngestSummary> {
        let source = path.to_path_buf();
        let chunker = self.chunker.clone();
        let (documents, chunks) = tokio::task::spawn_blocking(move || -> Result<_> {
            let documents = DocumentLoader::load(&source)?;
            let chunks = chunker.chunk_documents(&documents);
            Ok((documents.len(), chunks))
        })
        .await??;

        if chunks.is_empty() {
            return Err(Error::file_parse(
                path.to_string_lossy(),
                "no text could be extracted",
            ));
        }
        let chunk_count = chunks.len();

        let mut state = self.state.write().await;
        let embedder = self.providers.embedder.as_ref();

        if let EngineState::Ready { index, pipeline } = &mut *state {
            index.add(chunks, embedder).await?;
            *pipeline = self.build_pipeline();
            let summary = IngestSummary {
                documents,
                chunks: chunk_count,
                total_entries: index.count().await?,
            };
            log_ingest(path, &summary);
            return Ok(summary);
        }

        let index = VectorIndex::create_or_load(&self.persist_dir).await?;
        index.add(chunks, embedder).await?;
        let summary = IngestSummary {
            documents,
            chunks: chunk_count,
            total_entries: index.count().await?,
        };
        *state = EngineState::Ready {
            index,
            pipeline: self.build_pipeline(),
        };

        log_ingest(path, &summary);
        Ok(summary)
    }

    /// Answer a question from the loaded documents
    pub async fn ask(&self, question: &str) -> Result<AskOutcome> {
        let state = self.state.read().await;

        match &*state {
            EngineState::Empty => {
                tracing::info!("Question received with no documents loaded");
                Ok(AskOutcome::NotReady)
            }
            EngineState::Ready { index, pipeline } => {
                tracing::info!("Answering question: {}", question);
                let answer = pipeline.run(index, question).await?;
                Ok(AskOutcome::Answered {
                    sources: answer.sources(),
                    answer: answer.answer,
                })
            }
        }
    }

    /// Drop the persisted collection and return to `Empty`
    ///
    /// Failures are reported in the returned message and keep the current index.
    pub async fn clear(&self) -> String {
        let mut state = self.state.write().await;

        match std::mem::replace(&mut *state, EngineState::Empty) {
            EngineState::Empty => ALREADY_EMPTY_MESSAGE.to_string(),
            EngineState::Ready { index, pipeline } => match index.clear().await {
                Ok(message) => {
                    tracing::info!("{}", message);
                    message
                }
                Err(ClearFailure { index, error }) => {
                    tracing::warn!("Failed to clear vector index: {}", error);
                    *state = EngineState::Ready { index, pipeline };
                    format!("Error clearing vector index: {}", error)
                }
            },
        }
    }

    /// Install an index directly, bypassing the loader
    #[cfg(test)]
    pub(crate) async fn install_index(&self, index: VectorIndex) {
        let pipeline = self.build_pipeline();
        *self.state.write().await = EngineState::Ready { index, pipeline };
    }
}

fn log_ingest(path: &Path, summary: &IngestSummary) {
    tracing::info!(
        "Loaded {}: {} documents, {} chunks ({} entries in index)",
        path.display(),
        summary.documents,
        summary.chunks,
        summary.total_entries
    );
}
